//! Last known mixer state.
//!
//! The device never answers writes, so the daemon keeps its own record: the
//! values it has written and whatever the panel reports back. Nothing here
//! talks to the device.

use std::collections::{BTreeMap, HashMap};

use kxlink_core::{Parameter, ParameterChanged, Value};
use parking_lot::RwLock;
use tracing::trace;

#[derive(Debug, Default)]
pub struct ParameterStore {
    values: RwLock<HashMap<Parameter, Value>>,
}

impl ParameterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value, returning the previous one.
    pub fn record(&self, parameter: Parameter, value: Value) -> Option<Value> {
        trace!(%parameter, %value, "Recorded");
        self.values.write().insert(parameter, value)
    }

    /// Record a device-originated change.
    pub fn apply(&self, change: &ParameterChanged) -> Option<Value> {
        self.record(change.parameter, change.value)
    }

    #[must_use]
    pub fn get(&self, parameter: Parameter) -> Option<Value> {
        self.values.read().get(&parameter).copied()
    }

    /// Every known value keyed by parameter name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.values.read().iter().map(|(parameter, value)| (parameter.to_string(), *value)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}
