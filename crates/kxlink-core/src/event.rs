//! Session lifecycle and the events the driver publishes.

use serde::{Deserialize, Serialize};

use crate::parameter::{Parameter, Value};

/// Lifecycle of a mixer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No transport handle held
    #[default]
    Disconnected,
    /// Transport open, front panel still in control
    Connected,
    /// Handshake replay running
    Initializing,
    /// Remote control acquired, heartbeat running
    Locked,
}

impl SessionState {
    /// Whether a transport handle is held.
    #[must_use]
    pub fn is_connected(self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

/// A device-originated parameter change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterChanged {
    pub parameter: Parameter,
    pub value: Value,
    /// Register value as reported on the wire
    pub raw: u16,
}

/// Events published by a mixer session to its subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "data")]
pub enum MixerEvent {
    /// The device reported a mapped register
    ParameterChanged(ParameterChanged),
    /// Handshake finished, heartbeat running
    Locked,
    /// Session closed and transport released
    Released,
    /// The transport reported a fault
    TransportFault { message: String },
}
