//! Maps inbound frames to parameter events.

use kxlink_core::{EqGainEncoding, MixerEvent, Parameter, ParameterChanged};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::codec;

/// Turns raw inbound reports into [`MixerEvent::ParameterChanged`].
///
/// Runs on the transport's reader thread, so it only decodes and publishes.
pub(crate) struct InboundDecoder {
    eq: EqGainEncoding,
    events: broadcast::Sender<MixerEvent>,
}

impl InboundDecoder {
    pub(crate) fn new(eq: EqGainEncoding, events: broadcast::Sender<MixerEvent>) -> Self {
        Self { eq, events }
    }

    /// Resolve a report to a known parameter. Malformed frames, unknown
    /// banks and unmapped registers yield `None`.
    pub(crate) fn resolve(&self, raw: &[u8]) -> Option<ParameterChanged> {
        let decoded = codec::decode(raw)?;
        let Some(register) = decoded.register() else {
            trace!(?decoded, "Report from unknown bank");
            return None;
        };
        let Some(parameter) = Parameter::from_register(register) else {
            trace!(?register, "Report from unmapped register");
            return None;
        };

        let raw = decoded.value();
        Some(ParameterChanged { parameter, value: parameter.decode(raw, self.eq), raw })
    }

    pub(crate) fn handle(&self, raw: &[u8]) {
        if let Some(change) = self.resolve(raw) {
            debug!(parameter = %change.parameter, value = %change.value, "HID IN");
            // No subscribers is not an error
            let _ = self.events.send(MixerEvent::ParameterChanged(change));
        }
    }
}
