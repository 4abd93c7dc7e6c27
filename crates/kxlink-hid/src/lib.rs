//! KxLink HID - KX-180 wire protocol and session driver.
//!
//! The mixer speaks a vendor protocol of fixed 64-byte frames over a raw
//! HID interface. It only accepts host control after a captured handshake
//! has been replayed, and drops back to front-panel control unless a
//! heartbeat keeps arriving. [`Mixer`] owns that lifecycle; [`codec`] holds
//! the frame layouts.

pub mod codec;
pub mod device;
pub mod diagnostic;
pub mod error;
pub mod handshake;
pub mod heartbeat;
pub mod recall;
pub mod session;
pub mod transport;

mod decoder;
mod link;
mod tasks;

#[cfg(test)]
mod testing;

pub use codec::Frame;
pub use device::{HidapiBackend, KX180_PID, KX180_VID};
pub use error::{HidError, HidResult};
pub use handshake::HandshakeScript;
pub use link::PING_SEQ_START;
pub use recall::RecallPlan;
pub use session::{Mixer, MixerConfig};
pub use transport::{DeviceInfo, HidBackend, HidTransport};
