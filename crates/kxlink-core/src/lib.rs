//! KxLink Core - register map, logical parameters and events.
//!
//! This crate describes the KX-180 mixer's hardware address space and the
//! logical controls that live in it. It holds no device state and does no
//! I/O; the HID driver and any outer layers share these types.

pub mod bank;
pub mod eq;
pub mod error;
pub mod event;
pub mod parameter;
pub mod preset;

pub use bank::Bank;
pub use eq::EqGainEncoding;
pub use error::{Error, Result};
pub use event::{MixerEvent, ParameterChanged, SessionState};
pub use parameter::{Encoding, FrameKind, Mic, Parameter, Register, Value};
pub use preset::PresetSelector;
