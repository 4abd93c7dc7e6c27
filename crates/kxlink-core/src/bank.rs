//! Hardware address spaces of the mixer.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// A functional module of the mixer, addressed by the bank byte of a frame.
///
/// The set is closed: these are the only banks the register map knows.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum Bank {
    /// Music equaliser, only reachable through precision frames
    MusicEq = 0x00,
    /// Microphone channel 1
    Mic1 = 0x01,
    /// Microphone channel 2
    Mic2 = 0x02,
    /// Echo and reverb effects
    Effects = 0x03,
    /// Main mix
    Main = 0x04,
    /// Surround output
    Surround = 0x05,
    /// Center output
    Center = 0x06,
    /// Subwoofer output
    Sub = 0x07,
    /// Record output
    Record = 0x08,
    /// System level controls (masters, mutes, input select)
    System = 0x0A,
}

impl Bank {
    /// Every bank, in address order.
    pub const ALL: [Self; 10] = [
        Self::MusicEq,
        Self::Mic1,
        Self::Mic2,
        Self::Effects,
        Self::Main,
        Self::Surround,
        Self::Center,
        Self::Sub,
        Self::Record,
        Self::System,
    ];

    /// The raw bank byte.
    #[must_use]
    pub fn byte(self) -> u8 {
        self.into()
    }

    /// Look up a bank from its byte. Unknown bytes yield `None`.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::try_from(byte).ok()
    }

    /// Whether the bank only accepts precision frames. These banks carry the
    /// band in byte 11 and split the value around it.
    #[must_use]
    pub fn is_precision_only(self) -> bool {
        matches!(self, Self::MusicEq)
    }
}
