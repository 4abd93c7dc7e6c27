//! EQ gain encodings.
//!
//! Two driver generations disagree on how a gain in dB becomes a 16-bit
//! hardware code. Neither has been confirmed against the hardware, so both
//! are kept and selected by configuration.

use serde::{Deserialize, Serialize};

/// Lowest gain an EQ band accepts, in dB.
pub const EQ_MIN_DB: f32 = -24.0;
/// Highest gain an EQ band accepts, in dB.
pub const EQ_MAX_DB: f32 = 12.0;
/// Number of bands on each graphic EQ.
pub const EQ_BANDS: u8 = 15;
/// Code written to a music EQ band when it is bypassed (0 dB on the refined scale).
pub const FLAT_CODE: u16 = 2560;

/// Strategy for converting dB to a hardware gain code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EqGainEncoding {
    /// `round((db + 24) * 366/36) + 10`, codes 10..=376
    Legacy,
    /// `(db + 24) * 10 + 2320`, codes 2320..=2680
    #[default]
    Refined,
}

impl EqGainEncoding {
    /// Convert a gain in dB to a hardware code.
    ///
    /// The input is not clamped; callers keep it within
    /// [`EQ_MIN_DB`]..=[`EQ_MAX_DB`]. Out of range results saturate at the
    /// `u16` bounds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_code(self, db: f32) -> u16 {
        let code = match self {
            Self::Legacy => (db + 24.0) * (366.0 / 36.0) + 10.0,
            Self::Refined => (db + 24.0) * 10.0 + 2320.0,
        };
        code.round() as u16
    }

    /// Convert a hardware code back to a gain in dB.
    #[must_use]
    pub fn to_db(self, code: u16) -> f32 {
        let code = f32::from(code);
        match self {
            Self::Legacy => (code - 10.0) * (36.0 / 366.0) - 24.0,
            Self::Refined => (code - 2320.0) / 10.0 - 24.0,
        }
    }
}
