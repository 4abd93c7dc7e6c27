//! Preset selector opcodes.
//!
//! The panel's ten preset buttons map onto hardware selector opcodes:
//! 0x03-0x09 recall user presets P01-P07 and 0x00-0x02 recall the factory
//! templates POP, PRO and STE. The activation pulse that commits a recall
//! uses the selector plus 0x0B.

use tracing::warn;

/// Selector opcode for each preset index.
pub const PRESET_OPCODES: [u8; 10] = [0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x00, 0x01, 0x02];

/// Distance between a selector opcode and its activation pulse opcode.
pub const PULSE_OFFSET: u8 = 0x0B;

const PRESET_LABELS: [&str; 10] = ["P01", "P02", "P03", "P04", "P05", "P06", "P07", "POP", "PRO", "STE"];

/// Resolved opcodes for a preset recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetSelector {
    /// Requested preset index
    pub index: usize,
    /// Opcode sent during the prime and commit sweeps
    pub selector: u8,
    /// Opcode sent during the activation pulse
    pub pulse: u8,
}

impl PresetSelector {
    /// Resolve a preset index. Indices outside the table fall back to P01.
    #[must_use]
    pub fn resolve(index: usize) -> Self {
        let selector = PRESET_OPCODES.get(index).copied().unwrap_or_else(|| {
            warn!(index, "Unknown preset index, falling back to P01");
            PRESET_OPCODES[0]
        });
        Self { index, selector, pulse: selector + PULSE_OFFSET }
    }

    /// Panel label of the preset, if the index is in the table.
    #[must_use]
    pub fn label(&self) -> Option<&'static str> {
        PRESET_LABELS.get(self.index).copied()
    }

    /// Whether this recalls one of the factory templates.
    #[must_use]
    pub fn is_factory(&self) -> bool {
        self.selector <= 0x02
    }
}
