//! KX-180 frame codec.
//!
//! Every exchange with the mixer is a fixed 64-byte frame. Parameter writes
//! come in two classes that share a header prefix:
//!
//! ```text
//! standard   01 09 FE 00 00 <bank> <id> 09 00 <value> <sum-2> .. A2 00
//! precision  01 0F FE 00 00 <bank> <id> 0F 00 00 00 00 <hi> <lo> .. A2 00
//! music EQ   01 0F FE 00 00 00 00 0F 00 <hi> 00 <band> 00 <lo> 00 10 .. A2 00
//! ```
//!
//! The device drops frames with a wrong checksum without any NACK, so the
//! offsets here are exactly those of the captured vendor traffic.

use std::fmt;

use kxlink_core::{Bank, FrameKind, Register};

/// Logical frame length.
pub const FRAME_LEN: usize = 64;
/// Length of the buffer handed to the transport.
pub const REPORT_LEN: usize = FRAME_LEN + 1;

const REPORT_ID: u8 = 0x01;
const ADDRESSED: u8 = 0xFE;
const STANDARD_MARKER: u8 = 0x09;
const PRECISION_MARKER: u8 = 0x0F;
const FOOTER_OFFSET: usize = 62;
const FOOTER: [u8; 2] = [0xA2, 0x00];

const CHECKSUM_SPAN: std::ops::Range<usize> = 3..10;
const CHECKSUM_OFFSET: usize = 10;

const RECALL_COMMAND: u8 = 0x0B;
const RECALL_FILL: u8 = 0x23;
const PING_MARKER: u8 = 0x05;
const MUSIC_EQ_TRAILER: u8 = 0x10;

/// Shortest inbound frame that can carry a standard event.
const MIN_INBOUND_LEN: usize = 11;
/// Shortest inbound frame that can carry a precision event.
const MIN_PRECISION_LEN: usize = 14;

/// A 64-byte protocol frame.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// Wrap raw frame bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a frame from a captured byte string, zero-padding short captures.
    /// Bytes beyond [`FRAME_LEN`] are ignored.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut frame = [0u8; FRAME_LEN];
        let len = bytes.len().min(FRAME_LEN);
        frame[..len].copy_from_slice(&bytes[..len]);
        Self(frame)
    }

    /// Frame bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Transport buffer for this frame.
    ///
    /// The transport needs an explicit report id slot, which is byte 0 of
    /// the payload itself; the remaining payload follows in place and the
    /// buffer ends with one zero byte.
    #[must_use]
    pub fn to_report(&self) -> [u8; REPORT_LEN] {
        let mut report = [0u8; REPORT_LEN];
        report[..FRAME_LEN].copy_from_slice(&self.0);
        report
    }

    fn addressed(marker: u8) -> [u8; FRAME_LEN] {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = REPORT_ID;
        bytes[1] = marker;
        bytes[2] = ADDRESSED;
        bytes[FOOTER_OFFSET..].copy_from_slice(&FOOTER);
        bytes
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0[..16].iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        f.write_str("...")
    }
}

const fn captured(prefix: &[u8]) -> [u8; FRAME_LEN] {
    let mut bytes = [0u8; FRAME_LEN];
    let mut i = 0;
    while i < prefix.len() {
        bytes[i] = prefix[i];
        i += 1;
    }
    bytes
}

/// Keep-alive frame that holds the device in remote-control mode.
pub const HEARTBEAT: Frame = Frame::from_bytes({
    let mut bytes = captured(&[0x01, 0x01, 0xFF]);
    bytes[61] = 0xA2;
    bytes
});

/// Captured state sync request, replayed verbatim.
pub const SYNC_REQUEST: Frame = Frame::from_bytes(captured(&[
    0x01, 0x80, 0x00, 0x09, 0x00, 0x00, 0x00, 0x00, 0x00, 0xD8, 0x35, 0xBD, 0x24, 0xF7, 0x68,
]));

/// Checksum of a standard frame: `sum(bytes[3..10]) - 2`, modulo 256.
#[must_use]
pub fn standard_checksum(bytes: &[u8; FRAME_LEN]) -> u8 {
    bytes[CHECKSUM_SPAN].iter().fold(0u8, |sum, b| sum.wrapping_add(*b)).wrapping_sub(2)
}

/// Encode an 8-bit register write.
///
/// Range checking is the caller's job; wider values are truncated to their
/// low byte before they get here.
#[must_use]
pub fn encode_standard(bank: Bank, id: u8, value: u8) -> Frame {
    let mut bytes = Frame::addressed(STANDARD_MARKER);
    bytes[5] = bank.byte();
    bytes[6] = id;
    bytes[7] = STANDARD_MARKER;
    bytes[9] = value;
    bytes[CHECKSUM_OFFSET] = standard_checksum(&bytes);
    Frame(bytes)
}

/// Encode a 16-bit register write.
///
/// On the music EQ bank `id` is the band (0-14), carried in its own sub-id
/// slot with the value split around it. Other banks carry id and value in
/// the generic layout.
///
/// Byte 11 belongs to the band, so music EQ frames carry no checksum; byte
/// 10 stays zero as in every captured EQ write.
#[must_use]
pub fn encode_precision(bank: Bank, id: u8, value: u16) -> Frame {
    let [hi, lo] = value.to_be_bytes();
    let mut bytes = Frame::addressed(PRECISION_MARKER);
    bytes[5] = bank.byte();
    bytes[7] = PRECISION_MARKER;
    if bank.is_precision_only() {
        bytes[9] = hi;
        bytes[11] = id;
        bytes[13] = lo;
        bytes[15] = MUSIC_EQ_TRAILER;
    } else {
        bytes[6] = id;
        bytes[12] = hi;
        bytes[13] = lo;
    }
    Frame(bytes)
}

/// Encode a register write for any mapped register.
#[must_use]
pub fn encode_register(register: Register, value: u16) -> Frame {
    match register.kind {
        FrameKind::Standard => encode_standard(register.bank, register.id, value.to_le_bytes()[0]),
        FrameKind::Precision => encode_precision(register.bank, register.id, value),
    }
}

/// Encode a preset recall frame addressed to one module.
#[must_use]
pub fn encode_recall(module: u8, opcode: u8) -> Frame {
    let mut bytes = Frame::addressed(STANDARD_MARKER);
    bytes[3] = RECALL_COMMAND;
    bytes[4] = opcode;
    bytes[5] = module;
    bytes[7] = STANDARD_MARKER;
    bytes[8] = RECALL_FILL;
    bytes[9] = RECALL_FILL;
    bytes[CHECKSUM_OFFSET] = standard_checksum(&bytes);
    Frame(bytes)
}

/// Encode a keep-alive ping carrying the session sequence byte.
#[must_use]
pub fn encode_ping(seq: u8) -> Frame {
    let mut bytes = [0u8; FRAME_LEN];
    bytes[0] = REPORT_ID;
    bytes[4] = seq;
    bytes[5] = PING_MARKER;
    Frame(bytes)
}

/// A register report decoded from an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Standard { bank: u8, id: u8, value: u8 },
    Precision { bank: u8, id: u8, value: u16 },
}

impl Decoded {
    /// The register this report refers to, if the bank is known.
    #[must_use]
    pub fn register(&self) -> Option<Register> {
        let (bank, id, kind) = match *self {
            Self::Standard { bank, id, .. } => (bank, id, FrameKind::Standard),
            Self::Precision { bank, id, .. } => (bank, id, FrameKind::Precision),
        };
        Bank::from_byte(bank).map(|bank| Register { bank, id, kind })
    }

    /// The reported register value.
    #[must_use]
    pub fn value(&self) -> u16 {
        match *self {
            Self::Standard { value, .. } => u16::from(value),
            Self::Precision { value, .. } => value,
        }
    }
}

/// Decode an inbound frame.
///
/// Anything that is not a well-formed register report yields `None`; the
/// device emits plenty of frames the driver has no use for.
#[must_use]
pub fn decode(raw: &[u8]) -> Option<Decoded> {
    if raw.len() < MIN_INBOUND_LEN || raw[0] != REPORT_ID || raw[2] != ADDRESSED {
        return None;
    }

    let bank = raw[5];
    match raw[1] {
        STANDARD_MARKER => Some(Decoded::Standard { bank, id: raw[6], value: raw[9] }),
        PRECISION_MARKER if raw.len() >= MIN_PRECISION_LEN => {
            let band_addressed = Bank::from_byte(bank).is_some_and(Bank::is_precision_only);
            let (id, hi) = if band_addressed { (raw[11], raw[9]) } else { (raw[6], raw[12]) };
            Some(Decoded::Precision { bank, id, value: u16::from_be_bytes([hi, raw[13]]) })
        }
        _ => None,
    }
}
