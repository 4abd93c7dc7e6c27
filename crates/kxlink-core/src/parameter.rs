//! Logical parameters and their hardware registers.
//!
//! Every control the driver understands is a [`Parameter`]. Each one lives
//! at exactly one [`Register`] (bank, register id, frame kind), and every
//! known register resolves back to exactly one parameter. Unknown registers
//! resolve to `None`; the device reports far more state than is mapped here.
//!
//! Known ambiguity: `mainMic` (main bank, id 0x01) and `mic1` (mic channel 1,
//! id 0x14) were both probed as "the main mic slider" and it is not settled
//! which one the front panel follows. They stay separate parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bank::Bank;
use crate::eq::{EQ_BANDS, EqGainEncoding};
use crate::error::{Error, Result};

/// Frame class a register is written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    /// 8-bit value payload
    Standard,
    /// 16-bit value payload
    Precision,
}

/// A hardware register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Register {
    pub bank: Bank,
    pub id: u8,
    pub kind: FrameKind,
}

impl Register {
    const fn standard(bank: Bank, id: u8) -> Self {
        Self { bank, id, kind: FrameKind::Standard }
    }

    const fn precision(bank: Bank, id: u8) -> Self {
        Self { bank, id, kind: FrameKind::Precision }
    }
}

/// How a logical value is turned into a register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Volume-like byte (the panel uses 0-200)
    Level,
    /// Boolean written as 0/1
    Toggle,
    /// Enumerated selector byte
    Selector,
    /// Gain in dB, converted by an [`EqGainEncoding`]
    EqGain,
    /// Raw 16-bit precision value
    Raw16,
}

/// Microphone channel selector for per-mic parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mic {
    One,
    Two,
}

impl Mic {
    /// Bank holding this channel's controls.
    #[must_use]
    pub fn bank(self) -> Bank {
        match self {
            Self::One => Bank::Mic1,
            Self::Two => Bank::Mic2,
        }
    }

    fn from_bank(bank: Bank) -> Option<Self> {
        match bank {
            Bank::Mic1 => Some(Self::One),
            Bank::Mic2 => Some(Self::Two),
            _ => None,
        }
    }

    fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// A logical mixer control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Parameter {
    // System bank
    MasterMusic,
    MasterMic,
    MasterEffect,
    /// 0 = VOD, 1 = BGM, 2 = optical
    InputSource,
    /// Feedback suppression level
    MicFbx(Mic),
    MusicEqBypass,
    MuteMusic,
    MuteMic,
    MuteEffect,

    // Mic channel banks
    MicVolume(Mic),
    MicHpf(Mic),
    MicCompThreshold(Mic),
    MicCompAttack(Mic),
    MicCompRelease(Mic),
    MicCompRatio(Mic),
    MicEq(Mic, u8),

    // Effects bank
    EchoDelay,
    EchoRepeat,
    EchoLpf,
    EchoHpf,
    EchoPreDelay,
    EchoDamping,
    EchoVolume,
    EchoDry,
    ReverbDry,
    ReverbTime,
    ReverbPreDelay,
    ReverbVolume,
    /// Reverb algorithm, 1-4
    ReverbModel,

    // Main bank
    MainMusic,
    MainMic,
    MainEq(u8),

    // Outputs
    CenterVolume,
    CenterMute,
    SubVolume,
    SubPolarity,
    SubMute,

    // Music EQ bank
    MusicEq(u8),
}

/// Main EQ band 0 sits at this register id on the main bank.
const MAIN_EQ_BASE: u8 = 0x07;

impl Parameter {
    /// The register this parameter is written to and reported from.
    #[must_use]
    pub fn register(self) -> Register {
        match self {
            Self::MasterMusic => Register::standard(Bank::System, 0x00),
            Self::MasterMic => Register::standard(Bank::System, 0x01),
            Self::MasterEffect => Register::standard(Bank::System, 0x02),
            Self::InputSource => Register::standard(Bank::System, 0x03),
            Self::MicFbx(Mic::One) => Register::standard(Bank::System, 0x0C),
            Self::MicFbx(Mic::Two) => Register::standard(Bank::System, 0x0D),
            Self::MusicEqBypass => Register::standard(Bank::System, 0x16),
            Self::MuteMusic => Register::standard(Bank::System, 0x21),
            Self::MuteMic => Register::standard(Bank::System, 0x22),
            Self::MuteEffect => Register::standard(Bank::System, 0x23),

            Self::MicHpf(mic) => Register::standard(mic.bank(), 0x00),
            Self::MicVolume(mic) => Register::standard(mic.bank(), 0x14),
            Self::MicCompThreshold(mic) => Register::standard(mic.bank(), 0x15),
            Self::MicCompAttack(mic) => Register::standard(mic.bank(), 0x16),
            Self::MicCompRelease(mic) => Register::standard(mic.bank(), 0x17),
            Self::MicCompRatio(mic) => Register::standard(mic.bank(), 0x18),
            Self::MicEq(mic, band) => Register::precision(mic.bank(), band),

            Self::EchoDelay => Register::standard(Bank::Effects, 0x00),
            Self::EchoRepeat => Register::standard(Bank::Effects, 0x01),
            Self::EchoLpf => Register::standard(Bank::Effects, 0x02),
            Self::EchoHpf => Register::standard(Bank::Effects, 0x03),
            Self::EchoPreDelay => Register::standard(Bank::Effects, 0x04),
            Self::EchoDamping => Register::standard(Bank::Effects, 0x05),
            Self::ReverbTime => Register::standard(Bank::Effects, 0x0D),
            Self::ReverbPreDelay => Register::standard(Bank::Effects, 0x0E),
            Self::ReverbDry => Register::standard(Bank::Effects, 0x10),
            Self::EchoVolume => Register::standard(Bank::Effects, 0x27),
            Self::EchoDry => Register::standard(Bank::Effects, 0x28),
            Self::ReverbVolume => Register::standard(Bank::Effects, 0x29),
            Self::ReverbModel => Register::standard(Bank::Effects, 0x2A),

            Self::MainMusic => Register::standard(Bank::Main, 0x00),
            Self::MainMic => Register::standard(Bank::Main, 0x01),
            Self::MainEq(band) => Register::precision(Bank::Main, MAIN_EQ_BASE.wrapping_add(band)),

            Self::CenterVolume => Register::standard(Bank::Center, 0x04),
            Self::CenterMute => Register::standard(Bank::Center, 0x06),
            Self::SubVolume => Register::standard(Bank::Sub, 0x03),
            Self::SubPolarity => Register::standard(Bank::Sub, 0x06),
            Self::SubMute => Register::standard(Bank::Sub, 0x15),

            Self::MusicEq(band) => Register::precision(Bank::MusicEq, band),
        }
    }

    /// Resolve a register back to its parameter.
    #[must_use]
    pub fn from_register(register: Register) -> Option<Self> {
        let Register { bank, id, kind } = register;
        match kind {
            FrameKind::Standard => Self::from_standard(bank, id),
            FrameKind::Precision => Self::from_precision(bank, id),
        }
    }

    fn from_standard(bank: Bank, id: u8) -> Option<Self> {
        if let Some(mic) = Mic::from_bank(bank) {
            return match id {
                0x00 => Some(Self::MicHpf(mic)),
                0x14 => Some(Self::MicVolume(mic)),
                0x15 => Some(Self::MicCompThreshold(mic)),
                0x16 => Some(Self::MicCompAttack(mic)),
                0x17 => Some(Self::MicCompRelease(mic)),
                0x18 => Some(Self::MicCompRatio(mic)),
                _ => None,
            };
        }

        let parameter = match (bank, id) {
            (Bank::System, 0x00) => Self::MasterMusic,
            (Bank::System, 0x01) => Self::MasterMic,
            (Bank::System, 0x02) => Self::MasterEffect,
            (Bank::System, 0x03) => Self::InputSource,
            (Bank::System, 0x0C) => Self::MicFbx(Mic::One),
            (Bank::System, 0x0D) => Self::MicFbx(Mic::Two),
            (Bank::System, 0x16) => Self::MusicEqBypass,
            (Bank::System, 0x21) => Self::MuteMusic,
            (Bank::System, 0x22) => Self::MuteMic,
            (Bank::System, 0x23) => Self::MuteEffect,

            (Bank::Effects, 0x00) => Self::EchoDelay,
            (Bank::Effects, 0x01) => Self::EchoRepeat,
            (Bank::Effects, 0x02) => Self::EchoLpf,
            (Bank::Effects, 0x03) => Self::EchoHpf,
            (Bank::Effects, 0x04) => Self::EchoPreDelay,
            (Bank::Effects, 0x05) => Self::EchoDamping,
            (Bank::Effects, 0x0D) => Self::ReverbTime,
            (Bank::Effects, 0x0E) => Self::ReverbPreDelay,
            (Bank::Effects, 0x10) => Self::ReverbDry,
            (Bank::Effects, 0x27) => Self::EchoVolume,
            (Bank::Effects, 0x28) => Self::EchoDry,
            (Bank::Effects, 0x29) => Self::ReverbVolume,
            (Bank::Effects, 0x2A) => Self::ReverbModel,

            (Bank::Main, 0x00) => Self::MainMusic,
            (Bank::Main, 0x01) => Self::MainMic,

            (Bank::Center, 0x04) => Self::CenterVolume,
            (Bank::Center, 0x06) => Self::CenterMute,
            (Bank::Sub, 0x03) => Self::SubVolume,
            (Bank::Sub, 0x06) => Self::SubPolarity,
            (Bank::Sub, 0x15) => Self::SubMute,
            _ => return None,
        };
        Some(parameter)
    }

    fn from_precision(bank: Bank, id: u8) -> Option<Self> {
        match bank {
            Bank::MusicEq if id < EQ_BANDS => Some(Self::MusicEq(id)),
            Bank::Mic1 | Bank::Mic2 if id < EQ_BANDS => {
                Mic::from_bank(bank).map(|mic| Self::MicEq(mic, id))
            }
            Bank::Main if (MAIN_EQ_BASE..MAIN_EQ_BASE + EQ_BANDS).contains(&id) => {
                Some(Self::MainEq(id - MAIN_EQ_BASE))
            }
            _ => None,
        }
    }

    /// How values for this parameter are encoded.
    #[must_use]
    pub fn encoding(self) -> Encoding {
        match self {
            Self::InputSource | Self::MicFbx(_) | Self::ReverbModel => Encoding::Selector,
            Self::MusicEqBypass
            | Self::MuteMusic
            | Self::MuteMic
            | Self::MuteEffect
            | Self::CenterMute
            | Self::SubPolarity
            | Self::SubMute => Encoding::Toggle,
            Self::MusicEq(_) | Self::MainEq(_) => Encoding::EqGain,
            Self::MicEq(..) => Encoding::Raw16,
            _ => Encoding::Level,
        }
    }

    /// The EQ band, for band-indexed parameters.
    #[must_use]
    pub fn band(self) -> Option<u8> {
        match self {
            Self::MicEq(_, band) | Self::MainEq(band) | Self::MusicEq(band) => Some(band),
            _ => None,
        }
    }

    /// Check that a band-indexed parameter addresses an existing band.
    ///
    /// # Errors
    /// Returns [`Error::InvalidBand`] for bands outside 0-14.
    pub fn validate(self) -> Result<()> {
        match self.band() {
            Some(band) if band >= EQ_BANDS => Err(Error::InvalidBand(band)),
            _ => Ok(()),
        }
    }

    /// Whether the device expects keep-alive pings around writes to this parameter.
    #[must_use]
    pub fn needs_ping_bracket(self) -> bool {
        matches!(self, Self::MicFbx(_))
    }

    /// Convert a logical value into the register value.
    ///
    /// # Errors
    /// Returns [`Error::ValueMismatch`] when the value kind does not fit the
    /// parameter's encoding.
    pub fn encode(self, value: Value, eq: EqGainEncoding) -> Result<u16> {
        match (self.encoding(), value) {
            (Encoding::Level, Value::Level(v)) | (Encoding::Selector, Value::Select(v)) => {
                Ok(u16::from(v))
            }
            (Encoding::Toggle, Value::Toggle(on)) => Ok(u16::from(on)),
            (Encoding::EqGain, Value::Gain(db)) => Ok(eq.to_code(db)),
            (Encoding::Raw16, Value::Raw(raw)) => Ok(raw),
            _ => Err(Error::ValueMismatch { parameter: self.to_string(), value: value.to_string() }),
        }
    }

    /// Convert a register value reported by the device into a logical value.
    #[must_use]
    pub fn decode(self, raw: u16, eq: EqGainEncoding) -> Value {
        let byte = u8::try_from(raw).unwrap_or(u8::MAX);
        match self.encoding() {
            Encoding::Level => Value::Level(byte),
            Encoding::Selector => Value::Select(byte),
            Encoding::Toggle => Value::Toggle(raw != 0),
            Encoding::EqGain => Value::Gain(eq.to_db(raw)),
            Encoding::Raw16 => Value::Raw(raw),
        }
    }

    /// Build a value of the right kind from a plain number.
    ///
    /// Outer layers (config files, browser sliders) only deal in numbers.
    /// Integers are rounded and saturated to the register width.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn coerce(self, number: f64) -> Value {
        match self.encoding() {
            Encoding::Level => Value::Level(number.round().clamp(0.0, 255.0) as u8),
            Encoding::Selector => Value::Select(number.round().clamp(0.0, 255.0) as u8),
            Encoding::Toggle => Value::Toggle(number != 0.0),
            Encoding::EqGain => Value::Gain(number as f32),
            Encoding::Raw16 => Value::Raw(number.round().clamp(0.0, 65535.0) as u16),
        }
    }

    /// Every parameter in the map, band-indexed ones expanded per band.
    #[must_use]
    pub fn all() -> Vec<Self> {
        let mut all = vec![
            Self::MasterMusic,
            Self::MasterMic,
            Self::MasterEffect,
            Self::InputSource,
            Self::MusicEqBypass,
            Self::MuteMusic,
            Self::MuteMic,
            Self::MuteEffect,
            Self::EchoDelay,
            Self::EchoRepeat,
            Self::EchoLpf,
            Self::EchoHpf,
            Self::EchoPreDelay,
            Self::EchoDamping,
            Self::EchoVolume,
            Self::EchoDry,
            Self::ReverbDry,
            Self::ReverbTime,
            Self::ReverbPreDelay,
            Self::ReverbVolume,
            Self::ReverbModel,
            Self::MainMusic,
            Self::MainMic,
            Self::CenterVolume,
            Self::CenterMute,
            Self::SubVolume,
            Self::SubPolarity,
            Self::SubMute,
        ];
        for mic in [Mic::One, Mic::Two] {
            all.extend([
                Self::MicFbx(mic),
                Self::MicVolume(mic),
                Self::MicHpf(mic),
                Self::MicCompThreshold(mic),
                Self::MicCompAttack(mic),
                Self::MicCompRelease(mic),
                Self::MicCompRatio(mic),
            ]);
            all.extend((0..EQ_BANDS).map(|band| Self::MicEq(mic, band)));
        }
        all.extend((0..EQ_BANDS).map(Self::MainEq));
        all.extend((0..EQ_BANDS).map(Self::MusicEq));
        all
    }

    fn mic_suffix(self) -> Option<(Mic, &'static str)> {
        let pair = match self {
            Self::MicVolume(mic) => (mic, ""),
            Self::MicFbx(mic) => (mic, "FBX"),
            Self::MicHpf(mic) => (mic, "HPF"),
            Self::MicCompThreshold(mic) => (mic, "CompThreshold"),
            Self::MicCompAttack(mic) => (mic, "CompAttack"),
            Self::MicCompRelease(mic) => (mic, "CompRelease"),
            Self::MicCompRatio(mic) => (mic, "CompRatio"),
            Self::MicEq(mic, _) => (mic, "EQ"),
            _ => return None,
        };
        Some(pair)
    }

    fn base_name(self) -> &'static str {
        match self {
            Self::MasterMusic => "masterMusic",
            Self::MasterMic => "masterMic",
            Self::MasterEffect => "masterEffect",
            Self::InputSource => "inputSource",
            Self::MusicEqBypass => "musicEQBypass",
            Self::MuteMusic => "muteMusic",
            Self::MuteMic => "muteMic",
            Self::MuteEffect => "muteEffect",
            Self::EchoDelay => "echoDelay",
            Self::EchoRepeat => "echoRepeat",
            Self::EchoLpf => "echoLPF",
            Self::EchoHpf => "echoHPF",
            Self::EchoPreDelay => "echoPreDelay",
            Self::EchoDamping => "echoDamping",
            Self::EchoVolume => "echoVol",
            Self::EchoDry => "echoDry",
            Self::ReverbDry => "reverbDry",
            Self::ReverbTime => "reverbTime",
            Self::ReverbPreDelay => "reverbPreDelay",
            Self::ReverbVolume => "reverbVol",
            Self::ReverbModel => "reverbModel",
            Self::MainMusic => "mainMusic",
            Self::MainMic => "mainMic",
            Self::MainEq(_) => "mainEQ",
            Self::CenterVolume => "masterCenter",
            Self::CenterMute => "muteCenter",
            Self::SubVolume => "masterSub",
            Self::SubPolarity => "subPolarity",
            Self::SubMute => "muteSub",
            Self::MusicEq(_) => "musicEQ",
            // Mic parameters are named by `mic_suffix`
            _ => "mic",
        }
    }

    fn from_base_name(name: &str) -> Option<Self> {
        let parameter = match name {
            "masterMusic" => Self::MasterMusic,
            "masterMic" => Self::MasterMic,
            "masterEffect" => Self::MasterEffect,
            "inputSource" => Self::InputSource,
            "musicEQBypass" => Self::MusicEqBypass,
            "muteMusic" => Self::MuteMusic,
            "muteMic" => Self::MuteMic,
            "muteEffect" => Self::MuteEffect,
            "echoDelay" => Self::EchoDelay,
            "echoRepeat" => Self::EchoRepeat,
            "echoLPF" => Self::EchoLpf,
            "echoHPF" => Self::EchoHpf,
            "echoPreDelay" => Self::EchoPreDelay,
            "echoDamping" => Self::EchoDamping,
            "echoVol" => Self::EchoVolume,
            "echoDry" => Self::EchoDry,
            "reverbDry" => Self::ReverbDry,
            "reverbTime" => Self::ReverbTime,
            "reverbPreDelay" => Self::ReverbPreDelay,
            "reverbVol" => Self::ReverbVolume,
            "reverbModel" => Self::ReverbModel,
            "mainMusic" => Self::MainMusic,
            "mainMic" => Self::MainMic,
            "masterCenter" => Self::CenterVolume,
            "muteCenter" => Self::CenterMute,
            "masterSub" => Self::SubVolume,
            "subPolarity" => Self::SubPolarity,
            "muteSub" => Self::SubMute,
            _ => return None,
        };
        Some(parameter)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((mic, suffix)) = self.mic_suffix() {
            write!(f, "mic{}{suffix}", mic.number())?;
        } else {
            f.write_str(self.base_name())?;
        }
        if let Some(band) = self.band() {
            write!(f, ".{band}")?;
        }
        Ok(())
    }
}

impl FromStr for Parameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let unknown = || Error::UnknownParameter(s.to_string());

        let (name, band) = match s.split_once('.') {
            Some((name, band)) => (name, Some(band.parse::<u8>().map_err(|_| unknown())?)),
            None => (s, None),
        };

        let mic_part = name
            .strip_prefix("mic1")
            .map(|rest| (Mic::One, rest))
            .or_else(|| name.strip_prefix("mic2").map(|rest| (Mic::Two, rest)));

        let parameter = match (mic_part, band) {
            (Some((mic, "EQ")), Some(band)) => Self::MicEq(mic, band),
            (Some((mic, suffix)), None) => match suffix {
                "" => Self::MicVolume(mic),
                "FBX" => Self::MicFbx(mic),
                "HPF" => Self::MicHpf(mic),
                "CompThreshold" => Self::MicCompThreshold(mic),
                "CompAttack" => Self::MicCompAttack(mic),
                "CompRelease" => Self::MicCompRelease(mic),
                "CompRatio" => Self::MicCompRatio(mic),
                _ => return Err(unknown()),
            },
            (None, Some(band)) => match name {
                "musicEQ" => Self::MusicEq(band),
                "mainEQ" => Self::MainEq(band),
                _ => return Err(unknown()),
            },
            (None, None) => Self::from_base_name(name).ok_or_else(unknown)?,
            (Some(_), Some(_)) => return Err(unknown()),
        };

        parameter.validate()?;
        Ok(parameter)
    }
}

impl TryFrom<String> for Parameter {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Parameter> for String {
    fn from(parameter: Parameter) -> Self {
        parameter.to_string()
    }
}

/// A logical parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Value {
    /// Volume-like level
    Level(u8),
    /// On/off switch
    Toggle(bool),
    /// Enumerated selection
    Select(u8),
    /// EQ gain in dB
    Gain(f32),
    /// Raw 16-bit register value
    Raw(u16),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level(v) => write!(f, "level {v}"),
            Self::Toggle(on) => write!(f, "{}", if *on { "on" } else { "off" }),
            Self::Select(v) => write!(f, "option {v}"),
            Self::Gain(db) => write!(f, "{db:+.1} dB"),
            Self::Raw(v) => write!(f, "raw {v:#06x}"),
        }
    }
}
