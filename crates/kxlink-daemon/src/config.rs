//! Daemon configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use kxlink_core::{EqGainEncoding, Parameter, Value};
use kxlink_hid::handshake::REFINED_SETTLE;
use kxlink_hid::{HandshakeScript, MixerConfig};
use serde::{Deserialize, Serialize};

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub handshake: HandshakeConfig,
    #[serde(default)]
    pub eq: EqConfig,
    /// Applied once the lock is established
    #[serde(default)]
    pub startup: StartupConfig,
}

/// Filter used when neither `RUST_LOG` nor `log_level` is set.
pub const DEFAULT_LOG_FILTER: &str = "info,kxlink_hid=info,kxlink_daemon=debug";

/// Daemon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DaemonConfig {
    /// Log filter, e.g. `warn` or `info,kxlink_hid=trace`. Used verbatim
    /// when `RUST_LOG` is not set.
    pub log_level: Option<String>,
}

impl DaemonConfig {
    /// Pick the tracing filter: `RUST_LOG`, then the configured level, then
    /// the built-in defaults. The first one present is used on its own.
    #[must_use]
    pub fn log_filter(&self, rust_log: Option<&str>) -> String {
        rust_log
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| self.log_level.as_deref().map(str::trim).filter(|s| !s.is_empty()))
            .unwrap_or(DEFAULT_LOG_FILTER)
            .to_string()
    }
}

/// USB identity of the mixer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// USB Vendor ID, hex
    #[serde(default = "default_vid")]
    pub vendor_id: String,
    /// USB Product ID, hex
    #[serde(default = "default_pid")]
    pub product_id: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { vendor_id: default_vid(), product_id: default_pid() }
    }
}

impl DeviceConfig {
    /// Parsed vendor and product ids.
    pub fn ids(&self) -> Result<(u16, u16)> {
        Ok((parse_hex_id(&self.vendor_id)?, parse_hex_id(&self.product_id)?))
    }
}

fn parse_hex_id(text: &str) -> Result<u16> {
    let digits = text.trim().trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).with_context(|| format!("Invalid USB id: {text:?}"))
}

fn default_vid() -> String {
    "1210".to_string()
}

fn default_pid() -> String {
    "0042".to_string()
}

/// Which handshake to replay.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HandshakeConfig {
    /// Captured script (JSON array of hex strings). Without one the built-in
    /// legacy sequence is used.
    pub script: Option<PathBuf>,
    /// Pause after each frame, overriding the script's default
    pub settle_ms: Option<u64>,
}

impl HandshakeConfig {
    pub fn build(&self) -> Result<HandshakeScript> {
        let settle = self.settle_ms.map(Duration::from_millis);
        match &self.script {
            Some(path) => HandshakeScript::load(path, settle.unwrap_or(REFINED_SETTLE))
                .with_context(|| format!("Failed to load handshake script: {}", path.display())),
            None => {
                let legacy = HandshakeScript::legacy().context("Built-in handshake is malformed")?;
                Ok(match settle {
                    Some(settle) => HandshakeScript::new(legacy.frames().to_vec(), settle),
                    None => legacy,
                })
            }
        }
    }
}

/// EQ settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EqConfig {
    #[serde(default)]
    pub encoding: EqGainEncoding,
}

/// Settings applied after the lock is acquired.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StartupConfig {
    /// Preset index to recall (0-9)
    pub preset: Option<usize>,
    /// Run the audible line check
    #[serde(default)]
    pub diagnostic_pulse: bool,
    /// Parameter name to number, e.g. `masterMusic = 40`
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
}

impl StartupConfig {
    /// Resolve the configured parameters.
    pub fn parameters(&self) -> Result<Vec<(Parameter, Value)>> {
        self.parameters
            .iter()
            .map(|(name, number)| {
                let parameter: Parameter =
                    name.parse().with_context(|| format!("Unknown startup parameter: {name}"))?;
                Ok((parameter, parameter.coerce(*number)))
            })
            .collect()
    }
}

impl Config {
    /// Session settings derived from this configuration.
    pub fn mixer_config(&self) -> Result<MixerConfig> {
        let (vendor_id, product_id) = self.device.ids()?;
        Ok(MixerConfig {
            vendor_id,
            product_id,
            handshake: self.handshake.build()?,
            eq_encoding: self.eq.encoding,
        })
    }
}

/// Load configuration from `path`, or defaults if it does not exist.
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Get the configuration file path.
pub fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "kxlink", "KxLink").context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}
