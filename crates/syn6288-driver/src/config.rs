//! Driver configuration, loadable from TOML.
//!
//! ```toml
//! port = "/dev/ttyUSB0"
//! link_baud_rate = "9600"
//! baud_rate = "19200"
//! mode = "background-3"
//! text_type = "unicode"
//! synthesis_volume = 12
//! send_config = true
//! ```
//!
//! Every field is optional; missing fields take the values of
//! [`DriverConfig::default`].

use crate::error::{Result, Syn6288Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use syn6288_chip::command::SYNC_POLL_MS;
use syn6288_chip::params::{MAX_BACKGROUND_VOLUME, MAX_SYNTHESIS_SPEED, MAX_SYNTHESIS_VOLUME};
use syn6288_chip::{BaudRate, Mode, TextType};

/// Port used when none is configured.
pub const DEFAULT_PORT: &str = "/dev/ttyS0";

/// Settings for opening a SYN6288 and the parameters pushed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// tty device node the chip is wired to.
    pub port: PathBuf,
    /// Rate the chip is listening at when the port is opened.
    pub link_baud_rate: BaudRate,
    /// Rate pushed to the chip when `send_config` is set.
    pub baud_rate: BaudRate,
    /// Background music mode for text synthesis.
    pub mode: Mode,
    /// Encoding of synthesized text.
    pub text_type: TextType,
    /// Synthesis volume, 0..=16.
    pub synthesis_volume: u8,
    /// Background music volume, 0..=16.
    pub background_volume: u8,
    /// Speech speed, 0..=5.
    pub synthesis_speed: u8,
    /// Push rate, volumes and speed to the chip on open.
    pub send_config: bool,
    /// Silence after which a serial read returns short.
    pub read_timeout_ms: u32,
    /// Interval between status polls while waiting for playback to end.
    pub sync_poll_ms: u32,
    /// Status polls before waiting gives up.
    pub sync_max_polls: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            port: PathBuf::from(DEFAULT_PORT),
            link_baud_rate: BaudRate::Bps9600,
            baud_rate: BaudRate::Bps9600,
            mode: Mode::Common,
            text_type: TextType::Gb2312,
            synthesis_volume: MAX_SYNTHESIS_VOLUME,
            background_volume: 0,
            synthesis_speed: MAX_SYNTHESIS_SPEED,
            send_config: false,
            read_timeout_ms: 500,
            sync_poll_ms: SYNC_POLL_MS,
            sync_max_polls: 240,
        }
    }
}

impl DriverConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `Syn6288Error::Config` if the TOML is invalid or a value is
    /// out of range.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| Syn6288Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| match e {
            Syn6288Error::Config { reason } => {
                Syn6288Error::config(format!("{}: {reason}", path.display()))
            }
            other => other,
        })
    }

    /// Serialize to TOML.
    ///
    /// # Errors
    ///
    /// Returns `Syn6288Error::Config` if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Syn6288Error::config(e.to_string()))
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Syn6288Error::Config` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("synthesis_volume", self.synthesis_volume, MAX_SYNTHESIS_VOLUME),
            ("background_volume", self.background_volume, MAX_BACKGROUND_VOLUME),
            ("synthesis_speed", self.synthesis_speed, MAX_SYNTHESIS_SPEED),
        ];
        for (name, value, max) in limits {
            if value > max {
                return Err(Syn6288Error::config(format!("{name} = {value}, max {max}")));
            }
        }
        if self.sync_poll_ms == 0 {
            return Err(Syn6288Error::config("sync_poll_ms must be non-zero"));
        }
        if self.sync_max_polls == 0 {
            return Err(Syn6288Error::config("sync_max_polls must be non-zero"));
        }
        Ok(())
    }
}
