use std::path::{Path, PathBuf};
use std::time::Duration;

use pi_pinout::{GpioPin, PhysicalPin, WiringPiPin};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strip::Strip;

/// Errors that stop the controller before any animation starts
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("No LED strips are configured")]
    NoStrips,

    #[error("Strip {name}: {reason}")]
    InvalidStrip { name: String, reason: String },
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// The coordinating peer. Without it the button is always authoritative.
    #[serde(default)]
    pub server: Option<ServerConfig>,
    pub button: ButtonConfig,
    pub strips: Vec<Strip>,
    /// How often the button is sampled and the arbiter ticks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Retry a refused or dropped connection after this many milliseconds.
    /// Unset means the controller stays local-only once the peer is gone.
    #[serde(default)]
    pub reconnect_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ButtonConfig {
    pub pin: Pin,
    /// The button pulls the pin to ground when pressed
    #[serde(default = "default_active_low")]
    pub active_low: bool,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum Pin {
    Physical(PhysicalPin),
    Gpio(GpioPin),
    WiringPi(WiringPiPin),
}

impl Pin {
    /// Every pin numbering resolves to the BCM GPIO number rppal expects
    pub fn gpio(self) -> GpioPin {
        match self {
            Pin::Physical(pin) => pin.into(),
            Pin::Gpio(pin) => pin,
            Pin::WiringPi(pin) => pin.into(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_active_low() -> bool {
    true
}

impl Config {
    pub const DEFAULT_PATH: &'static str = "config.ron";

    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let config = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Config::parse(&config)
    }

    /// Parse and validate a config. Nothing may run on a config that fails
    /// here.
    pub fn parse(contents: &str) -> Result<Config, ConfigError> {
        let config: Config = ron::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strips.is_empty() {
            return Err(ConfigError::NoStrips);
        }

        for strip in &self.strips {
            strip.validate()?;
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
