//! Configuration management (`config.toml`)
//!
//! Two layers:
//! - [`StreamConfig`] - construction-time engine settings, fixed for the
//!   lifetime of a [`StreamController`](crate::StreamController)
//! - [`Config`] - the persisted user file, which also carries the backend
//!   choice, the output device and the initial tone

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::BackendKind;
use crate::error::ConfigError;
use crate::generator::ToneParams;

/// Default output sample rate (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Default frames per render callback
pub const DEFAULT_BLOCK_SIZE: u32 = 512;
/// Default output gain
pub const DEFAULT_VOLUME: f32 = 0.4;

/// Engine settings fixed at construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConfig {
    pub sample_rate: u32,
    pub block_size: u32,
    /// Initial volume; clamped to `[0.0, 1.0]` when applied
    pub volume: f32,
}

impl StreamConfig {
    /// Check the invariants a controller relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if self.block_size == 0 {
            return Err(ConfigError::InvalidBlockSize(self.block_size));
        }
        Ok(())
    }

    /// Duration of one block in seconds
    pub fn block_period_secs(&self) -> f64 {
        self.block_size as f64 / self.sample_rate as f64
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            volume: DEFAULT_VOLUME,
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML. Every field has a default, so partial files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Output engine settings
    #[serde(default)]
    pub audio: AudioConfig,
    /// Initial tone parameters
    #[serde(default)]
    pub tone: ToneConfig,
}

/// Audio output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output sample rate (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Frames per render callback (default: 512)
    #[serde(default = "default_block_size")]
    pub block_size: u32,
    /// Output volume (default: 0.4, range: 0.0-1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Audio backend (default: auto)
    #[serde(default)]
    pub backend: BackendKind,
    /// Output device index (default: platform default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<usize>,
}

/// Initial tone configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneConfig {
    #[serde(default)]
    pub left: ChannelToneConfig,
    #[serde(default)]
    pub right: ChannelToneConfig,
    /// Mirror the left channel onto the right (default: true)
    #[serde(default = "default_true")]
    pub linked: bool,
}

/// Carrier and pulse frequency for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelToneConfig {
    /// Carrier frequency in Hz (default: 440)
    #[serde(default = "default_carrier_hz")]
    pub carrier_hz: f32,
    /// Pulse frequency in Hz (default: 10)
    #[serde(default = "default_pulse_hz")]
    pub pulse_hz: f32,
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}
fn default_block_size() -> u32 {
    DEFAULT_BLOCK_SIZE
}
fn default_volume() -> f32 {
    DEFAULT_VOLUME
}
fn default_carrier_hz() -> f32 {
    440.0
}
fn default_pulse_hz() -> f32 {
    10.0
}
fn default_true() -> bool {
    true
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            block_size: default_block_size(),
            volume: default_volume(),
            backend: BackendKind::default(),
            device: None,
        }
    }
}

impl AudioConfig {
    /// The construction-time part of this section
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            sample_rate: self.sample_rate,
            block_size: self.block_size,
            volume: self.volume,
        }
    }
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            left: ChannelToneConfig::default(),
            right: ChannelToneConfig::default(),
            linked: default_true(),
        }
    }
}

impl Default for ChannelToneConfig {
    fn default() -> Self {
        Self {
            carrier_hz: default_carrier_hz(),
            pulse_hz: default_pulse_hz(),
        }
    }
}

impl From<ChannelToneConfig> for ToneParams {
    fn from(config: ChannelToneConfig) -> Self {
        ToneParams::new(config.carrier_hz, config.pulse_hz)
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Isopulse\config`
/// On macOS: `~/Library/Application Support/io.isopulse.Isopulse`
/// On Linux: `~/.config/isopulse`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.isopulse", "", "Isopulse")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path of the default configuration file, if a config directory exists
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Loads the configuration from the default location.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> Config {
    config_path()
        .and_then(|path| match load_from(&path) {
            Ok(config) => Some(config),
            Err(ConfigError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                None
            }
            Err(e) => {
                tracing::warn!("Ignoring config: {}", e);
                None
            }
        })
        .unwrap_or_default()
}

/// Loads the configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Saves the configuration to the default location.
///
/// Creates the directory if it doesn't exist. Returns the path written, or
/// `None` when no config directory can be determined.
pub fn save(config: &Config) -> Result<Option<PathBuf>, ConfigError> {
    let Some(path) = config_path() else {
        return Ok(None);
    };
    save_to(config, &path)?;
    Ok(Some(path))
}

/// Saves the configuration to an explicit path.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
