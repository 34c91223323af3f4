//! Isopulse Core - isochronic tone engine
//!
//! This crate synthesizes a two-channel isochronic tone (a sine carrier per
//! channel, gated on and off by a square pulse) and streams it to an audio
//! output device while parameters change live.
//!
//! # Architecture
//!
//! - [`SignalGenerator`] - Phase-continuous stereo block synthesis
//! - [`StreamController`] - Live parameters, device selection and stream lifecycle
//! - [`AudioBackend`] - Platform audio capability (cpal or simulated)
//! - [`Config`] - Persistent settings (`config.toml`)

pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod generator;
#[cfg(test)]
pub mod test_utils;

pub use audio::{
    AudioBackend, BackendKind, CHANNELS, DeviceInfo, OutputStream, RenderCallback,
    SimulatedBackend, StreamRequest, create_backend,
};
#[cfg(feature = "cpal")]
pub use audio::CpalBackend;
pub use config::{AudioConfig, Config, StreamConfig, ToneConfig};
pub use controller::{CurrentDevice, StreamController};
pub use error::{AudioError, ConfigError};
pub use generator::{SignalGenerator, ToneParams};
