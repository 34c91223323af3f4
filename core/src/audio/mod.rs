//! Platform audio capability
//!
//! The controller only talks to [`AudioBackend`] and [`OutputStream`]. Two
//! implementations exist:
//! - [`CpalBackend`] - real hardware through cpal (feature `cpal`)
//! - [`SimulatedBackend`] - a timer thread that drives the same callback
//!   contract at the same cadence, for hosts without audio hardware
//!
//! Render contract: the callback receives an interleaved stereo `f32` buffer
//! (`L, R, L, R, ...`) and must fill all of it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AudioError;

#[cfg(feature = "cpal")]
mod host;
mod simulated;


#[cfg(feature = "cpal")]
pub use host::CpalBackend;
pub use simulated::SimulatedBackend;

/// Output channel count (always stereo)
pub const CHANNELS: usize = 2;

/// Callback invoked by the platform for each block to render
pub type RenderCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// An output device reported by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// Backend-specific device index (stable for one enumeration)
    pub index: usize,
    pub name: String,
    pub max_output_channels: u16,
    pub default_sample_rate: u32,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} ch, {} Hz)",
            self.name, self.max_output_channels, self.default_sample_rate
        )
    }
}

/// Parameters of an output stream to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub sample_rate: u32,
    /// Frames per callback
    pub block_size: u32,
    /// Device index, or `None` for the platform default
    pub device: Option<usize>,
}

/// Platform audio layer: device enumeration and stream creation
pub trait AudioBackend {
    /// Short human-readable backend name
    fn name(&self) -> &str;

    /// List devices exposing at least one output channel
    fn list_devices(&self) -> Result<Vec<DeviceInfo>, AudioError>;

    /// Open (but do not start) a stereo f32 output stream
    fn open_output_stream(
        &self,
        request: &StreamRequest,
        callback: RenderCallback,
    ) -> Result<Box<dyn OutputStream>, AudioError>;
}

/// An open hardware (or simulated) output stream
pub trait OutputStream {
    /// Begin invoking the render callback
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop invoking the render callback; returns once no callback is running
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Release the stream
    fn close(self: Box<Self>) -> Result<(), AudioError>;
}

/// Which backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Real hardware when an output device exists, otherwise simulated
    #[default]
    Auto,
    /// cpal host audio
    Cpal,
    /// Timer-driven simulation (no sound)
    Simulated,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Auto => "auto",
            BackendKind::Cpal => "cpal",
            BackendKind::Simulated => "simulated",
        })
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(BackendKind::Auto),
            "cpal" | "hardware" => Ok(BackendKind::Cpal),
            "simulated" | "mock" => Ok(BackendKind::Simulated),
            other => Err(format!(
                "unknown backend '{other}' (expected auto, cpal or simulated)"
            )),
        }
    }
}

/// Create a backend of the requested kind
///
/// `Auto` prefers cpal and falls back to the simulated backend when no
/// output device is present (headless machines, WSL, CI).
pub fn create_backend(kind: BackendKind) -> Result<Box<dyn AudioBackend>, AudioError> {
    match kind {
        BackendKind::Simulated => Ok(Box::new(SimulatedBackend::new())),
        BackendKind::Cpal => cpal_backend(),
        BackendKind::Auto => match cpal_backend() {
            Ok(backend) => Ok(backend),
            Err(e) => {
                warn!("{}; using simulated audio backend (no sound)", e);
                Ok(Box::new(SimulatedBackend::new()))
            }
        },
    }
}

#[cfg(feature = "cpal")]
fn cpal_backend() -> Result<Box<dyn AudioBackend>, AudioError> {
    let backend = CpalBackend::new();
    if !backend.has_output_device() {
        return Err(AudioError::BackendUnavailable {
            backend: "cpal",
            reason: format!("{} host has no output device", backend.name()),
        });
    }
    tracing::info!("Audio backend: cpal ({})", backend.name());
    Ok(Box::new(backend))
}

#[cfg(not(feature = "cpal"))]
fn cpal_backend() -> Result<Box<dyn AudioBackend>, AudioError> {
    Err(AudioError::BackendUnavailable {
        backend: "cpal",
        reason: "built without the `cpal` feature".to_string(),
    })
}
