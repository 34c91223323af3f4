//! Error types for stream lifecycle and configuration
//!
//! Raw platform errors are classified into [`AudioError`] once, inside the
//! backend adapters. Out-of-range parameters never produce an error: they are
//! clamped where they are stored.

use std::path::PathBuf;

/// Failure reported by the platform audio layer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AudioError {
    /// The selected device does not exist, is busy, or rejects the requested rate
    #[error("audio device {} unavailable at {sample_rate} Hz: {reason}", device_label(.device))]
    DeviceUnavailable {
        device: Option<usize>,
        sample_rate: u32,
        reason: String,
    },

    /// The backend could not allocate or configure a stream
    #[error("failed to open output stream on {} at {sample_rate} Hz: {detail}", device_label(.device))]
    StreamOpenFailure {
        device: Option<usize>,
        sample_rate: u32,
        detail: String,
    },

    /// Device enumeration failed
    #[error("failed to query audio devices: {0}")]
    DeviceQueryFailure(String),

    /// Stopping or closing a stream failed
    #[error("failed to close output stream: {0}")]
    StreamCloseFailure(String),

    /// An explicitly requested backend cannot be used in this build or on this host
    #[error("{backend} audio backend unavailable: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: String,
    },
}

fn device_label(device: &Option<usize>) -> String {
    match device {
        Some(index) => format!("#{index}"),
        None => "(default)".to_string(),
    }
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("sample rate must be greater than zero (got {0})")]
    InvalidSampleRate(u32),

    #[error("block size must be greater than zero (got {0})")]
    InvalidBlockSize(u32),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
