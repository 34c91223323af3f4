//! Shared engine options and controller construction

use anyhow::{Context, Result};
use clap::Args;

use isopulse_core::config::{self, Config};
use isopulse_core::{BackendKind, StreamController, create_backend};

/// Options every playing command accepts; unset fields fall back to the
/// configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Audio backend: auto, cpal or simulated
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// Output device index (see `isopulse devices`)
    #[arg(short, long)]
    pub device: Option<usize>,

    /// Output sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Frames per render callback
    #[arg(long)]
    pub block_size: Option<u32>,

    /// Output volume (0.0-1.0)
    #[arg(short, long)]
    pub volume: Option<f32>,
}

impl EngineArgs {
    /// Fold the command-line overrides into a loaded configuration
    pub fn apply(&self, config: &mut Config) {
        let audio = &mut config.audio;
        if let Some(backend) = self.backend {
            audio.backend = backend;
        }
        if self.device.is_some() {
            audio.device = self.device;
        }
        if let Some(rate) = self.sample_rate {
            audio.sample_rate = rate;
        }
        if let Some(block) = self.block_size {
            audio.block_size = block;
        }
        if let Some(volume) = self.volume {
            audio.volume = volume;
        }
    }
}

/// Load the configuration, apply overrides and build a stopped controller
pub fn open(args: &EngineArgs) -> Result<StreamController> {
    let mut config = config::load();
    args.apply(&mut config);

    let backend = create_backend(config.audio.backend)?;
    let mut controller = StreamController::new(config.audio.stream_config(), backend)
        .context("Invalid audio configuration")?;
    controller.apply_tone(&config.tone);
    if config.audio.device.is_some() {
        controller.set_output_device(config.audio.device);
    }

    Ok(controller)
}
