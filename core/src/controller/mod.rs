//! Stream lifecycle and live parameter control
//!
//! Two execution contexts meet here:
//!
//! ```text
//! Control thread                        Render callback (backend thread)
//!     │                                        │
//! [set_left / set_volume ...]                  │
//!     │──lock──► SharedState ◄──lock───[read params, render block]
//!     │                                        │
//! [start / stop] ──► OutputStream ──(drives)──►│
//! ```
//!
//! The lock is never held while calling into the backend: tearing a stream
//! down waits for an in-flight callback, and that callback needs the lock.

mod state;

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, info, warn};

use crate::audio::{AudioBackend, DeviceInfo, OutputStream, RenderCallback, StreamRequest};
use crate::config::{StreamConfig, ToneConfig};
use crate::error::{AudioError, ConfigError};
use crate::generator::{SignalGenerator, ToneParams};

use state::SharedState;

/// Name and index of the device the next `start()` will use
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentDevice {
    /// `None` for the platform default
    pub index: Option<usize>,
    pub name: String,
}

/// Owns the generator, the live parameters and at most one output stream
///
/// Setters take `&self` and only touch the shared state; lifecycle methods
/// take `&mut self`. Dropping the controller stops playback first.
pub struct StreamController {
    config: StreamConfig,
    backend: Box<dyn AudioBackend>,
    shared: Arc<Mutex<SharedState>>,
    stream: Option<Box<dyn OutputStream>>,
    device: Option<usize>,
}

impl StreamController {
    /// Create a stopped controller
    ///
    /// Starts at 440 Hz carrier / 10 Hz pulse on both channels, linked, on
    /// the platform default device.
    pub fn new(config: StreamConfig, backend: Box<dyn AudioBackend>) -> Result<Self, ConfigError> {
        config.validate()?;
        let generator = SignalGenerator::new(config.sample_rate, config.volume);

        Ok(Self {
            config,
            backend,
            shared: Arc::new(Mutex::new(SharedState::new(generator))),
            stream: None,
            device: None,
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, SharedState> {
        state::lock(&self.shared)
    }

    // =============================================================
    // Parameters
    // =============================================================

    /// Set the left channel; mirrored to the right while linked
    pub fn set_left_parameters(&self, carrier_hz: f32, pulse_hz: f32) {
        self.lock_state()
            .set_left(ToneParams::new(carrier_hz, pulse_hz));
    }

    /// Set the right channel; mirrored to the left while linked
    pub fn set_right_parameters(&self, carrier_hz: f32, pulse_hz: f32) {
        self.lock_state()
            .set_right(ToneParams::new(carrier_hz, pulse_hz));
    }

    /// Enabling the link copies left onto right immediately
    pub fn set_channels_linked(&self, linked: bool) {
        self.lock_state().set_linked(linked);
    }

    /// Set the output volume, clamped to `[0.0, 1.0]`
    pub fn set_volume(&self, volume: f32) {
        self.lock_state().generator.set_volume(volume);
    }

    /// Apply a configured tone (link flag first, then both sides)
    pub fn apply_tone(&self, tone: &ToneConfig) {
        let mut state = self.lock_state();
        state.linked = tone.linked;
        state.left = tone.left.into();
        state.right = if tone.linked { state.left } else { tone.right.into() };
    }

    pub fn left_parameters(&self) -> ToneParams {
        self.lock_state().left
    }

    pub fn right_parameters(&self) -> ToneParams {
        self.lock_state().right
    }

    pub fn channels_linked(&self) -> bool {
        self.lock_state().linked
    }

    pub fn volume(&self) -> f32 {
        self.lock_state().generator.volume()
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn block_size(&self) -> u32 {
        self.config.block_size
    }

    // =============================================================
    // Devices
    // =============================================================

    /// Select the device for the next `start()`, stopping playback first
    ///
    /// A live stream cannot move devices, so the caller restarts playback
    /// when it wants sound on the new device.
    pub fn set_output_device(&mut self, device: Option<usize>) {
        if self.is_playing() {
            self.stop();
        }
        self.device = device;
        match device {
            Some(index) => info!("Output device set to #{}", index),
            None => info!("Output device set to platform default"),
        }
    }

    pub fn selected_device(&self) -> Option<usize> {
        self.device
    }

    /// Devices with at least one output channel; empty if the query fails
    pub fn get_available_devices(&self) -> Vec<DeviceInfo> {
        match self.backend.list_devices() {
            Ok(devices) => devices
                .into_iter()
                .filter(|device| device.max_output_channels > 0)
                .collect(),
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }

    /// Name and index of the selected device
    pub fn get_current_device_info(&self) -> CurrentDevice {
        let Some(index) = self.device else {
            return CurrentDevice {
                index: None,
                name: "Default Device".to_string(),
            };
        };

        let name = self
            .get_available_devices()
            .into_iter()
            .find(|device| device.index == index)
            .map(|device| device.name)
            .unwrap_or_else(|| format!("Unknown device #{index}"));

        CurrentDevice {
            index: Some(index),
            name,
        }
    }

    /// Name of the active audio backend
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    // =============================================================
    // Lifecycle
    // =============================================================

    pub fn is_playing(&self) -> bool {
        self.stream.is_some()
    }

    /// Open and start an output stream; no-op while playing
    ///
    /// Every session starts from phase zero. On failure the controller is
    /// left stopped with no stream.
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.stream.is_some() {
            return Ok(());
        }

        self.lock_state().generator.reset_phases();

        let request = StreamRequest {
            sample_rate: self.config.sample_rate,
            block_size: self.config.block_size,
            device: self.device,
        };
        let mut stream = self
            .backend
            .open_output_stream(&request, self.render_callback())
            .inspect_err(|e| error!("Error starting audio stream: {}", e))?;

        // Mark playing before the first callback can run
        self.lock_state().playing = true;

        if let Err(e) = stream.start() {
            error!("Error starting audio stream: {}", e);
            self.lock_state().playing = false;
            if let Err(close_err) = stream.close() {
                warn!("{}", close_err);
            }
            return Err(e);
        }

        self.stream = Some(stream);
        info!(
            "Playback started ({} Hz, {} frames/block, device {:?})",
            self.config.sample_rate, self.config.block_size, self.device
        );
        Ok(())
    }

    /// Stop and close the stream; no-op while stopped
    ///
    /// Never fails: close errors are logged and the stream handle is cleared
    /// regardless, so the next `start()` is never blocked.
    pub fn stop(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };

        self.lock_state().playing = false;

        if let Err(e) = stream.stop() {
            warn!("{}", e);
        }
        if let Err(e) = stream.close() {
            warn!("{}", e);
        }
        info!("Playback stopped");
    }

    /// Stop if playing, else start; returns the resulting playing state
    pub fn toggle_playback(&mut self) -> Result<bool, AudioError> {
        if self.is_playing() {
            self.stop();
        } else {
            self.start()?;
        }
        Ok(self.is_playing())
    }

    fn render_callback(&self) -> RenderCallback {
        let shared = Arc::clone(&self.shared);
        Box::new(move |out: &mut [f32]| {
            state::lock(&shared).render(out);
        })
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        self.stop();
    }
}
