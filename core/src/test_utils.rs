//! Test utilities
//!
//! [`ManualBackend`] hands the render callback to the test instead of a
//! hardware thread, so blocks can be pumped synchronously and failures
//! injected at each lifecycle step.

use std::sync::{Arc, Mutex};

use crate::audio::{AudioBackend, CHANNELS, DeviceInfo, OutputStream, RenderCallback, StreamRequest};
use crate::error::AudioError;

/// What the test wants the next lifecycle call to do
#[derive(Debug, Clone, Default)]
pub struct Failures {
    pub list: Option<AudioError>,
    pub open: Option<AudioError>,
    pub start: Option<AudioError>,
    pub stop: Option<AudioError>,
    pub close: Option<AudioError>,
}

/// Observable state shared between a [`ManualBackend`] and the test
#[derive(Default)]
pub struct ManualState {
    /// Callback of the currently open stream
    pub callback: Option<RenderCallback>,
    /// Every request passed to `open_output_stream`
    pub requests: Vec<StreamRequest>,
    pub open_streams: usize,
    pub running: bool,
    pub closed: usize,
    pub failures: Failures,
}

/// Backend driven by the test
#[derive(Clone, Default)]
pub struct ManualBackend {
    pub state: Arc<Mutex<ManualState>>,
}

impl ManualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke the render callback once, returning the rendered block
    ///
    /// Returns `None` if no stream is open.
    pub fn pump(&self, frames: usize) -> Option<Vec<f32>> {
        // Take the callback out so it runs without the backend lock held
        let mut callback = self.state.lock().unwrap().callback.take()?;
        let mut block = vec![f32::NAN; frames * CHANNELS];
        callback(&mut block);
        self.state.lock().unwrap().callback = Some(callback);
        Some(block)
    }

    pub fn fail(&self, set: impl FnOnce(&mut Failures)) {
        set(&mut self.state.lock().unwrap().failures);
    }

    pub fn open_streams(&self) -> usize {
        self.state.lock().unwrap().open_streams
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    pub fn last_request(&self) -> Option<StreamRequest> {
        self.state.lock().unwrap().requests.last().copied()
    }
}

impl AudioBackend for ManualBackend {
    fn name(&self) -> &str {
        "manual"
    }

    fn list_devices(&self) -> Result<Vec<DeviceInfo>, AudioError> {
        if let Some(err) = self.state.lock().unwrap().failures.list.clone() {
            return Err(err);
        }
        Ok(vec![
            DeviceInfo {
                index: 0,
                name: "Manual Speakers".to_string(),
                max_output_channels: 2,
                default_sample_rate: 44_100,
            },
            DeviceInfo {
                index: 1,
                name: "Manual Microphone".to_string(),
                max_output_channels: 0,
                default_sample_rate: 48_000,
            },
            DeviceInfo {
                index: 3,
                name: "Manual Headphones".to_string(),
                max_output_channels: 2,
                default_sample_rate: 48_000,
            },
        ])
    }

    fn open_output_stream(
        &self,
        request: &StreamRequest,
        callback: RenderCallback,
    ) -> Result<Box<dyn OutputStream>, AudioError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(*request);
        if let Some(err) = state.failures.open.clone() {
            return Err(err);
        }
        assert_eq!(state.open_streams, 0, "a second stream was opened");
        state.callback = Some(callback);
        state.open_streams += 1;
        Ok(Box::new(ManualStream {
            state: Arc::clone(&self.state),
        }))
    }
}

struct ManualStream {
    state: Arc<Mutex<ManualState>>,
}

impl OutputStream for ManualStream {
    fn start(&mut self) -> Result<(), AudioError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.failures.start.clone() {
            return Err(err);
        }
        state.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        let mut state = self.state.lock().unwrap();
        state.running = false;
        match state.failures.stop.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn close(self: Box<Self>) -> Result<(), AudioError> {
        let mut state = self.state.lock().unwrap();
        state.running = false;
        state.callback = None;
        state.open_streams -= 1;
        state.closed += 1;
        match state.failures.close.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
