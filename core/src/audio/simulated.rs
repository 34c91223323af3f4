//! Simulated audio backend
//!
//! Stands in for real hardware when no output device exists. A started
//! stream runs a render thread that calls the render callback once per block
//! period with a zeroed buffer and throws the result away.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use super::{AudioBackend, CHANNELS, DeviceInfo, OutputStream, RenderCallback, StreamRequest};
use crate::error::AudioError;

/// Lowest sample rate the simulated devices accept
const MIN_SAMPLE_RATE: u32 = 8_000;
/// Highest sample rate the simulated devices accept
const MAX_SAMPLE_RATE: u32 = 192_000;

/// Timer-driven backend with a fixed set of mock devices
pub struct SimulatedBackend {
    devices: Vec<DeviceInfo>,
    blocks_rendered: Arc<AtomicU64>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        let device = |index: usize, name: &str, default_sample_rate: u32| DeviceInfo {
            index,
            name: name.to_string(),
            max_output_channels: 2,
            default_sample_rate,
        };

        Self {
            devices: vec![
                device(0, "Simulated Default Output", 44_100),
                device(1, "Simulated Secondary Output", 48_000),
                device(2, "Simulated Headphones", 44_100),
            ],
            blocks_rendered: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Counter of blocks rendered by every stream this backend opened
    pub fn blocks_rendered(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.blocks_rendered)
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    fn list_devices(&self) -> Result<Vec<DeviceInfo>, AudioError> {
        Ok(self.devices.clone())
    }

    fn open_output_stream(
        &self,
        request: &StreamRequest,
        callback: RenderCallback,
    ) -> Result<Box<dyn OutputStream>, AudioError> {
        let unavailable = |reason: String| AudioError::DeviceUnavailable {
            device: request.device,
            sample_rate: request.sample_rate,
            reason,
        };

        if let Some(index) = request.device.filter(|&i| i >= self.devices.len()) {
            return Err(unavailable(format!("no simulated device with index {index}")));
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&request.sample_rate) {
            return Err(unavailable(format!(
                "sample rate outside {MIN_SAMPLE_RATE}-{MAX_SAMPLE_RATE} Hz"
            )));
        }
        if request.block_size == 0 {
            return Err(AudioError::StreamOpenFailure {
                device: request.device,
                sample_rate: request.sample_rate,
                detail: "block size must be greater than zero".to_string(),
            });
        }

        let period =
            Duration::from_secs_f64(request.block_size as f64 / request.sample_rate as f64);
        debug!(
            "Opened simulated stream: {} frames every {:.2} ms",
            request.block_size,
            period.as_secs_f64() * 1000.0
        );

        Ok(Box::new(SimulatedStream {
            callback: Some(callback),
            worker: None,
            block_size: request.block_size as usize,
            period,
            blocks_rendered: Arc::clone(&self.blocks_rendered),
        }))
    }
}

/// Handle to a running render thread
struct RenderWorker {
    /// Dropping the sender tells the thread to exit
    tx: Option<SyncSender<()>>,
    /// The thread hands the callback back when it exits
    handle: Option<JoinHandle<RenderCallback>>,
}

struct SimulatedStream {
    /// Present while stopped, moved into the worker while running
    callback: Option<RenderCallback>,
    worker: Option<RenderWorker>,
    block_size: usize,
    period: Duration,
    blocks_rendered: Arc<AtomicU64>,
}

impl SimulatedStream {
    fn render_loop(
        mut callback: RenderCallback,
        rx: mpsc::Receiver<()>,
        block_size: usize,
        period: Duration,
        blocks_rendered: Arc<AtomicU64>,
    ) -> RenderCallback {
        let mut buffer = vec![0.0f32; block_size * CHANNELS];
        let mut deadline = Instant::now();

        loop {
            buffer.fill(0.0);
            callback(&mut buffer);
            blocks_rendered.fetch_add(1, Ordering::Relaxed);

            // Schedule against a deadline so render time doesn't accumulate as drift
            deadline += period;
            let wait = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        callback
    }
}

impl OutputStream for SimulatedStream {
    fn start(&mut self) -> Result<(), AudioError> {
        if self.worker.is_some() {
            return Ok(());
        }
        let Some(callback) = self.callback.take() else {
            return Err(AudioError::StreamOpenFailure {
                device: None,
                sample_rate: 0,
                detail: "render callback lost by a previous render thread".to_string(),
            });
        };

        let (tx, rx) = mpsc::sync_channel::<()>(1);
        let block_size = self.block_size;
        let period = self.period;
        let blocks_rendered = Arc::clone(&self.blocks_rendered);

        let handle = thread::Builder::new()
            .name("isopulse-sim".into())
            .spawn(move || Self::render_loop(callback, rx, block_size, period, blocks_rendered))
            .map_err(|e| AudioError::StreamOpenFailure {
                device: None,
                sample_rate: 0,
                detail: format!("failed to spawn render thread: {e}"),
            })?;

        self.worker = Some(RenderWorker {
            tx: Some(tx),
            handle: Some(handle),
        });
        debug!("Simulated stream started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        let Some(mut worker) = self.worker.take() else {
            return Ok(());
        };

        // Drop the sender before joining, or the thread never sees the disconnect
        drop(worker.tx.take());

        let Some(handle) = worker.handle.take() else {
            return Ok(());
        };
        match handle.join() {
            Ok(callback) => {
                self.callback = Some(callback);
                debug!("Simulated stream stopped");
                Ok(())
            }
            Err(_) => {
                error!("Simulated render thread panicked");
                Err(AudioError::StreamCloseFailure(
                    "simulated render thread panicked".to_string(),
                ))
            }
        }
    }

    fn close(mut self: Box<Self>) -> Result<(), AudioError> {
        self.stop()
    }
}

impl Drop for SimulatedStream {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("{}", e);
        }
    }
}
