//! Hardware audio output using cpal

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, BuildStreamError, FromSample, PlayStreamError, Sample, SampleFormat, SizedSample,
    SupportedBufferSize, SupportedStreamConfigRange,
};
use tracing::{debug, error, info};

use super::{AudioBackend, CHANNELS, DeviceInfo, OutputStream, RenderCallback, StreamRequest};
use crate::error::AudioError;

/// Sample formats we can feed, most preferred first
const PREFERRED_FORMATS: [SampleFormat; 3] = [SampleFormat::F32, SampleFormat::I16, SampleFormat::U16];

/// Backend over the platform's default cpal host
pub struct CpalBackend {
    host: cpal::Host,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Whether the host reports a default output device
    pub fn has_output_device(&self) -> bool {
        self.host.default_output_device().is_some()
    }

    fn find_device(&self, request: &StreamRequest) -> Result<cpal::Device, AudioError> {
        match request.device {
            Some(index) => self
                .host
                .devices()
                .map_err(|e| AudioError::StreamOpenFailure {
                    device: request.device,
                    sample_rate: request.sample_rate,
                    detail: format!("failed to enumerate audio devices: {e}"),
                })?
                .nth(index)
                .ok_or_else(|| unavailable(request, format!("no audio device with index {index}"))),
            None => self
                .host
                .default_output_device()
                .ok_or_else(|| unavailable(request, "no default output device".to_string())),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &str {
        self.host.id().name()
    }

    fn list_devices(&self) -> Result<Vec<DeviceInfo>, AudioError> {
        let devices = self
            .host
            .devices()
            .map_err(|e| AudioError::DeviceQueryFailure(e.to_string()))?;

        Ok(devices
            .enumerate()
            .filter_map(|(index, device)| {
                let max_output_channels = device
                    .supported_output_configs()
                    .ok()?
                    .map(|config| config.channels())
                    .max()
                    .unwrap_or(0);
                if max_output_channels == 0 {
                    return None;
                }

                Some(DeviceInfo {
                    index,
                    name: device.name().unwrap_or_else(|_| format!("Device {index}")),
                    max_output_channels,
                    default_sample_rate: device
                        .default_output_config()
                        .map(|config| config.sample_rate().0)
                        .unwrap_or(0),
                })
            })
            .collect())
    }

    fn open_output_stream(
        &self,
        request: &StreamRequest,
        callback: RenderCallback,
    ) -> Result<Box<dyn OutputStream>, AudioError> {
        let device = self.find_device(request)?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());
        let (sample_format, channels, buffer_size) = select_config(&device, request)?;

        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(request.sample_rate),
            buffer_size,
        };
        let block_size = request.block_size as usize;
        let channels = channels as usize;

        let stream = match sample_format {
            SampleFormat::F32 if channels == CHANNELS => {
                let mut callback = callback;
                device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| callback(data),
                    report_stream_error,
                    None,
                )
            }
            SampleFormat::F32 => {
                build_converted::<f32>(&device, &config, callback, block_size, channels)
            }
            SampleFormat::I16 => {
                build_converted::<i16>(&device, &config, callback, block_size, channels)
            }
            SampleFormat::U16 => {
                build_converted::<u16>(&device, &config, callback, block_size, channels)
            }
            other => {
                return Err(AudioError::StreamOpenFailure {
                    device: request.device,
                    sample_rate: request.sample_rate,
                    detail: format!("unsupported sample format: {other:?}"),
                });
            }
        }
        .map_err(|e| classify_build_error(e, request))?;

        info!(
            "Opened output stream on {} ({} Hz, {} ch, {:?}, {:?})",
            device_name, request.sample_rate, channels, sample_format, config.buffer_size
        );

        Ok(Box::new(CpalStream {
            stream,
            request: *request,
        }))
    }
}

/// Best supported range for `rate`: preferred format first, then the fewest
/// channels that still hold a stereo frame
fn choose_range(
    ranges: &[SupportedStreamConfigRange],
    rate: u32,
) -> Option<&SupportedStreamConfigRange> {
    PREFERRED_FORMATS.iter().find_map(|format| {
        ranges
            .iter()
            .filter(|range| {
                range.sample_format() == *format
                    && range.channels() as usize >= CHANNELS
                    && range.min_sample_rate().0 <= rate
                    && range.max_sample_rate().0 >= rate
            })
            .min_by_key(|range| range.channels())
    })
}

/// Pick a configuration with at least two channels covering the requested rate
fn select_config(
    device: &cpal::Device,
    request: &StreamRequest,
) -> Result<(SampleFormat, u16, BufferSize), AudioError> {
    let ranges: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| unavailable(request, format!("cannot read supported configurations: {e}")))?
        .collect();

    let range = choose_range(&ranges, request.sample_rate)
        .ok_or_else(|| unavailable(request, "no stereo output configuration at this rate".to_string()))?;

    let buffer_size = match range.buffer_size() {
        SupportedBufferSize::Range { min, max } if (*min..=*max).contains(&request.block_size) => {
            BufferSize::Fixed(request.block_size)
        }
        supported => {
            debug!(
                "Block size {} outside device range {:?}; using backend default",
                request.block_size, supported
            );
            BufferSize::Default
        }
    };

    Ok((range.sample_format(), range.channels(), buffer_size))
}

/// Copy rendered stereo frames into a device buffer of `channels` per frame
///
/// Left and right land in the first two slots; any further channels are
/// written as silence.
fn spread_stereo<T: Sample + FromSample<f32>>(stereo: &[f32], out: &mut [T], channels: usize) {
    for (frame, pair) in out.chunks_mut(channels).zip(stereo.chunks_exact(CHANNELS)) {
        for (slot, value) in frame.iter_mut().enumerate() {
            *value = match pair.get(slot) {
                Some(&sample) => T::from_sample(sample),
                None => T::EQUILIBRIUM,
            };
        }
    }
}

/// Build a stream that needs conversion: an integer format, or more than two
/// channels per frame. Renders f32 stereo into a scratch buffer first.
fn build_converted<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut callback: RenderCallback,
    block_size: usize,
    channels: usize,
) -> Result<cpal::Stream, BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    // Pre-allocate for the requested block; only grows if the host hands us more
    let mut scratch: Vec<f32> = vec![0.0; block_size * CHANNELS];
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let stereo_len = data.len() / channels * CHANNELS;
            if scratch.len() < stereo_len {
                scratch.resize(stereo_len, 0.0);
            }
            let rendered = &mut scratch[..stereo_len];
            callback(rendered);
            spread_stereo(rendered, data, channels);
        },
        report_stream_error,
        None,
    )
}

fn report_stream_error(err: cpal::StreamError) {
    error!("Audio stream error: {}", err);
}

fn unavailable(request: &StreamRequest, reason: String) -> AudioError {
    AudioError::DeviceUnavailable {
        device: request.device,
        sample_rate: request.sample_rate,
        reason,
    }
}

fn classify_build_error(err: BuildStreamError, request: &StreamRequest) -> AudioError {
    match err {
        BuildStreamError::DeviceNotAvailable => {
            unavailable(request, "device is not available (disconnected or busy)".to_string())
        }
        BuildStreamError::StreamConfigNotSupported => {
            unavailable(request, "stream configuration not supported".to_string())
        }
        BuildStreamError::InvalidArgument => {
            unavailable(request, "device rejected the stream arguments".to_string())
        }
        other => AudioError::StreamOpenFailure {
            device: request.device,
            sample_rate: request.sample_rate,
            detail: other.to_string(),
        },
    }
}

/// An open cpal stream; dropping it releases the device
struct CpalStream {
    stream: cpal::Stream,
    request: StreamRequest,
}

impl OutputStream for CpalStream {
    fn start(&mut self) -> Result<(), AudioError> {
        self.stream.play().map_err(|e| match e {
            PlayStreamError::DeviceNotAvailable => {
                unavailable(&self.request, "device is not available (disconnected or busy)".to_string())
            }
            other => AudioError::StreamOpenFailure {
                device: self.request.device,
                sample_rate: self.request.sample_rate,
                detail: format!("failed to play audio stream: {other}"),
            },
        })
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.stream
            .pause()
            .map_err(|e| AudioError::StreamCloseFailure(format!("failed to pause audio stream: {e}")))
    }

    fn close(self: Box<Self>) -> Result<(), AudioError> {
        // cpal tears the stream down (and joins its callback thread) on drop
        let CpalStream { stream, .. } = *self;
        drop(stream);
        debug!("Output stream closed");
        Ok(())
    }
}
