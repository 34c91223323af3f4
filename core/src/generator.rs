//! Isochronic tone synthesis
//!
//! Each channel is a sine carrier multiplied by a square gate. The gate is
//! open for the first half of every pulse cycle, so the carrier is heard in
//! bursts at the pulse rate.
//!
//! Phases are tracked as fractions of a cycle in `[0, 1)` rather than as
//! elapsed time. A frequency change between blocks only changes how fast the
//! accumulator moves, so the waveform never jumps at a block boundary.

use std::f64::consts::TAU;

use crate::audio::CHANNELS;

/// Carrier and pulse frequency for one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneParams {
    /// Audible tone frequency (Hz)
    pub carrier_hz: f32,
    /// Gate rate (Hz)
    pub pulse_hz: f32,
}

impl ToneParams {
    /// Create parameters, clamping negative or non-finite frequencies to zero
    pub fn new(carrier_hz: f32, pulse_hz: f32) -> Self {
        Self {
            carrier_hz: clamp_frequency(carrier_hz),
            pulse_hz: clamp_frequency(pulse_hz),
        }
    }

    /// A channel with a non-positive carrier or pulse frequency is silent
    pub fn is_silent(&self) -> bool {
        clamp_frequency(self.carrier_hz) == 0.0 || clamp_frequency(self.pulse_hz) == 0.0
    }
}

impl Default for ToneParams {
    fn default() -> Self {
        Self {
            carrier_hz: 440.0,
            pulse_hz: 10.0,
        }
    }
}

fn clamp_frequency(hz: f32) -> f32 {
    if hz.is_finite() && hz > 0.0 { hz } else { 0.0 }
}

/// Phase accumulators for one channel, in cycles (`[0, 1)`)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ChannelPhase {
    carrier: f64,
    pulse: f64,
}

impl ChannelPhase {
    /// Render `params` into slot `channel` of every interleaved frame in
    /// `out`, then advance past the block.
    fn render(
        &mut self,
        out: &mut [f32],
        channel: usize,
        params: ToneParams,
        sample_rate: f64,
        volume: f64,
    ) {
        let frames = out.len() / CHANNELS;
        // Public fields can bypass `ToneParams::new`
        let carrier_hz = clamp_frequency(params.carrier_hz) as f64;
        let pulse_hz = clamp_frequency(params.pulse_hz) as f64;

        if params.is_silent() {
            for frame in out.chunks_exact_mut(CHANNELS) {
                frame[channel] = 0.0;
            }
        } else {
            for (i, frame) in out.chunks_exact_mut(CHANNELS).enumerate() {
                let n = i as f64;
                let carrier = (carrier_hz * n / sample_rate + self.carrier) % 1.0;
                let pulse = (pulse_hz * n / sample_rate + self.pulse) % 1.0;

                frame[channel] = if pulse < 0.5 {
                    ((TAU * carrier).sin() * volume) as f32
                } else {
                    0.0
                };
            }
        }

        // Silent channels keep time too; a zero frequency leaves its accumulator put
        let n = frames as f64;
        self.carrier = (carrier_hz * n / sample_rate + self.carrier).rem_euclid(1.0);
        self.pulse = (pulse_hz * n / sample_rate + self.pulse).rem_euclid(1.0);
    }
}

/// Stateful dual-channel isochronic tone generator
///
/// Not synchronized: the owner serializes access (see
/// [`StreamController`](crate::StreamController)).
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    sample_rate: u32,
    volume: f32,
    left: ChannelPhase,
    right: ChannelPhase,
}

impl SignalGenerator {
    /// Create a generator at a fixed sample rate with phases at zero
    pub fn new(sample_rate: u32, volume: f32) -> Self {
        Self {
            sample_rate,
            volume: clamp_volume(volume),
            left: ChannelPhase::default(),
            right: ChannelPhase::default(),
        }
    }

    /// Produce `frames` interleaved stereo samples (`L, R, L, R, ...`)
    pub fn produce_block(&mut self, frames: usize, left: ToneParams, right: ToneParams) -> Vec<f32> {
        let mut block = vec![0.0; frames * CHANNELS];
        self.render_into(&mut block, left, right);
        block
    }

    /// Fill an interleaved stereo buffer in place
    ///
    /// The frame count is `out.len() / 2`. This is the allocation-free path
    /// used from the render callback.
    pub fn render_into(&mut self, out: &mut [f32], left: ToneParams, right: ToneParams) {
        let usable = out.len() - out.len() % CHANNELS;
        let (out, rest) = out.split_at_mut(usable);
        rest.fill(0.0);
        if out.is_empty() {
            return;
        }

        let sample_rate = self.sample_rate as f64;
        let volume = self.volume as f64;
        self.left.render(out, 0, left, sample_rate, volume);
        self.right.render(out, 1, right, sample_rate, volume);
    }

    /// Return every phase accumulator to the waveform origin
    pub fn reset_phases(&mut self) {
        self.left = ChannelPhase::default();
        self.right = ChannelPhase::default();
    }

    /// Set the output gain, clamped to `[0.0, 1.0]`
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Left `(carrier, pulse)` phase in radians, `[0, 2π)`
    pub fn left_phase(&self) -> (f64, f64) {
        (self.left.carrier * TAU, self.left.pulse * TAU)
    }

    /// Right `(carrier, pulse)` phase in radians, `[0, 2π)`
    pub fn right_phase(&self) -> (f64, f64) {
        (self.right.carrier * TAU, self.right.pulse * TAU)
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
