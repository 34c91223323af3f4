//! Stream controller tests

use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use super::*;
use crate::audio::{CHANNELS, SimulatedBackend};
use crate::config::ChannelToneConfig;
use crate::test_utils::ManualBackend;

const FRAMES: usize = 32;

fn config() -> StreamConfig {
    StreamConfig {
        sample_rate: 44_100,
        block_size: FRAMES as u32,
        volume: 0.4,
    }
}

fn controller() -> (StreamController, ManualBackend) {
    let backend = ManualBackend::new();
    let controller = StreamController::new(config(), Box::new(backend.clone())).unwrap();
    (controller, backend)
}

fn open_error() -> AudioError {
    AudioError::StreamOpenFailure {
        device: None,
        sample_rate: 44_100,
        detail: "format rejected".to_string(),
    }
}

// =============================================================
// Construction
// =============================================================

#[test]
fn test_new_controller_defaults() {
    let (controller, backend) = controller();
    assert!(!controller.is_playing());
    assert!(controller.channels_linked());
    assert_eq!(controller.left_parameters(), ToneParams::new(440.0, 10.0));
    assert_eq!(controller.right_parameters(), ToneParams::new(440.0, 10.0));
    assert_eq!(controller.volume(), 0.4);
    assert_eq!(controller.sample_rate(), 44_100);
    assert_eq!(controller.block_size(), FRAMES as u32);
    assert_eq!(controller.selected_device(), None);
    assert_eq!(controller.backend_name(), "manual");
    assert_eq!(backend.open_streams(), 0);
}

#[test]
fn test_new_rejects_invalid_config() {
    let bad = StreamConfig {
        block_size: 0,
        ..config()
    };
    let result = StreamController::new(bad, Box::new(ManualBackend::new()));
    assert!(matches!(result, Err(ConfigError::InvalidBlockSize(0))));
}

// =============================================================
// Parameter tests
// =============================================================

#[test]
fn test_linked_channels_stay_equal() {
    let (controller, _backend) = controller();

    controller.set_left_parameters(200.0, 4.0);
    assert_eq!(controller.right_parameters(), ToneParams::new(200.0, 4.0));

    controller.set_right_parameters(300.0, 6.0);
    assert_eq!(controller.left_parameters(), ToneParams::new(300.0, 6.0));
    assert_eq!(controller.left_parameters(), controller.right_parameters());
}

#[test]
fn test_unlinked_channels_are_independent() {
    let (controller, _backend) = controller();
    controller.set_channels_linked(false);

    controller.set_left_parameters(200.0, 4.0);
    controller.set_right_parameters(210.0, 5.0);

    assert_eq!(controller.left_parameters(), ToneParams::new(200.0, 4.0));
    assert_eq!(controller.right_parameters(), ToneParams::new(210.0, 5.0));
}

#[test]
fn test_relinking_copies_left_to_right() {
    let (controller, _backend) = controller();
    controller.set_channels_linked(false);
    controller.set_left_parameters(200.0, 4.0);
    controller.set_right_parameters(210.0, 5.0);

    controller.set_channels_linked(true);

    assert!(controller.channels_linked());
    assert_eq!(controller.right_parameters(), ToneParams::new(200.0, 4.0));
}

#[test]
fn test_negative_frequencies_clamp_to_zero() {
    let (controller, _backend) = controller();
    controller.set_left_parameters(-100.0, f32::NAN);
    assert_eq!(controller.left_parameters(), ToneParams::new(0.0, 0.0));
    assert!(controller.left_parameters().is_silent());
}

#[test]
fn test_volume_clamps() {
    let (controller, _backend) = controller();
    controller.set_volume(1.5);
    assert_eq!(controller.volume(), 1.0);
    controller.set_volume(-0.5);
    assert_eq!(controller.volume(), 0.0);
}

#[test]
fn test_apply_tone_unlinked() {
    let (controller, _backend) = controller();
    controller.apply_tone(&ToneConfig {
        left: ChannelToneConfig {
            carrier_hz: 180.0,
            pulse_hz: 3.0,
        },
        right: ChannelToneConfig {
            carrier_hz: 190.0,
            pulse_hz: 4.0,
        },
        linked: false,
    });

    assert!(!controller.channels_linked());
    assert_eq!(controller.left_parameters(), ToneParams::new(180.0, 3.0));
    assert_eq!(controller.right_parameters(), ToneParams::new(190.0, 4.0));
}

#[test]
fn test_apply_tone_linked_uses_left() {
    let (controller, _backend) = controller();
    controller.apply_tone(&ToneConfig {
        left: ChannelToneConfig {
            carrier_hz: 180.0,
            pulse_hz: 3.0,
        },
        right: ChannelToneConfig {
            carrier_hz: 190.0,
            pulse_hz: 4.0,
        },
        linked: true,
    });

    assert_eq!(controller.right_parameters(), ToneParams::new(180.0, 3.0));
}

// =============================================================
// Lifecycle tests
// =============================================================

#[test]
fn test_start_opens_one_stream() {
    let (mut controller, backend) = controller();
    controller.start().unwrap();
    controller.start().unwrap();

    assert!(controller.is_playing());
    assert!(backend.is_running());
    assert_eq!(backend.open_streams(), 1);
    assert_eq!(backend.state.lock().unwrap().requests.len(), 1);
}

#[test]
fn test_request_carries_stream_settings() {
    let (mut controller, backend) = controller();
    controller.set_output_device(Some(3));
    controller.start().unwrap();

    let request = backend.last_request().unwrap();
    assert_eq!(request.sample_rate, 44_100);
    assert_eq!(request.block_size, FRAMES as u32);
    assert_eq!(request.device, Some(3));
}

#[test]
fn test_stop_is_idempotent() {
    let (mut controller, backend) = controller();
    controller.stop();
    assert_eq!(backend.closed(), 0);

    controller.start().unwrap();
    controller.stop();
    controller.stop();

    assert!(!controller.is_playing());
    assert_eq!(backend.open_streams(), 0);
    assert_eq!(backend.closed(), 1);
}

#[test]
fn test_toggle_alternates() {
    let (mut controller, backend) = controller();
    assert!(controller.toggle_playback().unwrap());
    assert!(controller.is_playing());
    assert!(!controller.toggle_playback().unwrap());
    assert!(!controller.is_playing());
    assert!(controller.toggle_playback().unwrap());
    assert_eq!(backend.closed(), 1);
}

#[test]
fn test_open_failure_leaves_stopped() {
    let (mut controller, backend) = controller();
    backend.fail(|f| f.open = Some(open_error()));

    assert_eq!(controller.start(), Err(open_error()));
    assert!(!controller.is_playing());
    assert_eq!(backend.open_streams(), 0);

    // A failed toggle reports the error and stays stopped
    assert!(controller.toggle_playback().is_err());
    assert!(!controller.is_playing());
}

#[test]
fn test_start_failure_closes_stream() {
    let (mut controller, backend) = controller();
    let err = AudioError::DeviceUnavailable {
        device: None,
        sample_rate: 44_100,
        reason: "device lost".to_string(),
    };
    backend.fail(|f| f.start = Some(err.clone()));

    assert_eq!(controller.start(), Err(err));
    assert!(!controller.is_playing());
    assert_eq!(backend.open_streams(), 0);
    assert_eq!(backend.closed(), 1);

    // Recovers once the device is back
    backend.fail(|f| f.start = None);
    controller.start().unwrap();
    assert!(controller.is_playing());
}

#[test]
fn test_close_failures_are_swallowed() {
    let (mut controller, backend) = controller();
    backend.fail(|f| {
        f.stop = Some(AudioError::StreamCloseFailure("pause failed".to_string()));
        f.close = Some(AudioError::StreamCloseFailure("close failed".to_string()));
    });

    controller.start().unwrap();
    controller.stop();
    assert!(!controller.is_playing());

    controller.start().unwrap();
    assert!(controller.is_playing());
    assert_eq!(backend.open_streams(), 1);
}

#[test]
fn test_drop_stops_stream() {
    let (mut controller, backend) = controller();
    controller.start().unwrap();
    drop(controller);

    assert_eq!(backend.open_streams(), 0);
    assert!(!backend.is_running());
}

// =============================================================
// Render callback tests
// =============================================================

#[test]
fn test_callback_renders_tone() {
    let (mut controller, backend) = controller();
    controller.start().unwrap();

    let block = backend.pump(FRAMES).unwrap();
    assert!(block.iter().all(|s| s.is_finite()));
    // First sample of every channel is at phase zero
    assert_eq!(block[0], 0.0);
    assert_eq!(block[1], 0.0);
    assert!(block.iter().any(|&s| s != 0.0));
    assert!(block.iter().all(|s| s.abs() <= 0.4 + 1e-6));
}

#[test]
fn test_callback_matches_generator() {
    let (mut controller, backend) = controller();
    controller.set_channels_linked(false);
    controller.set_left_parameters(300.0, 5.0);
    controller.set_right_parameters(500.0, 7.0);
    controller.start().unwrap();

    let mut reference = SignalGenerator::new(44_100, 0.4);
    let left = ToneParams::new(300.0, 5.0);
    let right = ToneParams::new(500.0, 7.0);

    for _ in 0..3 {
        let expected = reference.produce_block(FRAMES, left, right);
        assert_eq!(backend.pump(FRAMES).unwrap(), expected);
    }
}

#[test]
fn test_parameter_change_applies_to_next_block() {
    let (mut controller, backend) = controller();
    controller.start().unwrap();
    backend.pump(FRAMES).unwrap();

    controller.set_left_parameters(0.0, 10.0);
    let block = backend.pump(FRAMES).unwrap();
    assert!(block.iter().all(|&s| s == 0.0));
}

#[test]
fn test_restart_resets_phases() {
    let (mut controller, backend) = controller();
    controller.start().unwrap();
    let first = backend.pump(FRAMES).unwrap();
    backend.pump(FRAMES).unwrap();
    backend.pump(FRAMES).unwrap();
    controller.stop();

    controller.start().unwrap();
    assert_eq!(backend.pump(FRAMES).unwrap(), first);
}

#[test]
fn test_linked_channels_render_identically_under_concurrent_setters() {
    let (mut controller, backend) = controller();
    controller.start().unwrap();

    let shared = Arc::clone(&controller.shared);
    let writer = thread::spawn(move || {
        for i in 0..2_000 {
            let params = ToneParams::new(200.0 + (i % 97) as f32, 3.0 + (i % 13) as f32);
            let mut state = state::lock(&shared);
            if i % 2 == 0 {
                state.set_left(params);
            } else {
                state.set_right(params);
            }
        }
    });

    // Equal phases at start plus equal parameters per block keep the
    // channels sample-identical; one mismatched read would split them
    while !writer.is_finished() {
        let block = backend.pump(FRAMES).unwrap();
        for frame in block.chunks_exact(CHANNELS) {
            assert_eq!(frame[0], frame[1]);
        }
    }
    writer.join().unwrap();

    let block = backend.pump(FRAMES).unwrap();
    for frame in block.chunks_exact(CHANNELS) {
        assert_eq!(frame[0], frame[1]);
    }
    assert_eq!(controller.left_parameters(), controller.right_parameters());
}

#[test]
fn test_callback_silent_after_stop() {
    let (controller, _backend) = controller();

    // A callback outliving its stream must render silence
    let mut callback = controller.render_callback();
    let mut block = vec![f32::NAN; FRAMES * CHANNELS];
    callback(&mut block);
    assert!(block.iter().all(|&s| s == 0.0));
}

// =============================================================
// Device tests
// =============================================================

#[test]
fn test_available_devices() {
    let (controller, _backend) = controller();
    let devices = controller.get_available_devices();

    // The input-only microphone at index 1 is left out
    let indices: Vec<usize> = devices.iter().map(|device| device.index).collect();
    assert_eq!(indices, vec![0, 3]);
    assert!(devices.iter().all(|device| device.max_output_channels > 0));
}

#[test]
fn test_device_query_failure_returns_empty() {
    let (controller, backend) = controller();
    backend.fail(|f| f.list = Some(AudioError::DeviceQueryFailure("no host".to_string())));
    assert!(controller.get_available_devices().is_empty());
}

#[test]
fn test_current_device_info() {
    let (mut controller, _backend) = controller();
    assert_eq!(
        controller.get_current_device_info(),
        CurrentDevice {
            index: None,
            name: "Default Device".to_string(),
        }
    );

    controller.set_output_device(Some(3));
    assert_eq!(controller.get_current_device_info().name, "Manual Headphones");

    // Input-only devices cannot be named as outputs
    controller.set_output_device(Some(1));
    assert_eq!(controller.get_current_device_info().name, "Unknown device #1");

    controller.set_output_device(Some(7));
    assert_eq!(
        controller.get_current_device_info(),
        CurrentDevice {
            index: Some(7),
            name: "Unknown device #7".to_string(),
        }
    );
}

#[test]
fn test_device_change_stops_playback() {
    let (mut controller, backend) = controller();
    controller.start().unwrap();

    controller.set_output_device(Some(3));

    assert!(!controller.is_playing());
    assert_eq!(backend.open_streams(), 0);
    assert_eq!(controller.selected_device(), Some(3));

    controller.start().unwrap();
    assert_eq!(backend.last_request().unwrap().device, Some(3));
}

// =============================================================
// Simulated backend
// =============================================================

#[test]
fn test_simulated_backend_session() {
    let backend = SimulatedBackend::new();
    let rendered = backend.blocks_rendered();
    let mut controller = StreamController::new(config(), Box::new(backend)).unwrap();

    controller.set_output_device(Some(1));
    controller.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while rendered.load(Ordering::Relaxed) < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
    assert!(rendered.load(Ordering::Relaxed) >= 2);

    controller.set_left_parameters(600.0, 12.0);
    controller.stop();
    assert!(!controller.is_playing());

    let after_stop = rendered.load(Ordering::Relaxed);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(rendered.load(Ordering::Relaxed), after_stop);
}
