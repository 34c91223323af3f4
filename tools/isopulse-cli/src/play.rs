//! Play command - one tone for a fixed time or until Enter

use std::io::BufRead;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::engine::{self, EngineArgs};

/// Arguments for the play command
#[derive(Args)]
pub struct PlayArgs {
    /// Carrier frequency in Hz (both channels unless --right-carrier is set)
    #[arg(short, long)]
    pub carrier: Option<f32>,

    /// Pulse frequency in Hz (both channels unless --right-pulse is set)
    #[arg(short, long)]
    pub pulse: Option<f32>,

    /// Right channel carrier; unlinks the channels
    #[arg(long)]
    pub right_carrier: Option<f32>,

    /// Right channel pulse; unlinks the channels
    #[arg(long)]
    pub right_pulse: Option<f32>,

    /// Seconds to play (default: until Enter is pressed)
    #[arg(short = 't', long)]
    pub duration: Option<f64>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

pub fn execute(args: PlayArgs) -> Result<()> {
    let mut controller = engine::open(&args.engine)?;

    let left = controller.left_parameters();
    let carrier = args.carrier.unwrap_or(left.carrier_hz);
    let pulse = args.pulse.unwrap_or(left.pulse_hz);

    if args.right_carrier.is_some() || args.right_pulse.is_some() {
        controller.set_channels_linked(false);
        controller.set_left_parameters(carrier, pulse);
        controller.set_right_parameters(
            args.right_carrier.unwrap_or(carrier),
            args.right_pulse.unwrap_or(pulse),
        );
    } else if args.carrier.is_some() || args.pulse.is_some() {
        controller.set_channels_linked(true);
        controller.set_left_parameters(carrier, pulse);
    }

    let wait = match args.duration {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Some(Duration::from_secs_f64(secs)),
        Some(secs) => bail!("Invalid duration: {}", secs),
        None => None,
    };

    controller.start()?;

    let (left, right) = (controller.left_parameters(), controller.right_parameters());
    println!(
        "Playing on {} via {}: L {} Hz / {} Hz, R {} Hz / {} Hz",
        controller.get_current_device_info().name,
        controller.backend_name(),
        left.carrier_hz,
        left.pulse_hz,
        right.carrier_hz,
        right.pulse_hz,
    );

    match wait {
        Some(duration) => std::thread::sleep(duration),
        None => {
            println!("Press Enter to stop");
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read stdin")?;
        }
    }

    controller.stop();
    Ok(())
}
