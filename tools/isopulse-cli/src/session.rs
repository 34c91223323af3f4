//! Session command - interactive control from stdin
//!
//! One command per line. Parameter changes apply to the next rendered block,
//! so they can be made while the tone is playing.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;

use isopulse_core::StreamController;

use crate::engine::{self, EngineArgs};

const HELP: &str = "\
Commands:
  left <carrier> <pulse>    set the left channel (Hz)
  right <carrier> <pulse>   set the right channel (Hz)
  link on|off               mirror one channel onto the other
  volume <0.0-1.0>          set output volume
  device <index>|default    select the output device (stops playback)
  devices                   list output devices
  start | stop | toggle     control playback
  status                    show current settings
  help                      show this text
  quit                      stop and exit";

/// Arguments for the session command
#[derive(Args)]
pub struct SessionArgs {
    /// Start playing immediately
    #[arg(long)]
    pub autoplay: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// A parsed session line
#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Left(f32, f32),
    Right(f32, f32),
    Link(bool),
    Volume(f32),
    Device(Option<usize>),
    Devices,
    Start,
    Stop,
    Toggle,
    Status,
    Help,
    Quit,
}

fn parse_number<T: std::str::FromStr>(word: Option<&str>, what: &str) -> Result<T> {
    let word = word.ok_or_else(|| anyhow!("missing {}", what))?;
    word.parse()
        .map_err(|_| anyhow!("invalid {}: '{}'", what, word))
}

fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };

    let command = match name.to_lowercase().as_str() {
        "left" | "l" => Command::Left(
            parse_number(words.next(), "carrier frequency")?,
            parse_number(words.next(), "pulse frequency")?,
        ),
        "right" | "r" => Command::Right(
            parse_number(words.next(), "carrier frequency")?,
            parse_number(words.next(), "pulse frequency")?,
        ),
        "link" => match words.next() {
            Some("on") | Some("true") | Some("1") => Command::Link(true),
            Some("off") | Some("false") | Some("0") => Command::Link(false),
            _ => bail!("usage: link on|off"),
        },
        "volume" | "vol" => Command::Volume(parse_number(words.next(), "volume")?),
        "device" => match words.next() {
            Some("default") => Command::Device(None),
            word => Command::Device(Some(parse_number(word, "device index")?)),
        },
        "devices" => Command::Devices,
        "start" | "play" => Command::Start,
        "stop" => Command::Stop,
        "toggle" | "t" => Command::Toggle,
        "status" | "s" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command '{}' (try 'help')", other),
    };

    if let Some(extra) = words.next() {
        bail!("unexpected argument '{}'", extra);
    }
    Ok(Some(command))
}

fn print_status(controller: &StreamController) {
    let (left, right) = (controller.left_parameters(), controller.right_parameters());
    let device = controller.get_current_device_info();
    println!(
        "{} | L {} Hz / {} Hz | R {} Hz / {} Hz | linked: {} | volume: {:.2}",
        if controller.is_playing() { "playing" } else { "stopped" },
        left.carrier_hz,
        left.pulse_hz,
        right.carrier_hz,
        right.pulse_hz,
        controller.channels_linked(),
        controller.volume(),
    );
    println!(
        "device: {} | {} Hz, {} frames/block via {}",
        device.name,
        controller.sample_rate(),
        controller.block_size(),
        controller.backend_name(),
    );
}

/// Apply one command; returns false when the session should end
fn run_command(controller: &mut StreamController, command: Command) -> bool {
    match command {
        Command::Left(carrier, pulse) => controller.set_left_parameters(carrier, pulse),
        Command::Right(carrier, pulse) => controller.set_right_parameters(carrier, pulse),
        Command::Link(linked) => controller.set_channels_linked(linked),
        Command::Volume(volume) => controller.set_volume(volume),
        Command::Device(device) => controller.set_output_device(device),
        Command::Devices => {
            for device in controller.get_available_devices() {
                println!("  [{}] {}", device.index, device);
            }
        }
        Command::Start => {
            if let Err(e) = controller.start() {
                eprintln!("error: {}", e);
            }
        }
        Command::Stop => controller.stop(),
        Command::Toggle => match controller.toggle_playback() {
            Ok(true) => println!("playing"),
            Ok(false) => println!("stopped"),
            Err(e) => eprintln!("error: {}", e),
        },
        Command::Status => print_status(controller),
        Command::Help => println!("{}", HELP),
        Command::Quit => return false,
    }
    true
}

pub fn execute(args: SessionArgs) -> Result<()> {
    let mut controller = engine::open(&args.engine)?;
    if args.autoplay {
        controller.start()?;
    }

    println!("isopulse session (type 'help' for commands)");
    print_status(&controller);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read stdin")?;

        match parse_command(&line) {
            Ok(Some(command)) => {
                if !run_command(&mut controller, command) {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("error: {}", e),
        }
    }

    controller.stop();
    Ok(())
}
