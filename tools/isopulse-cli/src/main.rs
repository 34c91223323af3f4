//! Isopulse CLI - isochronic tone player
//!
//! # Commands
//!
//! - `isopulse devices` - List audio output devices
//! - `isopulse play` - Play a tone for a fixed time or until Enter
//! - `isopulse session` - Interactive control (change parameters while playing)
//! - `isopulse config` - Show or initialize the configuration file
//!
//! # Usage
//!
//! ```bash
//! # 200 Hz carrier pulsed at 10 Hz for 30 seconds
//! isopulse play --carrier 200 --pulse 10 --duration 30
//!
//! # Different pulse rate per ear on the second device
//! isopulse play --carrier 200 --pulse 8 --right-pulse 12 --device 1
//!
//! # Interactive session without sound hardware
//! isopulse session --backend simulated
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default: `info`).

mod config;
mod devices;
mod engine;
mod play;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Isopulse - isochronic tone player
#[derive(Parser)]
#[command(name = "isopulse")]
#[command(about = "Isochronic tone player")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List audio output devices
    Devices(devices::DevicesArgs),

    /// Play a tone until the duration elapses or Enter is pressed
    Play(play::PlayArgs),

    /// Interactive session reading commands from stdin
    Session(session::SessionArgs),

    /// Show the effective configuration
    Config(config::ConfigArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices(args) => devices::execute(args),
        Commands::Play(args) => play::execute(args),
        Commands::Session(args) => session::execute(args),
        Commands::Config(args) => config::execute(args),
    }
}
