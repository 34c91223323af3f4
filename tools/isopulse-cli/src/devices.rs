//! Devices command - list output devices

use anyhow::Result;
use clap::Args;

use isopulse_core::{BackendKind, config, create_backend};

/// Arguments for the devices command
#[derive(Args)]
pub struct DevicesArgs {
    /// Audio backend to query (defaults to the configured backend)
    #[arg(long)]
    pub backend: Option<BackendKind>,
}

pub fn execute(args: DevicesArgs) -> Result<()> {
    let kind = args.backend.unwrap_or_else(|| config::load().audio.backend);
    let backend = create_backend(kind)?;
    let devices = backend.list_devices()?;

    println!("Output devices ({}):", backend.name());
    if devices.is_empty() {
        println!("  (none)");
    }
    for device in &devices {
        println!("  [{}] {}", device.index, device);
    }

    Ok(())
}
