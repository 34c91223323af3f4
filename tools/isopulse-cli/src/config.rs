//! Config command - show or initialize `config.toml`

use anyhow::{Context, Result};
use clap::Args;

use isopulse_core::config::{self, Config};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Write a default config file if none exists
    #[arg(long)]
    pub init: bool,
}

pub fn execute(args: ConfigArgs) -> Result<()> {
    let path = config::config_path();

    if args.init {
        match &path {
            Some(path) if path.exists() => {
                println!("Config already exists: {}", path.display());
            }
            Some(_) => {
                if let Some(written) = config::save(&Config::default())? {
                    println!("Wrote {}", written.display());
                }
            }
            None => println!("No config directory available on this platform"),
        }
        return Ok(());
    }

    match &path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# (no config directory)"),
    }
    let content =
        toml::to_string_pretty(&config::load()).context("Failed to serialize config")?;
    print!("{}", content);

    Ok(())
}
