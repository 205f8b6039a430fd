use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use memlay_core::Preset;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod settings;

use settings::Settings;

#[derive(Parser)]
#[command(name = "memlay")]
#[command(version, about = "Inspect C struct layouts and live memory images")]
struct Args {
    /// Settings file with default platform, schema and base address
    #[arg(short, long, default_value = "memlay.toml", env = "MEMLAY_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print computed layouts for the types in a schema
    Layout {
        /// Schema file (TOML)
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Target platform preset
        #[arg(short, long)]
        platform: Option<Preset>,

        /// Only show this type
        #[arg(short = 't', long = "type")]
        type_name: Option<String>,
    },

    /// Bind a type over a memory image and print its fields as JSON
    Read {
        /// Schema file (TOML)
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Target platform preset
        #[arg(short, long)]
        platform: Option<Preset>,

        /// Raw memory dump to map
        #[arg(short, long)]
        image: PathBuf,

        /// Address the first byte of the image is mapped at
        #[arg(short, long, value_parser = parse_address)]
        base: Option<u64>,

        /// Type to bind
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Address of the instance
        #[arg(short, long, value_parser = parse_address)]
        at: u64,
    },

    /// List the built-in platform presets
    Platforms,
}

/// Parse a hex (`0x`-prefixed) or decimal address
fn parse_address(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid address {:?}: {}", s, e))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("memlay=info".parse()?))
        .init();

    let args = Args::parse();

    let settings = match Settings::load(&args.config) {
        Ok(s) => {
            debug!("Loaded settings from {:?}", args.config);
            s
        }
        Err(e) if e.is_not_found() => Settings::default(),
        Err(e) => {
            warn!("Failed to load settings: {}, using defaults", e);
            Settings::default()
        }
    };

    match args.command {
        Command::Layout {
            schema,
            platform,
            type_name,
        } => {
            let schema = settings.schema_path(schema)?;
            commands::layout::run(
                &schema,
                settings.platform(platform),
                type_name.as_deref(),
            )
        }
        Command::Read {
            schema,
            platform,
            image,
            base,
            type_name,
            at,
        } => {
            let schema = settings.schema_path(schema)?;
            commands::read::run(
                &schema,
                settings.platform(platform),
                &image,
                settings.base(base),
                &type_name,
                at,
            )
        }
        Command::Platforms => commands::platforms::run(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x1000"), Ok(0x1000));
        assert_eq!(parse_address("0X40_0000"), Ok(0x40_0000));
        assert_eq!(parse_address("4096"), Ok(4096));
        assert!(parse_address("0xZZ").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn test_args_parse_read() {
        let args = Args::try_parse_from([
            "memlay", "read", "-s", "types.toml", "-p", "win32", "-i", "dump.bin", "-t", "Node",
            "--at", "0x1010",
        ])
        .unwrap();

        match args.command {
            Command::Read {
                platform, at, base, ..
            } => {
                assert_eq!(platform, Some(Preset::Win32));
                assert_eq!(at, 0x1010);
                assert_eq!(base, None);
            }
            _ => panic!("expected read command"),
        }
    }
}
