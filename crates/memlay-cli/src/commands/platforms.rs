//! Platforms command implementation.

use anyhow::Result;
use memlay_core::{PlatformConfig, Preset};
use owo_colors::OwoColorize;

/// Run the platforms command
pub fn run() -> Result<()> {
    println!(
        "{:<12} {:>4} {:>8} {:>7}",
        "PRESET".bold(),
        "BITS".bold(),
        "POINTER".bold(),
        "ORDER".bold()
    );

    let host = PlatformConfig::system();
    for preset in Preset::all() {
        let config = preset.config();
        let marker = if preset != Preset::Host && config == host {
            " (host)"
        } else {
            ""
        };
        println!(
            "{:<12} {:>4} {:>8} {:>7}{}",
            preset.to_string(),
            config.bits().as_u32(),
            config.pointer_size(),
            config.byte_order().to_string(),
            marker.dimmed()
        );
    }

    Ok(())
}
