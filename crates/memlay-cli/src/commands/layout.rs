//! Layout command implementation.
//!
//! Prints each type's size, alignment and field table:
//!
//! ```text
//! struct Abc  size=12 align=4
//!   0x0000  a          u8       1
//!   0x0004  b          u32      4
//!   0x0008  c          u16      2
//! ```

use std::path::Path;

use anyhow::{Result, bail};
use memlay_core::{Declaration, Layout, LayoutCache, PlatformConfig, Schema};
use owo_colors::OwoColorize;
use tracing::info;

/// Run the layout command
pub fn run(schema_path: &Path, config: PlatformConfig, type_name: Option<&str>) -> Result<()> {
    let schema = Schema::load(schema_path)?;
    info!("Computing layouts for {}", config);

    let cache = LayoutCache::new();
    let selected: Vec<_> = match type_name {
        Some(name) => vec![schema.require(name)?],
        None => schema.iter().collect(),
    };

    let mut failures = 0;
    for declaration in selected {
        match cache.reconstruct(declaration, config) {
            Ok(layout) => print_layout(&layout),
            Err(e) => {
                failures += 1;
                println!("{} {}", kind_name(declaration).bold(), declaration.name().bold());
                println!("  {}", e.to_string().red());
            }
        }
        println!();
    }

    if failures > 0 {
        bail!("{} type(s) could not be laid out", failures);
    }
    Ok(())
}

fn kind_name(declaration: &Declaration) -> &'static str {
    if declaration.is_union() { "union" } else { "struct" }
}

fn print_layout(layout: &Layout) {
    let mut flags = Vec::new();
    if layout.is_packed() {
        flags.push("packed");
    }
    if layout.has_vtable() {
        flags.push("virtual");
    }

    println!(
        "{} {}  size={} align={} {}",
        kind_name(layout.declaration()).bold(),
        layout.name().bold(),
        layout.size(),
        layout.alignment(),
        flags.join(" ").dimmed()
    );

    if layout.has_vtable() {
        let pointer_size = layout.config().pointer_size();
        println!(
            "  {:#06x}  {:<10} {:<8} {}",
            0,
            "<vtable>".dimmed(),
            "*void",
            pointer_size
        );
    }
    for field in layout.fields() {
        println!(
            "  {:#06x}  {:<10} {:<8} {}",
            field.offset(),
            field.name(),
            field.data().to_string().cyan().to_string(),
            field.size()
        );
    }
}
