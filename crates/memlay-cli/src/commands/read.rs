//! Read command implementation.
//!
//! Maps a raw dump at its base address, binds the requested type at an
//! address inside it and prints every field as JSON.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use memlay_core::{BufferState, Instance, LayoutCache, PlatformConfig, Schema};
use tracing::info;

/// Run the read command
pub fn run(
    schema_path: &Path,
    config: PlatformConfig,
    image: &Path,
    base: u64,
    type_name: &str,
    address: u64,
) -> Result<()> {
    let schema = Schema::load(schema_path)?;
    let declaration = schema.require(type_name)?;

    let state = BufferState::from_file(config, base, image)
        .with_context(|| format!("failed to map {}", image.display()))?
        .read_only();
    info!(
        "Mapped {} ({} bytes) at {:#x} for {}",
        image.display(),
        state.len(),
        base,
        config
    );

    let cache = LayoutCache::shared();
    let instance = Instance::of(&cache, declaration, Arc::new(state), address)?;
    let snapshot = instance.snapshot()?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
