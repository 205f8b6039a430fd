//! Settings file (`memlay.toml`)
//!
//! Every value is optional; command-line flags take precedence.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use memlay_core::{PlatformConfig, Preset};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub platform: Option<Preset>,
    pub schema: Option<PathBuf>,
    pub base: Option<u64>,
}

impl Settings {
    pub fn load<P: AsRef<Path>>(path: P) -> memlay_core::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Platform from the flag, then the file, then the host
    pub fn platform(&self, flag: Option<Preset>) -> PlatformConfig {
        flag.or(self.platform).unwrap_or(Preset::Host).config()
    }

    pub fn schema_path(&self, flag: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        flag.or_else(|| self.schema.clone())
            .ok_or_else(|| anyhow!("no schema given (use --schema or set `schema` in settings)"))
    }

    /// Image base from the flag, then the file, then zero
    pub fn base(&self, flag: Option<u64>) -> u64 {
        flag.or(self.base).unwrap_or(0)
    }
}
