use std::fs;
use std::path::Path;

use parking_lot::RwLock;
use tracing::debug;

use super::AbstractState;
use crate::error::{Error, Result};
use crate::platform::PlatformConfig;

/// In-memory byte image mapped at a fixed base address
#[derive(Debug)]
pub struct BufferState {
    config: PlatformConfig,
    base: u64,
    bytes: RwLock<Vec<u8>>,
    writable: bool,
}

impl BufferState {
    pub fn new(config: PlatformConfig, base: u64, bytes: Vec<u8>) -> Self {
        Self {
            config,
            base,
            bytes: RwLock::new(bytes),
            writable: true,
        }
    }

    /// Image of `len` zero bytes
    pub fn zeroed(config: PlatformConfig, base: u64, len: usize) -> Self {
        Self::new(config, base, vec![0; len])
    }

    /// Map the contents of a dump file at `base`
    pub fn from_file<P: AsRef<Path>>(config: PlatformConfig, base: u64, path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        debug!(
            "Mapped {} bytes from {} at {:#x}",
            bytes.len(),
            path.display(),
            base
        );
        Ok(Self::new(config, base, bytes))
    }

    /// Reject all writes from now on
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.bytes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the whole image
    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.read().clone()
    }

    fn range(&self, address: u64, size: usize) -> Result<std::ops::Range<usize>> {
        let unmapped = || Error::MemoryAccess {
            address,
            size,
            message: format!(
                "range not mapped (image spans {:#x}..{:#x})",
                self.base,
                self.base.saturating_add(self.len() as u64)
            ),
        };

        let start = address
            .checked_sub(self.base)
            .and_then(|offset| usize::try_from(offset).ok())
            .ok_or_else(unmapped)?;
        let end = start.checked_add(size).ok_or_else(unmapped)?;
        if end > self.len() {
            return Err(unmapped());
        }
        Ok(start..end)
    }
}

impl AbstractState for BufferState {
    fn config(&self) -> PlatformConfig {
        self.config
    }

    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let range = self.range(address, size)?;
        Ok(self.bytes.read()[range].to_vec())
    }

    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(Error::MemoryAccess {
                address,
                size: data.len(),
                message: "image is read-only".to_string(),
            });
        }
        let range = self.range(address, data.len())?;
        self.bytes.write()[range].copy_from_slice(data);
        Ok(())
    }
}
