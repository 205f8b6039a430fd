//! Call-recording state for asserting exact I/O issued by the engine

use parking_lot::Mutex;

use super::{AbstractState, BufferState};
use crate::error::Result;
use crate::platform::PlatformConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read { address: u64, size: usize },
    Write { address: u64, size: usize },
}

#[derive(Debug)]
pub struct RecordingState {
    inner: BufferState,
    log: Mutex<Vec<Access>>,
}

impl RecordingState {
    pub fn new(inner: BufferState) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Drain the accesses recorded so far
    pub fn take_log(&self) -> Vec<Access> {
        std::mem::take(&mut *self.log.lock())
    }
}

impl AbstractState for RecordingState {
    fn config(&self) -> PlatformConfig {
        self.inner.config()
    }

    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.log.lock().push(Access::Read { address, size });
        self.inner.read_bytes(address, size)
    }

    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        self.log.lock().push(Access::Write {
            address,
            size: data.len(),
        });
        self.inner.write_bytes(address, data)
    }
}
