//! Backing memory for live instances
//!
//! The engine never owns memory. Every field access goes through an
//! [`AbstractState`], which may be a remote process, a dump file or a plain
//! buffer.

mod buffer;

#[cfg(test)]
pub mod mock;

pub use buffer::BufferState;

#[cfg(test)]
pub use mock::{Access, RecordingState};

use crate::error::Result;
use crate::platform::PlatformConfig;

/// Byte-addressable view of some target address space
///
/// Implementations own whatever synchronization the target needs; both
/// methods take `&self` so a state can be shared between instances.
pub trait AbstractState: Send + Sync {
    /// ABI the state was opened under
    fn config(&self) -> PlatformConfig;

    /// Read exactly `size` bytes starting at `address`
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    /// Write all of `data` starting at `address`
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()>;
}
