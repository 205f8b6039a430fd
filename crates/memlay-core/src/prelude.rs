//! Prelude module for convenient imports
//!
//! ```ignore
//! use memlay_core::prelude::*;
//! ```

// Declarations and layouts
pub use crate::cache::LayoutCache;
pub use crate::data::Data;
pub use crate::decl::Declaration;
pub use crate::layout::{FieldLayout, Layout};

// Live access
pub use crate::instance::Instance;
pub use crate::memory::{AbstractState, BufferState};
pub use crate::value::Value;

// Platforms
pub use crate::platform::{ByteOrder, PlatformConfig, Preset};

// Error handling
pub use crate::error::{Error, Result};
