//! # memlay-core
//!
//! Typed memory-layout engine for live, externally owned memory.
//!
//! This crate provides:
//! - Platform descriptors (bitness, pointer width, byte order)
//! - C-compatible struct and union layout (natural, packed, virtual)
//! - A per-platform layout cache with canonical, shared results
//! - Live instances that read and write fields straight through a backing
//!   [`AbstractState`], such as another process's address space
//! - TOML schema files describing composite types
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use memlay_core::prelude::*;
//!
//! let header = Declaration::structure("Header")
//!     .field("tag", Data::U8)
//!     .field("length", Data::U32)
//!     .build()?;
//!
//! let cache = LayoutCache::shared();
//! let state = Arc::new(BufferState::zeroed(Preset::Win64.config(), 0x1000, 64));
//!
//! let instance = Instance::of(&cache, &header, state, 0x1000)?;
//! instance.set("length", 42u32)?;
//! assert_eq!(instance.get("length")?.as_u64(), Some(42));
//! assert_eq!(instance.field_address("length")?, 0x1004);
//! # Ok::<(), memlay_core::Error>(())
//! ```

pub mod cache;
pub mod data;
pub mod decl;
pub mod error;
pub mod instance;
pub mod layout;
pub mod memory;
pub mod platform;
pub mod prelude;
pub mod schema;
pub mod value;

pub use cache::LayoutCache;
pub use data::{Data, Primitive, PrimitiveKind};
pub use decl::{CompositeKind, DeclId, Declaration, DeclarationBuilder, Field};
pub use error::{Error, Result};
pub use instance::Instance;
pub use layout::{FieldLayout, Layout, compute_layout};
pub use memory::{AbstractState, BufferState};
pub use platform::{Bits, ByteOrder, PlatformConfig, Preset};
pub use schema::Schema;
pub use value::Value;
