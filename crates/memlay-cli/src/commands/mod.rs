//! CLI command implementations.

pub mod layout;
pub mod platforms;
pub mod read;
