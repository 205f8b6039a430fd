use thiserror::Error;

use crate::platform::PlatformConfig;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid definition of `{type_name}`: {reason}")]
    Definition { type_name: String, reason: String },

    #[error("Failed to access memory at address {address:#x} ({size} bytes): {message}")]
    MemoryAccess {
        address: u64,
        size: usize,
        message: String,
    },

    #[error("Layout was computed for {layout}, but the state reports {state}")]
    ConfigMismatch {
        layout: PlatformConfig,
        state: PlatformConfig,
    },

    #[error("Type `{type_name}` has no field `{field}`")]
    UnknownField { type_name: String, field: String },

    #[error("Value mismatch: expected {expected}, got {actual}")]
    ValueMismatch { expected: String, actual: String },

    #[error("Null pointer dereference at address {address:#x}")]
    NullPointer { address: u64 },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn definition(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Definition {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error stems from a type that cannot be laid out
    pub fn is_definition(&self) -> bool {
        matches!(self, Error::Definition { .. })
    }

    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Check if this error was raised by the memory accessor
    pub fn is_memory_access(&self) -> bool {
        matches!(self, Error::MemoryAccess { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_predicates() {
        let err = Error::definition("Node", "incomplete type");
        assert!(err.is_definition());
        assert!(!err.is_memory_access());

        let err = Error::MemoryAccess {
            address: 0x1000,
            size: 4,
            message: "unmapped".to_string(),
        };
        assert!(err.is_memory_access());
        assert!(!err.is_definition());
    }

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert!(Error::Io(io_err).is_not_found());

        let other = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!Error::Io(other).is_not_found());
    }

    #[test]
    fn test_memory_access_message() {
        let err = Error::MemoryAccess {
            address: 0x1004,
            size: 4,
            message: "unmapped".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to access memory at address 0x1004 (4 bytes): unmapped"
        );
    }
}
