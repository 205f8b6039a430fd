//! Target platform descriptors
//!
//! A [`PlatformConfig`] captures the parts of an ABI that affect composite
//! layout: bitness, pointer width and byte order. Configs are plain values,
//! compared and hashed by content, so they double as cache keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::{Error, Result};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order of the running host
    pub const NATIVE: Self = if cfg!(target_endian = "big") {
        Self::Big
    } else {
        Self::Little
    };

    /// Decode an unsigned integer from `bytes` (at most 8 of them)
    pub fn read_uint(self, bytes: &[u8]) -> u64 {
        let fold = |acc: u64, &byte: &u8| (acc << 8) | u64::from(byte);
        match self {
            Self::Big => bytes.iter().fold(0, fold),
            Self::Little => bytes.iter().rev().fold(0, fold),
        }
    }

    /// Encode the low `width` bytes of `value`
    pub fn write_uint(self, value: u64, width: usize) -> Vec<u8> {
        let bytes = value.to_le_bytes();
        let mut out = bytes[..width].to_vec();
        if self == Self::Big {
            out.reverse();
        }
        out
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
pub enum Bits {
    #[serde(rename = "32")]
    #[strum(serialize = "32")]
    B32,
    #[serde(rename = "64")]
    #[strum(serialize = "64")]
    B64,
}

impl Bits {
    pub fn as_u32(self) -> u32 {
        match self {
            Self::B32 => 32,
            Self::B64 => 64,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPlatformConfig {
    bits: Bits,
    pointer_size: usize,
    byte_order: ByteOrder,
}

impl TryFrom<RawPlatformConfig> for PlatformConfig {
    type Error = Error;

    fn try_from(raw: RawPlatformConfig) -> Result<Self> {
        Self::new(raw.bits, raw.pointer_size, raw.byte_order)
    }
}

/// Immutable description of a target ABI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPlatformConfig")]
pub struct PlatformConfig {
    bits: Bits,
    pointer_size: usize,
    byte_order: ByteOrder,
}

impl PlatformConfig {
    /// Create a config, rejecting pointer sizes other than 4 or 8 bytes
    pub fn new(bits: Bits, pointer_size: usize, byte_order: ByteOrder) -> Result<Self> {
        if pointer_size != 4 && pointer_size != 8 {
            return Err(Error::definition(
                "PlatformConfig",
                format!("pointer size must be 4 or 8 bytes, got {}", pointer_size),
            ));
        }

        Ok(Self {
            bits,
            pointer_size,
            byte_order,
        })
    }

    const fn preset(bits: Bits, pointer_size: usize, byte_order: ByteOrder) -> Self {
        Self {
            bits,
            pointer_size,
            byte_order,
        }
    }

    /// Config of the running host
    pub const fn system() -> Self {
        let pointer_size = std::mem::size_of::<usize>();
        let bits = if pointer_size == 4 { Bits::B32 } else { Bits::B64 };
        Self::preset(bits, pointer_size, ByteOrder::NATIVE)
    }

    pub fn bits(&self) -> Bits {
        self.bits
    }

    pub fn pointer_size(&self) -> usize {
        self.pointer_size
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Display for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-bit/{}-byte pointers/{}-endian",
            self.bits, self.pointer_size, self.byte_order
        )
    }
}

/// Named platform configurations
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Display,
)]
pub enum Preset {
    #[serde(rename = "host")]
    #[strum(serialize = "host")]
    Host,
    #[serde(rename = "win32")]
    #[strum(serialize = "win32")]
    Win32,
    #[serde(rename = "win64")]
    #[strum(serialize = "win64")]
    Win64,
    #[serde(rename = "macos-x64")]
    #[strum(serialize = "macos-x64")]
    MacOsX64,
    #[serde(rename = "macos-arm64")]
    #[strum(serialize = "macos-arm64")]
    MacOsArm64,
    #[serde(rename = "android32")]
    #[strum(serialize = "android32")]
    Android32,
    #[serde(rename = "android64")]
    #[strum(serialize = "android64")]
    Android64,
    #[serde(rename = "be32")]
    #[strum(serialize = "be32")]
    Be32,
    #[serde(rename = "be64")]
    #[strum(serialize = "be64")]
    Be64,
}

impl Preset {
    /// Every preset, in declaration order
    pub fn all() -> impl Iterator<Item = Preset> {
        Self::iter()
    }

    pub fn config(self) -> PlatformConfig {
        use ByteOrder::{Big, Little};

        match self {
            Self::Host => PlatformConfig::system(),
            Self::Win32 | Self::Android32 => PlatformConfig::preset(Bits::B32, 4, Little),
            Self::Win64 | Self::MacOsX64 | Self::MacOsArm64 | Self::Android64 => {
                PlatformConfig::preset(Bits::B64, 8, Little)
            }
            Self::Be32 => PlatformConfig::preset(Bits::B32, 4, Big),
            Self::Be64 => PlatformConfig::preset(Bits::B64, 8, Big),
        }
    }
}

impl From<Preset> for PlatformConfig {
    fn from(preset: Preset) -> Self {
        preset.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_pointer_size_validation() {
        assert!(PlatformConfig::new(Bits::B32, 4, ByteOrder::Little).is_ok());
        assert!(PlatformConfig::new(Bits::B64, 8, ByteOrder::Big).is_ok());

        let err = PlatformConfig::new(Bits::B64, 6, ByteOrder::Little).unwrap_err();
        assert!(err.is_definition());
    }

    #[test]
    fn test_system_matches_host() {
        let config = PlatformConfig::system();
        assert_eq!(config.pointer_size(), std::mem::size_of::<usize>());
        assert_eq!(config.byte_order(), ByteOrder::NATIVE);
        assert_eq!(config, PlatformConfig::default());
    }

    #[test]
    fn test_configs_compare_by_value() {
        let a = PlatformConfig::new(Bits::B32, 4, ByteOrder::Little).unwrap();
        assert_eq!(a, Preset::Win32.config());
        assert_ne!(a, Preset::Be32.config());
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!(Preset::from_str("win64").unwrap(), Preset::Win64);
        assert_eq!(Preset::from_str("macos-arm64").unwrap(), Preset::MacOsArm64);
        assert!(Preset::from_str("amiga").is_err());
        assert_eq!(Preset::Android32.to_string(), "android32");
        assert_eq!(Preset::all().count(), 9);
    }

    #[test]
    fn test_byte_order_codec() {
        assert_eq!(ByteOrder::Little.read_uint(&[0x78, 0x56, 0x34, 0x12]), 0x1234_5678);
        assert_eq!(ByteOrder::Big.read_uint(&[0x12, 0x34, 0x56, 0x78]), 0x1234_5678);
        assert_eq!(ByteOrder::Big.write_uint(0x1234, 2), vec![0x12, 0x34]);
        assert_eq!(ByteOrder::Little.write_uint(0x1234, 2), vec![0x34, 0x12]);
    }

    #[test]
    fn test_deserialize_rejects_bad_pointer_size() {
        let ok: PlatformConfig =
            serde_json::from_str(r#"{"bits":"32","pointer_size":4,"byte_order":"little"}"#)
                .unwrap();
        assert_eq!(ok, Preset::Win32.config());

        let bad = serde_json::from_str::<PlatformConfig>(
            r#"{"bits":"64","pointer_size":2,"byte_order":"little"}"#,
        );
        assert!(bad.is_err());
    }
}
