//! Wire representations of values
//!
//! [`Data`] describes how a value is laid out in target memory. Every variant
//! knows its size and alignment for a given [`PlatformConfig`] and how to read
//! or write itself through an [`AbstractState`].
//!
//! Composite data reads produce a live [`Instance`] bound at the address.
//! Composite writes are a no-op: nested structs and unions are mutated field
//! by field through that instance, never replaced wholesale.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::cache::LayoutCache;
use crate::decl::Declaration;
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::memory::AbstractState;
use crate::platform::{ByteOrder, PlatformConfig};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Signed,
    Unsigned,
    Float,
    Bool,
}

/// Fixed-width scalar; size and alignment never depend on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Primitive {
    width: usize,
    kind: PrimitiveKind,
}

impl Primitive {
    pub const U8: Self = Self::raw(1, PrimitiveKind::Unsigned);
    pub const U16: Self = Self::raw(2, PrimitiveKind::Unsigned);
    pub const U32: Self = Self::raw(4, PrimitiveKind::Unsigned);
    pub const U64: Self = Self::raw(8, PrimitiveKind::Unsigned);
    pub const I8: Self = Self::raw(1, PrimitiveKind::Signed);
    pub const I16: Self = Self::raw(2, PrimitiveKind::Signed);
    pub const I32: Self = Self::raw(4, PrimitiveKind::Signed);
    pub const I64: Self = Self::raw(8, PrimitiveKind::Signed);
    pub const F32: Self = Self::raw(4, PrimitiveKind::Float);
    pub const F64: Self = Self::raw(8, PrimitiveKind::Float);
    pub const BOOL: Self = Self::raw(1, PrimitiveKind::Bool);

    const fn raw(width: usize, kind: PrimitiveKind) -> Self {
        Self { width, kind }
    }

    pub fn new(width: usize, kind: PrimitiveKind) -> Result<Self> {
        let valid = match kind {
            PrimitiveKind::Signed | PrimitiveKind::Unsigned => matches!(width, 1 | 2 | 4 | 8),
            PrimitiveKind::Float => matches!(width, 4 | 8),
            PrimitiveKind::Bool => width == 1,
        };
        if !valid {
            return Err(Error::definition(
                format!("{:?}", kind),
                format!("unsupported width {}", width),
            ));
        }
        Ok(Self::raw(width, kind))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    fn decode(&self, bytes: &[u8], order: ByteOrder) -> Value {
        let raw = order.read_uint(bytes);
        match self.kind {
            PrimitiveKind::Unsigned => Value::Unsigned(raw),
            PrimitiveKind::Signed => Value::Signed(sign_extend(raw, self.width)),
            PrimitiveKind::Float if self.width == 4 => {
                Value::Float(f64::from(f32::from_bits(raw as u32)))
            }
            PrimitiveKind::Float => Value::Float(f64::from_bits(raw)),
            PrimitiveKind::Bool => Value::Bool(raw != 0),
        }
    }

    fn encode(&self, value: &Value, order: ByteOrder) -> Result<Vec<u8>> {
        let raw = match (self.kind, value) {
            (PrimitiveKind::Unsigned | PrimitiveKind::Signed, Value::Signed(_) | Value::Unsigned(_)) => {
                integer_bits(self.kind, self.width, value)?
            }
            (PrimitiveKind::Float, Value::Float(v)) if self.width == 4 => {
                u64::from((*v as f32).to_bits())
            }
            (PrimitiveKind::Float, Value::Float(v)) => v.to_bits(),
            (PrimitiveKind::Bool, Value::Bool(v)) => u64::from(*v),
            _ => return Err(mismatch(self.to_string(), value)),
        };
        Ok(order.write_uint(raw, self.width))
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PrimitiveKind::Unsigned => write!(f, "u{}", self.width * 8),
            PrimitiveKind::Signed => write!(f, "i{}", self.width * 8),
            PrimitiveKind::Float => write!(f, "f{}", self.width * 8),
            PrimitiveKind::Bool => f.write_str("bool"),
        }
    }
}

fn sign_extend(raw: u64, width: usize) -> i64 {
    let shift = 64 - width * 8;
    ((raw << shift) as i64) >> shift
}

fn mismatch(expected: impl Into<String>, actual: &Value) -> Error {
    Error::ValueMismatch {
        expected: expected.into(),
        actual: actual.kind_name().to_string(),
    }
}

/// Two's-complement bits of an integer value, checked against `width`
fn integer_bits(kind: PrimitiveKind, width: usize, value: &Value) -> Result<u64> {
    let bits = (width * 8) as u32;
    let out_of_range = || Error::ValueMismatch {
        expected: format!("{}-byte {:?} integer", width, kind),
        actual: format!("{:?}", value),
    };

    match kind {
        PrimitiveKind::Unsigned => {
            let v = value.as_u64().ok_or_else(out_of_range)?;
            if bits < 64 && v >> bits != 0 {
                return Err(out_of_range());
            }
            Ok(v)
        }
        _ => {
            let v = value.as_i64().ok_or_else(out_of_range)?;
            if bits < 64 {
                let max = (1i64 << (bits - 1)) - 1;
                let min = -(1i64 << (bits - 1));
                if v < min || v > max {
                    return Err(out_of_range());
                }
            }
            Ok(v as u64)
        }
    }
}

/// Representation of a value in target memory
#[derive(Debug, Clone)]
pub enum Data {
    Primitive(Primitive),
    /// Pointer-sized integer (`isize` / `usize`)
    Word { signed: bool },
    /// Explicit filler bytes; alignment 0, so it never moves the cursor
    Padding(usize),
    Array { element: Box<Data>, count: usize },
    Pointer(Box<Data>),
    /// Struct or union, laid out through the cache
    Composite(Arc<Declaration>),
    /// Incomplete type; only usable behind a pointer
    Opaque(String),
}

impl Data {
    pub const U8: Self = Self::Primitive(Primitive::U8);
    pub const U16: Self = Self::Primitive(Primitive::U16);
    pub const U32: Self = Self::Primitive(Primitive::U32);
    pub const U64: Self = Self::Primitive(Primitive::U64);
    pub const I8: Self = Self::Primitive(Primitive::I8);
    pub const I16: Self = Self::Primitive(Primitive::I16);
    pub const I32: Self = Self::Primitive(Primitive::I32);
    pub const I64: Self = Self::Primitive(Primitive::I64);
    pub const F32: Self = Self::Primitive(Primitive::F32);
    pub const F64: Self = Self::Primitive(Primitive::F64);
    pub const BOOL: Self = Self::Primitive(Primitive::BOOL);
    pub const USIZE: Self = Self::Word { signed: false };
    pub const ISIZE: Self = Self::Word { signed: true };

    pub fn array(element: Data, count: usize) -> Self {
        Self::Array {
            element: Box::new(element),
            count,
        }
    }

    pub fn pointer(pointee: Data) -> Self {
        Self::Pointer(Box::new(pointee))
    }

    pub fn composite(declaration: &Arc<Declaration>) -> Self {
        Self::Composite(Arc::clone(declaration))
    }

    pub fn opaque(name: impl Into<String>) -> Self {
        Self::Opaque(name.into())
    }

    pub fn size(&self, cache: &LayoutCache, config: PlatformConfig) -> Result<usize> {
        match self {
            Self::Primitive(primitive) => Ok(primitive.width),
            Self::Word { .. } | Self::Pointer(_) => Ok(config.pointer_size()),
            Self::Padding(size) => Ok(*size),
            Self::Array { element, count } => element
                .size(cache, config)?
                .checked_mul(*count)
                .ok_or_else(|| Error::definition(self.to_string(), "array size overflows")),
            Self::Composite(declaration) => Ok(cache.reconstruct(declaration, config)?.size()),
            Self::Opaque(name) => Err(incomplete(name)),
        }
    }

    pub fn alignment(&self, cache: &LayoutCache, config: PlatformConfig) -> Result<usize> {
        match self {
            Self::Primitive(primitive) => Ok(primitive.width),
            Self::Word { .. } | Self::Pointer(_) => Ok(config.pointer_size()),
            Self::Padding(_) => Ok(0),
            Self::Array { element, .. } => element.alignment(cache, config),
            Self::Composite(declaration) => {
                Ok(cache.reconstruct(declaration, config)?.alignment())
            }
            Self::Opaque(name) => Err(incomplete(name)),
        }
    }

    pub fn read(
        &self,
        cache: &Arc<LayoutCache>,
        state: &Arc<dyn AbstractState>,
        address: u64,
        order: ByteOrder,
    ) -> Result<Value> {
        let config = state.config();
        match self {
            Self::Primitive(primitive) => {
                let bytes = read_exact(state.as_ref(), address, primitive.width)?;
                Ok(primitive.decode(&bytes, order))
            }
            Self::Word { signed } => {
                let width = config.pointer_size();
                let raw = order.read_uint(&read_exact(state.as_ref(), address, width)?);
                Ok(if *signed {
                    Value::Signed(sign_extend(raw, width))
                } else {
                    Value::Unsigned(raw)
                })
            }
            Self::Pointer(_) => {
                let width = config.pointer_size();
                let raw = order.read_uint(&read_exact(state.as_ref(), address, width)?);
                Ok(Value::Pointer(raw))
            }
            Self::Padding(size) => Ok(Value::Bytes(read_exact(state.as_ref(), address, *size)?)),
            Self::Array { element, count } => {
                let stride = element.size(cache, config)?;
                (0..*count)
                    .map(|index| {
                        let at = offset_address(address, stride * index)?;
                        element.read(cache, state, at, order)
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            Self::Composite(declaration) => {
                let layout = cache.reconstruct_for(declaration, state.as_ref())?;
                Instance::bind(
                    Arc::clone(cache),
                    layout,
                    Arc::clone(state),
                    address,
                    order,
                )
                .map(Value::Instance)
            }
            Self::Opaque(name) => Err(incomplete(name)),
        }
    }

    pub fn write(
        &self,
        cache: &Arc<LayoutCache>,
        state: &Arc<dyn AbstractState>,
        address: u64,
        value: &Value,
        order: ByteOrder,
    ) -> Result<()> {
        let config = state.config();
        match self {
            Self::Primitive(primitive) => {
                state.write_bytes(address, &primitive.encode(value, order)?)
            }
            Self::Word { signed } => {
                let kind = if *signed {
                    PrimitiveKind::Signed
                } else {
                    PrimitiveKind::Unsigned
                };
                let width = config.pointer_size();
                let raw = match value {
                    Value::Signed(_) | Value::Unsigned(_) => integer_bits(kind, width, value)?,
                    other => return Err(mismatch(self.to_string(), other)),
                };
                state.write_bytes(address, &order.write_uint(raw, width))
            }
            Self::Pointer(_) => {
                let width = config.pointer_size();
                let raw = match value {
                    Value::Pointer(address) => *address,
                    Value::Unsigned(_) => integer_bits(PrimitiveKind::Unsigned, width, value)?,
                    other => return Err(mismatch("pointer", other)),
                };
                if width < 8 && raw >> (width * 8) != 0 {
                    return Err(Error::ValueMismatch {
                        expected: format!("{}-byte address", width),
                        actual: format!("{:#x}", raw),
                    });
                }
                state.write_bytes(address, &order.write_uint(raw, width))
            }
            Self::Padding(size) => match value {
                Value::Bytes(bytes) if bytes.len() == *size => state.write_bytes(address, bytes),
                other => Err(mismatch(format!("{} bytes", size), other)),
            },
            Self::Array { element, count } => {
                let values = value
                    .as_array()
                    .filter(|values| values.len() == *count)
                    .ok_or_else(|| mismatch(format!("array of {}", count), value))?;
                let stride = element.size(cache, config)?;
                for (index, item) in values.iter().enumerate() {
                    let at = offset_address(address, stride * index)?;
                    element.write(cache, state, at, item, order)?;
                }
                Ok(())
            }
            // Composites are mutated through their own instance.
            Self::Composite(_) => Ok(()),
            Self::Opaque(name) => Err(incomplete(name)),
        }
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(primitive) => primitive.fmt(f),
            Self::Word { signed: true } => f.write_str("isize"),
            Self::Word { signed: false } => f.write_str("usize"),
            Self::Padding(size) => write!(f, "pad[{}]", size),
            Self::Array { element, count } => write!(f, "{}[{}]", element, count),
            Self::Pointer(pointee) => write!(f, "*{}", pointee),
            Self::Composite(declaration) => f.write_str(declaration.name()),
            Self::Opaque(name) => f.write_str(name),
        }
    }
}

fn incomplete(name: &str) -> Error {
    Error::definition(name, "incomplete type has no size or alignment")
}

pub(crate) fn offset_address(address: u64, offset: usize) -> Result<u64> {
    address
        .checked_add(offset as u64)
        .ok_or_else(|| Error::MemoryAccess {
            address,
            size: offset,
            message: "address overflow".to_string(),
        })
}

fn read_exact(state: &dyn AbstractState, address: u64, size: usize) -> Result<Vec<u8>> {
    trace!("read {} bytes at {:#x}", size, address);
    let bytes = state.read_bytes(address, size)?;
    if bytes.len() != size {
        return Err(Error::MemoryAccess {
            address,
            size,
            message: format!("short read of {} bytes", bytes.len()),
        });
    }
    Ok(bytes)
}
