use crate::error::{Error, Result};
use crate::instance::Instance;

/// A value read from, or about to be written to, backing memory
#[derive(Debug, Clone)]
pub enum Value {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Bool(bool),
    /// Raw address held by a pointer field
    Pointer(u64),
    /// Uninterpreted bytes (padding)
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    /// Live view of a nested struct or union
    Instance(Instance),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Signed(_) => "signed integer",
            Self::Unsigned(_) => "unsigned integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Pointer(_) => "pointer",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
            Self::Instance(_) => "instance",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Signed(v) => Some(v),
            Self::Unsigned(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Unsigned(v) | Self::Pointer(v) => Some(v),
            Self::Signed(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<u64> {
        match *self {
            Self::Pointer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Unwrap a nested instance, failing with a value mismatch otherwise
    pub fn into_instance(self) -> Result<Instance> {
        match self {
            Self::Instance(instance) => Ok(instance),
            other => Err(Error::ValueMismatch {
                expected: "instance".to_string(),
                actual: other.kind_name().to_string(),
            }),
        }
    }
}

macro_rules! impl_from {
    ($variant:ident, $target:ty: $($source:ty),*) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Self::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

impl_from!(Signed, i64: i8, i16, i32, i64);
impl_from!(Unsigned, u64: u8, u16, u32, u64);
impl_from!(Float, f64: f32, f64);
impl_from!(Bool, bool: bool);

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Self::Array(values)
    }
}
