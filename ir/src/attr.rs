//! Operator attribute values.

use crate::format::Format;
use kiln_dtype::DType;

/// Attribute payload stored on an [`OpDesc`](crate::OpDesc).
#[derive(Debug, Clone, PartialEq, Eq, derive_more::From)]
pub enum AttrValue {
    Int(i64),
    Bool(bool),
    Str(String),
    Ints(Vec<i64>),
    Format(Format),
    DType(DType),
    /// Constant payload of a `Const` node, as 32-bit integers.
    Int32Tensor(Vec<i32>),
}

impl AttrValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Self::Ints(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_int32_tensor(&self) -> Option<&[i32]> {
        match self {
            Self::Int32Tensor(values) => Some(values),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}
