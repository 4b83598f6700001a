//! Element types for tensors flowing through the kiln backend.
//!
//! The numeric discriminants follow the backend's wire values so that a `DType`
//! can be carried in attributes and compared with values coming from kernel
//! descriptors without a translation table.


/// Tensor element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::EnumString, strum::EnumIter, strum::VariantArray, strum::FromRepr)]
#[cfg_attr(any(test, feature = "proptest"), derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum DType {
    #[strum(serialize = "DT_FLOAT")]
    Float32 = 0,
    #[strum(serialize = "DT_FLOAT16")]
    Float16 = 1,
    #[strum(serialize = "DT_INT8")]
    Int8 = 2,
    #[strum(serialize = "DT_INT32")]
    Int32 = 3,
    #[strum(serialize = "DT_UINT8")]
    UInt8 = 4,
    #[strum(serialize = "DT_INT16")]
    Int16 = 6,
    #[strum(serialize = "DT_UINT16")]
    UInt16 = 7,
    #[strum(serialize = "DT_UINT32")]
    UInt32 = 8,
    #[strum(serialize = "DT_INT64")]
    Int64 = 9,
    #[strum(serialize = "DT_UINT64")]
    UInt64 = 10,
    #[strum(serialize = "DT_DOUBLE")]
    Float64 = 11,
    #[strum(serialize = "DT_BOOL")]
    Bool = 12,
    #[strum(serialize = "DT_BF16")]
    BFloat16 = 27,
}

impl DType {
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 | Self::Float16 | Self::BFloat16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::BFloat16 | Self::Float32 | Self::Float64)
    }

    /// Whether converting `self` into `other` can lose information.
    ///
    /// Narrowing float casts and any float-to-integer cast are lossy, widening
    /// within a family is not. The two 16-bit floats lose range or precision
    /// in either direction.
    pub const fn is_lossy_cast_to(&self, other: &DType) -> bool {
        if self.is_float() && other.is_float() {
            let half_pair = matches!((self, other), (Self::Float16, Self::BFloat16) | (Self::BFloat16, Self::Float16));
            return other.bytes() < self.bytes() || half_pair;
        }
        if self.is_float() {
            return !other.is_float();
        }
        if self.is_int() && other.is_int() {
            return other.bytes() < self.bytes() || (self.is_signed() && other.is_unsigned());
        }
        if self.is_int() && other.is_float() {
            return other.bytes() <= self.bytes();
        }
        false
    }
}
