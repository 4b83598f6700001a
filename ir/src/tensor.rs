//! Tensor descriptors attached to operator ports.

use std::fmt;

use itertools::Itertools;

use crate::format::Format;
use crate::shape::{self, Dims, ShapeRange};
use kiln_dtype::DType;

/// Layout, element type and shape of one operator input or output.
///
/// The `origin_*` fields record the tensor as authored, before any hardware
/// repacking: a `NC1HWC0` activation usually carries `origin_format = NCHW` and
/// the 4-D shape it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDesc {
    pub name: String,
    pub format: Format,
    /// Format refinement: group count for grouped convolution weights, `0` when unused.
    pub sub_format: u32,
    pub dtype: DType,
    pub shape: Dims,
    pub shape_range: ShapeRange,
    pub origin_format: Format,
    pub origin_shape: Dims,
    pub origin_name: Option<String>,
    /// Axis letters naming which axes a reduced-rank shape occupies (e.g. `"C"`).
    pub reshape_type: String,
}

impl TensorDesc {
    /// Descriptor whose origin is itself.
    pub fn new(format: Format, dtype: DType, shape: &[i64]) -> Self {
        let shape = Dims::from_slice(shape);
        Self {
            name: String::new(),
            format,
            sub_format: 0,
            dtype,
            shape_range: shape::static_range(&shape),
            origin_format: format,
            origin_shape: shape.clone(),
            origin_name: None,
            reshape_type: String::new(),
            shape,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_sub_format(mut self, sub_format: u32) -> Self {
        self.sub_format = sub_format;
        self
    }

    pub fn with_origin(mut self, format: Format, shape: &[i64]) -> Self {
        self.origin_format = format;
        self.origin_shape = Dims::from_slice(shape);
        self
    }

    pub fn with_shape_range(mut self, range: &[(i64, i64)]) -> Self {
        self.shape_range = ShapeRange::from_slice(range);
        self
    }

    pub fn with_reshape_type(mut self, reshape_type: impl Into<String>) -> Self {
        self.reshape_type = reshape_type.into();
        self
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn is_unknown_rank(&self) -> bool {
        shape::is_unknown_rank(&self.shape)
    }

    /// Group count encoded in the sub-format (1 when unused).
    pub fn groups(&self) -> u32 {
        self.sub_format.max(1)
    }

    /// Edge-consistency relation: format, sub-format, dtype and shape agree.
    ///
    /// Names, provenance and ranges are not compared.
    pub fn same_layout(&self, other: &TensorDesc) -> bool {
        self.format == other.format
            && self.groups() == other.groups()
            && self.dtype == other.dtype
            && self.shape == other.shape
    }
}

impl fmt::Display for TensorDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format)?;
        if self.sub_format > 1 {
            write!(f, "(g={})", self.sub_format)?;
        }
        write!(f, "[{}] {}", self.shape.iter().join(","), self.dtype)
    }
}
