//! Common imports for working with compute graphs.
//!
//! ```rust,ignore
//! use kiln_ir::prelude::*;
//! ```

pub use crate::attr::AttrValue;
pub use crate::format::Format;
pub use crate::graph::{ComputeGraph, InAnchor, NodeId, OutAnchor};
pub use crate::op::{OpDesc, OpPattern, op_types};
pub use crate::shape::{Dims, ShapeRange, UNKNOWN_DIM, UNKNOWN_RANK};
pub use crate::tensor::TensorDesc;

pub use kiln_dtype::DType;
