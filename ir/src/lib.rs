//! Graph IR consumed and mutated by the kiln conversion passes.
//!
//! # Module Organization
//!
//! - [`format`] - Hardware layout tags and their axis letters
//! - [`shape`] - Dimension vectors with dynamic (`-1`) and unknown-rank (`-2`) markers
//! - [`tensor`] - Tensor descriptors (format, dtype, shape, provenance)
//! - [`attr`] - Operator attribute values
//! - [`op`] - Operator descriptors
//! - [`graph`] - Arena-backed compute graph with anchors and control edges
//! - [`error`] - Error types and result handling

pub mod attr;
pub mod error;
pub mod format;
pub mod graph;
pub mod op;
pub mod prelude;
pub mod shape;
pub mod tensor;


pub use attr::AttrValue;
pub use error::{Error, Result};
pub use format::Format;
pub use graph::{ComputeGraph, InAnchor, NodeId, OutAnchor};
pub use op::{OpDesc, OpPattern};
pub use shape::{Dims, ShapeRange, UNKNOWN_DIM, UNKNOWN_RANK};
pub use tensor::TensorDesc;

pub use kiln_dtype::DType;
