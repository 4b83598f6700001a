//! Conditions that refine a format pair into a more specific strategy.
//!
//! Predicates only read facts available before any node is inserted.

use kiln_ir::Format;

use crate::transfer_info::TransferInfo;

pub type Predicate = fn(&TransferInfo) -> bool;

/// The `FRACTAL_Z` side of the edge is a grouped-convolution weight.
pub fn fractal_z_grouped(info: &TransferInfo) -> bool {
    [&info.src.tensor, &info.dst.tensor].into_iter().any(|t| t.format == Format::FractalZ && t.sub_format > 1)
}
