//! Dimension vectors with dynamic-shape markers.
//!
//! Shapes are plain `i64` vectors:
//! - `-1` ([`UNKNOWN_DIM`]) marks a dimension whose extent is only known at run time
//! - `[-2]` ([`UNKNOWN_RANK`]) marks a tensor whose rank itself is unknown
//!
//! Shape ranges travel next to the dims as `(min, max)` pairs, one per dimension;
//! `max == -1` means unbounded.

use smallvec::{SmallVec, smallvec};
use snafu::ensure;

use crate::{Result, error::InvalidShapeSnafu};

/// Unknown extent of a single dimension.
pub const UNKNOWN_DIM: i64 = -1;

/// Sole element of a shape whose rank is unknown.
pub const UNKNOWN_RANK: i64 = -2;

/// Dimension vector. Inline capacity covers the common ranks without allocating.
pub type Dims = SmallVec<[i64; 4]>;

/// Per-dimension `(min, max)` bounds.
pub type ShapeRange = SmallVec<[(i64, i64); 4]>;

/// The canonical unknown-rank shape `[-2]`.
pub fn unknown_rank() -> Dims {
    smallvec![UNKNOWN_RANK]
}

/// Check whether the shape is the unknown-rank marker.
///
/// # Examples
///
/// ```rust
/// # use kiln_ir::shape::is_unknown_rank;
/// assert!(is_unknown_rank(&[-2]));
/// assert!(!is_unknown_rank(&[-1, 3]));
/// ```
pub fn is_unknown_rank(dims: &[i64]) -> bool {
    dims.contains(&UNKNOWN_RANK)
}

/// Any dimension unknown (including unknown rank).
pub fn is_dynamic(dims: &[i64]) -> bool {
    dims.iter().any(|&dim| dim < 0)
}

/// Number of elements, or `None` when any dimension is not static.
///
/// A rank-0 shape is a scalar with one element.
pub fn static_element_count(dims: &[i64]) -> Option<i64> {
    if is_dynamic(dims) {
        return None;
    }
    dims.iter().try_fold(1i64, |acc, &dim| acc.checked_mul(dim))
}

/// Validate a dimension vector.
///
/// # Errors
/// Returns error when a value is below `-2`, or when `-2` is not the only element.
pub fn validate_dims(dims: &[i64]) -> Result<()> {
    ensure!(
        dims.iter().all(|&dim| dim >= UNKNOWN_RANK),
        InvalidShapeSnafu { dims: dims.to_vec(), reason: "dimension below -2" }
    );
    ensure!(
        !is_unknown_rank(dims) || dims.len() == 1,
        InvalidShapeSnafu { dims: dims.to_vec(), reason: "-2 must be the only dimension" }
    );
    Ok(())
}

/// Fixed range for a static shape: every dimension bounded by itself.
///
/// Dynamic dimensions get `(1, -1)`.
pub fn static_range(dims: &[i64]) -> ShapeRange {
    if is_unknown_rank(dims) {
        return ShapeRange::new();
    }
    dims.iter().map(|&dim| if dim < 0 { (1, UNKNOWN_DIM) } else { (dim, dim) }).collect()
}

/// Reorder `dims` by `perm` (`out[i] = dims[perm[i]]`).
///
/// Returns `None` when the permutation does not match the rank.
pub fn permute<T: Copy>(dims: &[T], perm: &[usize]) -> Option<SmallVec<[T; 4]>> {
    if dims.len() != perm.len() {
        return None;
    }
    perm.iter().map(|&axis| dims.get(axis).copied()).collect()
}
