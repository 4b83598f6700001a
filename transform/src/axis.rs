//! Axis-letter mapping between reduced-rank shapes and full-rank formats.
//!
//! A rank-`r` tensor headed into a 4-D or 5-D layout is first expanded to the
//! full rank of that layout's plain axis order (its expansion format). The
//! reshape type names, left to right, which axis letter each existing
//! dimension occupies; every other axis becomes `1`.
//!
//! `[-2]` (unknown rank) passes through every function here untouched. `-1`
//! dimensions are placed like any other value.
//!
//! Everything in this module is pure.

use itertools::Itertools;
use kiln_ir::shape::{self, Dims, ShapeRange};
use kiln_ir::Format;
use smallvec::{SmallVec, smallvec};

/// Position of `letter` in `format`'s expansion axis order.
///
/// # Examples
///
/// ```rust
/// # use kiln_ir::Format;
/// # use kiln_transform::axis::axis_index_by_format;
/// assert_eq!(axis_index_by_format(Format::Nc1hwc0, 'C'), Some(1));
/// assert_eq!(axis_index_by_format(Format::Nhwc, 'C'), Some(3));
/// assert_eq!(axis_index_by_format(Format::Nd, 'C'), None);
/// ```
pub fn axis_index_by_format(format: Format, letter: char) -> Option<usize> {
    format.expansion_format()?.axis_index(letter)
}

/// Reshape type assumed when a tensor carries none.
///
/// Identifiable formats use their trailing `rank` letters. `ND` only expands as
/// a channel vector (`"C"`) or a batch-by-channel matrix (`"NC"`).
pub fn default_reshape_type(original: Format, rank: usize) -> Option<String> {
    if original == Format::Nd {
        return match rank {
            1 => Some("C".to_string()),
            2 => Some("NC".to_string()),
            _ => None,
        };
    }
    let axes = original.axes()?;
    axes.len().checked_sub(rank).map(|skip| axes[skip..].to_string())
}

/// The reshape type to expand a rank-`rank` tensor of `original` format into
/// `final_format`'s axis order.
///
/// `given` is used when it has one distinct letter per dimension and every
/// letter exists in the target axes; otherwise the default is tried under the
/// same rule.
pub fn resolve_reshape_type(original: Format, final_format: Format, rank: usize, given: &str) -> Option<String> {
    let axes = final_format.expansion_format()?.axes()?;
    let fits = |reshape_type: &str| {
        reshape_type.len() == rank
            && reshape_type.chars().all(|c| axes.contains(c))
            && reshape_type.chars().all_unique()
    };

    if !given.is_empty() && fits(given) {
        return Some(given.to_string());
    }
    default_reshape_type(original, rank).filter(|reshape_type| fits(reshape_type))
}

/// Expand `dims` to the full rank of `final_format`'s expansion axes.
///
/// Unchanged when the shape already has full rank, has unknown rank, or when
/// no expansion axes or reshape type can be resolved.
pub fn expand_dimension(
    dims: &[i64],
    op_type: &str,
    original: Format,
    final_format: Format,
    tensor_index: usize,
    reshape_type: &str,
) -> Dims {
    if shape::is_unknown_rank(dims) {
        return Dims::from_slice(dims);
    }
    match placement(dims, 1, original, final_format, reshape_type) {
        Some(expanded) => {
            tracing::trace!(
                op_type,
                tensor_index,
                from = ?dims,
                to = ?expanded.as_slice(),
                format = %final_format,
                "expand dimension"
            );
            expanded
        }
        None => Dims::from_slice(dims),
    }
}

/// Expand a shape range in lockstep with [`expand_dimension`]; new axes get `(1, 1)`.
pub fn expand_shape_range(
    range: &[(i64, i64)],
    original: Format,
    final_format: Format,
    reshape_type: &str,
) -> ShapeRange {
    placement(range, (1, 1), original, final_format, reshape_type).unwrap_or_else(|| ShapeRange::from_slice(range))
}

/// Inverse of [`expand_dimension`]: pick the axes named by `reshape_type`
/// out of a full-rank shape.
pub fn squeeze_dimension(dims: &[i64], original: Format, final_format: Format, reshape_type: &str) -> Dims {
    let unchanged = || Dims::from_slice(dims);
    if shape::is_unknown_rank(dims) || reshape_type.is_empty() {
        return unchanged();
    }
    let Some(axes) = final_format.expansion_format().and_then(Format::axes) else { return unchanged() };
    if dims.len() != axes.len() {
        return unchanged();
    }
    let Some(reshape_type) = resolve_reshape_type(original, final_format, reshape_type.len(), reshape_type) else {
        return unchanged();
    };
    reshape_type.chars().filter_map(|letter| axes.find(letter)).map(|pos| dims[pos]).collect()
}

fn placement<T: Copy>(
    values: &[T],
    fill: T,
    original: Format,
    final_format: Format,
    reshape_type: &str,
) -> Option<SmallVec<[T; 4]>> {
    let axes = final_format.expansion_format()?.axes()?;
    if values.len() >= axes.len() {
        return None;
    }
    let reshape_type = resolve_reshape_type(original, final_format, values.len(), reshape_type)?;

    let mut out: SmallVec<[T; 4]> = smallvec![fill; axes.len()];
    for (letter, value) in reshape_type.chars().zip(values) {
        let pos = axes.find(letter)?;
        out[pos] = *value;
    }
    Some(out)
}
