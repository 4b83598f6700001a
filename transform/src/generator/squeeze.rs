use kiln_ir::TensorDesc;

use super::{Generator, Step, range_of};
use crate::error::Result;
use crate::strategy::TransformKind;
use crate::transfer_info::TransferInfo;

/// Drop size-1 axes so the current shape matches the lower-rank destination.
pub(super) fn add(generator: &mut Generator<'_>, info: TransferInfo) -> Result<Step> {
    let (current, dst) = (&info.src.tensor, &info.dst.tensor);
    if current.is_unknown_rank() || dst.is_unknown_rank() || current.rank() <= dst.rank() {
        return Ok(Step::Unchanged(info));
    }
    if current.rank() - dst.rank() > generator.ctx.config.squeeze_rank_gap || !dst.format.is_identifiable() {
        return Ok(Step::Unchanged(info));
    }
    let Some(axis) = squeeze_axes(&current.shape, &dst.shape) else { return Ok(Step::Unchanged(info)) };

    let output = TensorDesc { shape: dst.shape.clone(), shape_range: range_of(dst), ..current.clone() };
    let op = generator.unary_node(TransformKind::SqueezeV2, &info, output).with_attr("axis", axis);
    generator.splice(info, op, false)
}

/// Positions of `long` removed to obtain `short`.
///
/// Walks both lists: equal values advance both, a mismatch records the
/// position in `long` and advances only `long`. Only size-1 axes may be removed.
pub(crate) fn squeeze_axes(long: &[i64], short: &[i64]) -> Option<Vec<i64>> {
    let mut axes = Vec::new();
    let mut j = 0;
    for (i, &dim) in long.iter().enumerate() {
        if short.get(j) == Some(&dim) {
            j += 1;
        } else if dim == 1 {
            axes.push(i as i64);
        } else {
            return None;
        }
    }
    (j == short.len()).then_some(axes)
}
