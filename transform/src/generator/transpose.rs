use kiln_ir::shape;
use kiln_ir::TensorDesc;

use super::{Generator, Step, hop_target, sub_format_for};
use crate::error::Result;
use crate::strategy::TransformKind;
use crate::transfer_info::TransferInfo;

/// Reorder axes between two plain formats with named axes.
///
/// A pair of such formats missing from the transpose table still gets a node:
/// it relabels the format and keeps the shape, without a `perm` attribute.
/// Anything involving `ND` or a hardware format is left to the layout steps.
pub(super) fn add(generator: &mut Generator<'_>, info: TransferInfo) -> Result<Step> {
    let current = &info.src.tensor;
    let target = hop_target(&info);
    if current.format == target || !current.format.is_identifiable() || !target.is_identifiable() {
        return Ok(Step::Unchanged(info));
    }

    let mut output =
        TensorDesc { format: target, sub_format: sub_format_for(&info, target, current.sub_format), ..current.clone() };
    let perm = generator.ctx.transposes.perm(current.format, target).filter(|perm| {
        current.is_unknown_rank() || perm.len() == current.rank()
    });

    match perm {
        Some(perm) => {
            if let Some(dims) = shape::permute(current.shape.as_slice(), perm) {
                output.shape = dims;
            }
            if let Some(range) = shape::permute(current.shape_range.as_slice(), perm) {
                output.shape_range = range;
            }
        }
        None => tracing::warn!(
            src = %current.format,
            dst = %target,
            rank = current.rank(),
            "no transpose permutation, relabelling format only"
        ),
    }

    let perm: Option<Vec<i64>> = perm.map(|perm| perm.iter().map(|&axis| axis as i64).collect());
    let mut op = generator.unary_node(TransformKind::Transpose, &info, output);
    if let Some(perm) = perm {
        op.set_attr("perm", perm);
    }
    generator.splice(info, op, false)
}
