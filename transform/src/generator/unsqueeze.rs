use kiln_ir::{Dims, Format, TensorDesc};

use super::{Generator, Step, expansion_target, reshape_type_hint};
use crate::axis;
use crate::error::Result;
use crate::strategy::TransformKind;
use crate::transfer_info::TransferInfo;

/// Insert size-1 axes to bring the current shape up to the expansion target.
///
/// `axis` lists the target format's letters that the current reshape type
/// does not name.
pub(super) fn add(generator: &mut Generator<'_>, info: TransferInfo) -> Result<Step> {
    let current = &info.src.tensor;
    let Some(target) = expansion_target(&info) else { return Ok(Step::Unchanged(info)) };
    if target.shape.len() <= current.rank() {
        return Ok(Step::Unchanged(info));
    }
    let gap = target.shape.len() - current.rank();
    if gap > generator.ctx.config.squeeze_rank_gap || !current.format.is_identifiable() {
        return Ok(Step::Unchanged(info));
    }

    let Some(letters) = target.format.expansion_format().and_then(Format::axes) else {
        return Ok(Step::Unchanged(info));
    };
    let Some(reshape_type) =
        axis::resolve_reshape_type(current.format, target.format, current.rank(), reshape_type_hint(&info))
    else {
        return Ok(Step::Unchanged(info));
    };
    let axis: Vec<i64> = letters
        .chars()
        .enumerate()
        .filter(|(_, letter)| !reshape_type.contains(*letter))
        .map(|(i, _)| i as i64)
        .collect();
    if axis.len() != gap || insert_ones(&current.shape, &axis) != target.shape {
        return Ok(Step::Unchanged(info));
    }

    let output = TensorDesc { shape: target.shape, shape_range: target.range, ..current.clone() };
    let op = generator.unary_node(TransformKind::UnsqueezeV2, &info, output).with_attr("axis", axis);
    generator.splice(info, op, false)
}

fn insert_ones(dims: &[i64], axis: &[i64]) -> Dims {
    let mut values = dims.iter().copied();
    (0..dims.len() + axis.len())
        .map(|pos| if axis.contains(&(pos as i64)) { 1 } else { values.next().unwrap_or(1) })
        .collect()
}
