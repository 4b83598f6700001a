use kiln_ir::shape::{self, Dims, ShapeRange};
use kiln_ir::{Format, TensorDesc};

use super::{Generator, Step, hop_target, range_of, sub_format_for};
use crate::error::*;
use crate::strategy::TransformKind;
use crate::transfer_info::TransferInfo;

/// Repack data between a plain layout and a hardware layout.
pub(super) fn add(generator: &mut Generator<'_>, info: TransferInfo) -> Result<Step> {
    let current = &info.src.tensor;
    let target = hop_target(&info);
    let sub_format = sub_format_for(&info, target, 0);
    if current.format == target && current.groups() == sub_format.max(1) {
        return Ok(Step::Unchanged(info));
    }

    let (shape, shape_range) = output_shape(&info, target)?;
    let groups = current.groups().max(sub_format);
    let output = TensorDesc { format: target, sub_format, shape, shape_range, ..current.clone() };

    let mut op = generator.unary_node(TransformKind::TransData, &info, output);
    op.set_attr("src_format", current.format.to_string());
    op.set_attr("dst_format", target.to_string());
    if groups > 1 {
        op.set_attr("groups", i64::from(groups));
    }
    generator.splice(info, op, false)
}

/// Output dims of a layout transform into `target`, first rule that applies:
///
/// 1. unknown rank passes through
/// 2. back to the tensor's origin format: the origin shape
/// 3. into the destination format: the destination shape
/// 4. into `ND` or another plain format: the origin shape, permuted by axis letters
fn output_shape(info: &TransferInfo, target: Format) -> Result<(Dims, ShapeRange)> {
    let (current, dst) = (&info.src.tensor, &info.dst.tensor);
    if current.is_unknown_rank() {
        return Ok((current.shape.clone(), current.shape_range.clone()));
    }
    if target == current.origin_format {
        return Ok((current.origin_shape.clone(), shape::static_range(&current.origin_shape)));
    }
    if target == dst.format {
        return Ok((dst.shape.clone(), range_of(dst)));
    }
    if target == Format::Nd {
        return Ok((current.origin_shape.clone(), shape::static_range(&current.origin_shape)));
    }
    if let Some(dims) = permute_letters(current.origin_format, target, &current.origin_shape) {
        let range = shape::static_range(&dims);
        return Ok((dims, range));
    }
    NoShapeRuleSnafu { consumer: info.dst.op_name.clone(), src: current.format, target }.fail()
}

/// Reorder `dims` from `from`'s axis letters into `to`'s.
fn permute_letters(from: Format, to: Format, dims: &[i64]) -> Option<Dims> {
    let to_axes = to.axes()?;
    if from.axes()?.len() != dims.len() || to_axes.len() != dims.len() {
        return None;
    }
    let perm: Option<Vec<usize>> = to_axes.chars().map(|letter| from.axis_index(letter)).collect();
    shape::permute(dims, &perm?)
}
