use kiln_ir::TensorDesc;

use super::{Generator, Step};
use crate::error::Result;
use crate::strategy::TransformKind;
use crate::transfer_info::TransferInfo;

/// Element-type conversion; format and shape pass through.
pub(super) fn add(generator: &mut Generator<'_>, info: TransferInfo) -> Result<Step> {
    let (src_type, dst_type) = (info.src.tensor.dtype, info.dst.tensor.dtype);
    if src_type == dst_type {
        return Ok(Step::Unchanged(info));
    }
    if src_type.is_lossy_cast_to(&dst_type) {
        tracing::debug!(from = %src_type, to = %dst_type, edge = %info.dst_anchor, "lossy cast requested");
    }

    let output = TensorDesc { dtype: dst_type, ..info.src.tensor.clone() };
    let op = generator
        .unary_node(TransformKind::Cast, &info, output)
        .with_attr("dst_type", dst_type as i64)
        .with_attr("_need_compile", true);
    generator.splice(info, op, true)
}
