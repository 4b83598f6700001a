use kiln_dtype::DType;
use kiln_ir::shape;
use kiln_ir::{AttrValue, Format, NodeId, OpDesc, TensorDesc, op::op_types};
use snafu::{OptionExt, ensure};

use super::{Generator, Step, expansion_target};
use crate::error::*;
use crate::strategy::TransformKind;
use crate::transfer_info::TransferInfo;

/// Change the rank or dims of the current tensor without moving data.
///
/// The target shape is a runtime operand: input 1 is fed by an auxiliary
/// `Const` node holding it as int32 values.
pub(super) fn add(generator: &mut Generator<'_>, info: TransferInfo) -> Result<Step> {
    let Some(target) = expansion_target(&info) else { return Ok(Step::Unchanged(info)) };
    let current = &info.src.tensor;
    if target.shape == current.shape {
        return Ok(Step::Unchanged(info));
    }
    if shape::static_element_count(&target.shape) != shape::static_element_count(&current.shape) {
        tracing::trace!(from = %current, to = ?target.shape.as_slice(), "element counts differ, no reshape");
        return Ok(Step::Unchanged(info));
    }

    let values = shape_values(&target.shape, &info)?;
    let output = TensorDesc { shape: target.shape.clone(), shape_range: target.range, ..current.clone() };
    let shape_input = TensorDesc::new(Format::Nd, DType::Int32, &[target.shape.len() as i64]);
    let mut op = generator.unary_node(TransformKind::Reshape, &info, output).with_input(shape_input);
    op.mark_const_input(1);

    match generator.splice(info, op, false)? {
        Step::Spliced(info) => {
            attach_shape_const(generator, info.src_anchor.node, values)?;
            Ok(Step::Spliced(info))
        }
        unchanged => Ok(unchanged),
    }
}

/// The target shape as the int32 operand the kernel reads.
fn shape_values(target: &[i64], info: &TransferInfo) -> Result<Vec<i32>> {
    target
        .iter()
        .map(|&dim| {
            i32::try_from(dim).ok().context(ShapeOutOfRangeSnafu { consumer: info.dst.op_name.clone(), dim })
        })
        .collect()
}

fn attach_shape_const(generator: &mut Generator<'_>, reshape: NodeId, values: Vec<i32>) -> Result<()> {
    let desc = generator.graph.op_desc(reshape)?;
    let inputs = desc.inputs.len();
    if inputs < 2 {
        tracing::error!(node = %desc.name, inputs, "reshape lost its shape input");
    }
    ensure!(inputs >= 2, MissingShapeInputSnafu { node: desc.name.clone(), inputs });

    let constant = OpDesc::new(format!("trans_Const_{}", generator.ctx.names.next()), op_types::CONST)
        .with_output(TensorDesc::new(Format::Nd, DType::Int32, &[values.len() as i64]))
        .with_attr("value", AttrValue::Int32Tensor(values));

    let constant = generator.graph.add_node(constant);
    let src = generator.graph.out_anchor(constant, 0)?;
    let dst = generator.graph.in_anchor(reshape, 1)?;
    generator.graph.add_edge(src, dst)?;
    Ok(())
}
