use kiln_ir::TensorDesc;

use super::{Generator, Step, range_of};
use crate::error::Result;
use crate::strategy::TransformKind;
use crate::transfer_info::TransferInfo;

/// RNN cell attributes the layout transform needs to size its padding.
const RNN_ATTRS: [&str; 2] = ["input_size", "hidden_size"];

/// Layout transform into or out of the RNN fractal formats.
pub(super) fn add(generator: &mut Generator<'_>, info: TransferInfo) -> Result<Step> {
    let (current, dst) = (&info.src.tensor, &info.dst.tensor);
    if !(current.format.is_rnn() || dst.format.is_rnn()) || current.format == dst.format {
        return Ok(Step::Unchanged(info));
    }

    let output = TensorDesc {
        format: dst.format,
        sub_format: dst.sub_format,
        shape: dst.shape.clone(),
        shape_range: range_of(dst),
        ..current.clone()
    };
    let mut op = generator.unary_node(TransformKind::TransDataRnn, &info, output);
    op.set_attr("src_format", current.format.to_string());
    op.set_attr("dst_format", dst.format.to_string());

    // The RNN op sits on either end of the edge; prefer the consumer.
    let endpoints = [info.dst_anchor.node, info.origin_anchor.node];
    for name in RNN_ATTRS {
        for node in endpoints {
            if let Some(value) = generator.graph.op_desc(node)?.attr(name) {
                op.set_attr(name, value.clone());
                break;
            }
        }
    }
    generator.splice(info, op, false)
}
