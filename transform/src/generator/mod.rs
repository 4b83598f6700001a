//! Conversion-node generators.
//!
//! Each [`TransformKind`] has a generator that decides whether its node is
//! needed on the current edge, builds the node's descriptors and attributes,
//! and splices it in. The edge record is moved in and handed back through
//! [`Step`], advanced to the new node's output when something was inserted,
//! so the next generator of a strategy continues from there.

mod cast;
mod reformat;
mod reshape;
mod squeeze;
mod transdata;
mod transdata_rnn;
mod transpose;
mod unsqueeze;

use kiln_ir::shape::{self, Dims, ShapeRange};
use kiln_ir::{ComputeGraph, Format, OpDesc, TensorDesc};

use crate::axis;
use crate::capability::{KernelCapability, Support};
use crate::context::PassContext;
use crate::error::*;
use crate::strategy::TransformKind;
use crate::transfer_info::TransferInfo;

pub(crate) use squeeze::squeeze_axes;

/// Outcome of one generator call.
#[derive(Debug, Clone)]
pub enum Step {
    /// A node was inserted; the record now starts at its output.
    Spliced(TransferInfo),
    /// Nothing to do for this kind, or the capability store rejected the node.
    Unchanged(TransferInfo),
}

impl Step {
    pub fn info(&self) -> &TransferInfo {
        match self {
            Self::Spliced(info) | Self::Unchanged(info) => info,
        }
    }

    pub fn into_info(self) -> TransferInfo {
        match self {
            Self::Spliced(info) | Self::Unchanged(info) => info,
        }
    }

    pub fn is_spliced(&self) -> bool {
        matches!(self, Self::Spliced(_))
    }
}

/// Run the generator for `kind` on the edge described by `info`.
#[tracing::instrument(
    level = "trace",
    skip_all,
    fields(kind = %kind, edge.src = %info.src_anchor, edge.dst = %info.dst_anchor)
)]
pub fn add_trans_node(
    kind: TransformKind,
    graph: &mut ComputeGraph,
    ctx: &PassContext,
    capability: &dyn KernelCapability,
    info: TransferInfo,
) -> Result<Step> {
    let mut generator = Generator { graph, ctx, capability };
    match kind {
        TransformKind::Cast => cast::add(&mut generator, info),
        TransformKind::Reshape => reshape::add(&mut generator, info),
        TransformKind::Transpose => transpose::add(&mut generator, info),
        TransformKind::Reformat => reformat::add(&mut generator, info),
        TransformKind::SqueezeV2 => squeeze::add(&mut generator, info),
        TransformKind::UnsqueezeV2 => unsqueeze::add(&mut generator, info),
        TransformKind::TransData => transdata::add(&mut generator, info),
        TransformKind::TransDataRnn => transdata_rnn::add(&mut generator, info),
        TransformKind::Forbidden => ForbiddenStrategySnafu {
            strategy: info.strategy_id,
            src: info.src.tensor.format,
            dst: info.dst.tensor.format,
        }
        .fail(),
    }
}

/// Shared state of one generator call.
pub(crate) struct Generator<'a> {
    graph: &'a mut ComputeGraph,
    ctx: &'a PassContext,
    capability: &'a dyn KernelCapability,
}

impl Generator<'_> {
    /// Fresh descriptor named `trans_<OpType>_<id>`.
    fn create_node(&self, kind: TransformKind) -> OpDesc {
        let op_type = kind.op_type();
        OpDesc::new(format!("trans_{op_type}_{}", self.ctx.names.next()), op_type)
    }

    /// Node reading the current edge tensor and producing `output`.
    fn unary_node(&self, kind: TransformKind, info: &TransferInfo, mut output: TensorDesc) -> OpDesc {
        let mut input = info.src.tensor.clone();
        set_tensor_desc_info(info, &mut input);
        set_tensor_desc_info(info, &mut output);
        self.create_node(kind).with_input(input).with_output(output)
    }

    /// Insert `op` on the edge unless the capability store rejects it.
    fn splice(&mut self, mut info: TransferInfo, op: OpDesc, check_accuracy: bool) -> Result<Step> {
        if let Support::Unsupported { reason } = self.capability.check_supported(&op) {
            tracing::warn!(node = %op.name, op_type = %op.op_type, %reason, "conversion node unsupported, skipped");
            info.capability_rejected = true;
            return Ok(Step::Unchanged(info));
        }
        if check_accuracy
            && self.ctx.config.accuracy_check
            && let Support::Unsupported { reason } = self.capability.check_accuracy_supported(&op, true)
        {
            tracing::warn!(
                node = %op.name,
                op_type = %op.op_type,
                %reason,
                "conversion node fails accuracy check, skipped"
            );
            info.capability_rejected = true;
            return Ok(Step::Unchanged(info));
        }

        tracing::debug!(
            node = %op.name,
            op_type = %op.op_type,
            input = %info.src.tensor,
            output = ?op.outputs.first().map(ToString::to_string),
            "insert conversion node"
        );
        let node = self.graph.add_node(op);
        self.graph.insert_between(info.src_anchor, info.dst_anchor, node)?;
        Ok(Step::Spliced(info.advance(self.graph, node)?))
    }
}

/// Copy origin provenance from the edge's real source tensor onto `desc`.
///
/// Constants and variables carry no meaningful provenance; their edges keep
/// whatever `desc` already holds.
pub fn set_tensor_desc_info(info: &TransferInfo, desc: &mut TensorDesc) {
    if info.origin_is_const {
        return;
    }
    desc.origin_format = info.origin.origin_format;
    desc.origin_shape = info.origin.origin_shape.clone();
    desc.origin_name = info.origin.origin_name.clone();
}

/// Format a `Transpose`/`TransData` step converts into: the strategy's hop
/// format until it has been reached, the destination format afterwards.
pub(crate) fn hop_target(info: &TransferInfo) -> Format {
    match info.hop_format {
        Some(hop) if info.src.tensor.format != hop => hop,
        _ => info.dst.tensor.format,
    }
}

/// Sub-format of a tensor converted into `target`.
fn sub_format_for(info: &TransferInfo, target: Format, otherwise: u32) -> u32 {
    if target == info.dst.tensor.format { info.dst.tensor.sub_format } else { otherwise }
}

/// Range of `desc`, or the static range of its shape when none is tracked.
fn range_of(desc: &TensorDesc) -> ShapeRange {
    if desc.shape_range.len() == desc.rank() { desc.shape_range.clone() } else { shape::static_range(&desc.shape) }
}

/// Shape the next layout step expects on the current edge.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExpansionTarget {
    pub format: Format,
    pub shape: Dims,
    pub range: ShapeRange,
}

/// Target shared by `Reshape` and `UnsqueezeV2`.
///
/// Towards a plain destination (or within one format) the destination shape
/// is the target. Towards a hardware format, the current shape is expanded to
/// the full rank of the plain format the layout step starts from: the current
/// format when identifiable, for `ND` the destination's expansion format.
pub(crate) fn expansion_target(info: &TransferInfo) -> Option<ExpansionTarget> {
    let (src, dst) = (&info.src.tensor, &info.dst.tensor);
    if src.is_unknown_rank() || dst.is_unknown_rank() {
        return None;
    }
    if src.format == dst.format || dst.format.is_plain() {
        return Some(ExpansionTarget { format: dst.format, shape: dst.shape.clone(), range: range_of(dst) });
    }

    let plain = match src.format {
        format if format.is_identifiable() => format,
        Format::Nd => dst.format.expansion_format()?,
        _ => return None,
    };
    let full_rank = plain.axes()?.len();
    if src.rank() >= full_rank {
        return None;
    }

    let reshape_type = reshape_type_hint(info);
    let shape =
        axis::expand_dimension(&src.shape, &info.dst.op_type, src.format, plain, info.dst_anchor.index, reshape_type);
    if shape.len() != full_rank {
        return None;
    }
    let range = if src.shape_range.len() == src.rank() {
        axis::expand_shape_range(&src.shape_range, src.format, plain, reshape_type)
    } else {
        shape::static_range(&shape)
    };
    Some(ExpansionTarget { format: plain, shape, range })
}

/// Reshape type of the current tensor, else the one the consumer declares.
fn reshape_type_hint(info: &TransferInfo) -> &str {
    if info.src.tensor.reshape_type.is_empty() { &info.dst.tensor.reshape_type } else { &info.src.tensor.reshape_type }
}
