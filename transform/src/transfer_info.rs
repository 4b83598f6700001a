//! Per-edge working record threaded through the generators.

use kiln_ir::shape;
use kiln_ir::{ComputeGraph, Format, InAnchor, NodeId, OpDesc, OpPattern, OutAnchor, TensorDesc};

use crate::strategy::StrategyId;

/// One side of an edge as seen from the conversion pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub op_name: String,
    pub op_type: String,
    pub pattern: OpPattern,
    pub tensor: TensorDesc,
}

impl Endpoint {
    fn of(op: &OpDesc, tensor: &TensorDesc) -> Self {
        Self { op_name: op.name.clone(), op_type: op.op_type.clone(), pattern: op.pattern, tensor: tensor.clone() }
    }
}

/// State of one edge under conversion.
///
/// `src` always describes the tensor currently feeding `dst_anchor`: after a
/// generator splices a node, the record is advanced to start at that node's
/// output. `origin` and `origin_anchor` stay the tensor and output of the
/// real source op.
#[derive(Debug, Clone)]
pub struct TransferInfo {
    pub src_anchor: OutAnchor,
    pub dst_anchor: InAnchor,
    pub src: Endpoint,
    pub dst: Endpoint,
    pub origin_anchor: OutAnchor,
    pub origin: TensorDesc,
    /// The real source op is a constant or variable.
    pub origin_is_const: bool,
    pub strategy_id: StrategyId,
    pub hop_format: Option<Format>,
    /// The capability store turned down a node meant for this edge.
    pub capability_rejected: bool,
}

impl TransferInfo {
    /// Read both ends of the data edge `src -> dst`.
    ///
    /// # Errors
    /// Fails when either end carries a malformed shape.
    pub fn resolve(graph: &ComputeGraph, src: OutAnchor, dst: InAnchor) -> kiln_ir::Result<Self> {
        let src_op = graph.op_desc(src.node)?;
        let dst_op = graph.op_desc(dst.node)?;
        let src_end = Endpoint::of(src_op, graph.output_tensor(src)?);
        let dst_end = Endpoint::of(dst_op, graph.input_tensor(dst)?);
        shape::validate_dims(&src_end.tensor.shape)?;
        shape::validate_dims(&dst_end.tensor.shape)?;

        Ok(Self {
            src_anchor: src,
            dst_anchor: dst,
            strategy_id: StrategyId::new(src_end.tensor.format, dst_end.tensor.format),
            hop_format: None,
            origin_anchor: src,
            origin: src_end.tensor.clone(),
            origin_is_const: src_op.is_constant(),
            src: src_end,
            dst: dst_end,
            capability_rejected: false,
        })
    }

    /// Source and destination already agree on format, sub-format, dtype and shape.
    pub fn is_consistent(&self) -> bool {
        self.src.tensor.same_layout(&self.dst.tensor)
    }

    /// Format, sub-format and dtype agree; only the dims may still differ.
    ///
    /// Shape rules can legitimately leave the consumer's declared dims behind
    /// (origin shapes, permuted shapes, unknown rank).
    pub fn layout_matches(&self) -> bool {
        let (src, dst) = (&self.src.tensor, &self.dst.tensor);
        src.format == dst.format && src.sub_format == dst.sub_format && src.dtype == dst.dtype
    }

    /// Move the edge start to output 0 of `node`.
    pub(crate) fn advance(mut self, graph: &ComputeGraph, node: NodeId) -> kiln_ir::Result<Self> {
        let anchor = graph.out_anchor(node, 0)?;
        let op = graph.op_desc(node)?;
        self.src = Endpoint::of(op, graph.output_tensor(anchor)?);
        self.src_anchor = anchor;
        Ok(self)
    }
}
