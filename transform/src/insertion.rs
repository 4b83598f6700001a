//! Conversion-node insertion.
//!
//! Every selected data edge goes through a small state machine:
//!
//! ```text
//! NotExamined -> StrategyResolved -> TokensRemaining -> Spliced
//!       \______________\__________________\____________> Failed
//! ```
//!
//! An edge whose two ends already agree finishes right after `NotExamined`.
//! Failure is reported per edge: the nodes inserted for a failed edge are
//! removed and the original edge restored before the error is returned.

use kiln_ir::op::op_types;
use kiln_ir::shape;
use kiln_ir::{ComputeGraph, InAnchor, NodeId, OutAnchor};
use smallvec::SmallVec;
use snafu::ResultExt;

use crate::capability::KernelCapability;
use crate::config::InsertionPolicy;
use crate::context::PassContext;
use crate::error::*;
use crate::generator::add_trans_node;
use crate::strategy::{Lookup, TransformKind};
use crate::transfer_info::TransferInfo;

type Tokens = SmallVec<[TransformKind; 6]>;

/// Generic conversion order for format pairs the strategy table lacks,
/// used from a lower to a higher rank. The opposite direction runs it backwards.
const CONSECUTIVE_ORDER: [TransformKind; 5] = [
    TransformKind::Reshape,
    TransformKind::Transpose,
    TransformKind::Cast,
    TransformKind::TransData,
    TransformKind::TransDataRnn,
];

/// Progress of one edge through insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum EdgeState {
    NotExamined,
    StrategyResolved,
    TokensRemaining,
    Spliced,
    Failed,
}

/// Result of converting one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Both ends already agreed; nothing was inserted.
    Unchanged,
    /// The strategy ran; `inserted` counts every node added, auxiliary constants included.
    Converted { inserted: usize },
}

/// Counters of one insertion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertionReport {
    pub edges_examined: usize,
    pub edges_unchanged: usize,
    pub nodes_inserted: usize,
}

/// Strategy-driven insertion over a graph.
pub struct TransNodeInsertion<'a> {
    ctx: &'a PassContext,
    capability: &'a dyn KernelCapability,
}

impl<'a> TransNodeInsertion<'a> {
    pub fn new(ctx: &'a PassContext, capability: &'a dyn KernelCapability) -> Self {
        Self { ctx, capability }
    }

    /// Convert every edge the configured policy selects.
    ///
    /// Edges are snapshotted up front, in topological order of their consumers,
    /// so nodes inserted along the way are never revisited.
    #[tracing::instrument(skip_all, fields(graph = graph.name(), policy = %self.ctx.config.policy))]
    pub fn run(&self, graph: &mut ComputeGraph) -> Result<InsertionReport> {
        let edges = self.select_edges(graph)?;
        let mut report = InsertionReport::default();

        for (src, dst) in edges {
            report.edges_examined += 1;
            match self.insert_for_edge(graph, src, dst)? {
                EdgeOutcome::Unchanged => report.edges_unchanged += 1,
                EdgeOutcome::Converted { inserted } => report.nodes_inserted += inserted,
            }
        }

        tracing::debug!(
            edges = report.edges_examined,
            unchanged = report.edges_unchanged,
            inserted = report.nodes_inserted,
            "insertion finished"
        );
        Ok(report)
    }

    /// Make the edge `src -> dst` consistent.
    pub fn insert_for_edge(&self, graph: &mut ComputeGraph, src: OutAnchor, dst: InAnchor) -> Result<EdgeOutcome> {
        let mut info = TransferInfo::resolve(graph, src, dst)?;
        tracing::trace!(
            state = %EdgeState::NotExamined,
            edge.src = %info.src.tensor,
            edge.dst = %info.dst.tensor,
            "examine edge"
        );
        if info.is_consistent() {
            return Ok(EdgeOutcome::Unchanged);
        }

        let (src_format, dst_format) = (info.src.tensor.format, info.dst.tensor.format);
        info.strategy_id = self.ctx.strategies.compute_strategy_id(src_format, dst_format, &info);
        info.hop_format = self.ctx.strategies.hop_format(info.strategy_id);
        tracing::debug!(
            state = %EdgeState::StrategyResolved,
            src_op = %info.src.op_name,
            dst_op = %info.dst.op_name,
            strategy = %info.strategy_id,
            hop = ?info.hop_format,
            "strategy resolved"
        );

        let failed = EdgeFailedSnafu {
            src_op: info.src.op_name.clone(),
            dst_op: info.dst.op_name.clone(),
            src_format,
            dst_format,
            strategy: info.strategy_id,
        };
        let watermark = graph.watermark();

        let result = self.resolve_tokens(&info).and_then(|tokens| self.run_tokens(graph, info, &tokens));
        match result {
            Ok(()) => {
                let inserted = graph.node_ids().filter(|id| *id >= watermark).count();
                tracing::debug!(state = %EdgeState::Spliced, inserted, "edge converted");
                Ok(EdgeOutcome::Converted { inserted })
            }
            Err(source) => {
                tracing::warn!(state = %EdgeState::Failed, error = %source, "edge conversion failed, rolling back");
                rollback(graph, watermark, src, dst);
                Err(source).context(failed)
            }
        }
    }

    fn resolve_tokens(&self, info: &TransferInfo) -> Result<Tokens> {
        let (src, dst) = (&info.src.tensor, &info.dst.tensor);
        match self.ctx.strategies.lookup(info.strategy_id) {
            Lookup::Tokens(tokens) => Ok(Tokens::from_slice(tokens)),
            Lookup::Forbidden => {
                ForbiddenStrategySnafu { strategy: info.strategy_id, src: src.format, dst: dst.format }.fail()
            }
            Lookup::Missing if self.ctx.config.consecutive_principle => {
                let mut tokens = Tokens::from_slice(&CONSECUTIVE_ORDER);
                let upward = src.is_unknown_rank() || dst.is_unknown_rank() || src.rank() <= dst.rank();
                if !upward {
                    tokens.reverse();
                }
                tracing::debug!(strategy = %info.strategy_id, upward, "no strategy, using consecutive order");
                Ok(tokens)
            }
            Lookup::Missing => {
                MissingStrategySnafu { strategy: info.strategy_id, src: src.format, dst: dst.format }.fail()
            }
        }
    }

    fn run_tokens(&self, graph: &mut ComputeGraph, mut info: TransferInfo, tokens: &[TransformKind]) -> Result<()> {
        for (done, &kind) in tokens.iter().enumerate() {
            let remaining = tokens.len() - done;
            tracing::trace!(state = %EdgeState::TokensRemaining, %kind, remaining, "run generator");
            info = add_trans_node(kind, graph, self.ctx, self.capability, info)?.into_info();
        }
        if info.is_consistent() {
            return Ok(());
        }
        if info.capability_rejected || info.layout_matches() {
            tracing::debug!(
                current = %info.src.tensor,
                expected = %info.dst.tensor,
                strategy = %info.strategy_id,
                rejected = info.capability_rejected,
                "edge still differs after its strategy"
            );
            return Ok(());
        }
        UnresolvedLayoutSnafu { current: info.src.tensor.to_string(), expected: info.dst.tensor.to_string() }.fail()
    }

    fn select_edges(&self, graph: &mut ComputeGraph) -> Result<Vec<(OutAnchor, InAnchor)>> {
        let mut edges = Vec::new();
        for node in graph.topological_order()? {
            for (index, producer) in graph.in_peers(node)?.into_iter().enumerate() {
                if let Some(src) = producer {
                    edges.push((src, InAnchor { node, index }));
                }
            }
        }

        match self.ctx.config.policy {
            InsertionPolicy::PerEdge => Ok(edges),
            InsertionPolicy::BoundaryOnly => {
                let mut selected = Vec::new();
                for (src, dst) in edges {
                    let from_data = graph.op_desc(src.node)?.op_type == op_types::DATA;
                    let into_output = graph.op_desc(dst.node)?.op_type == op_types::NET_OUTPUT;
                    if into_output {
                        restore_origin(graph, src, dst)?;
                    }
                    if from_data || into_output {
                        selected.push((src, dst));
                    }
                }
                Ok(selected)
            }
        }
    }
}

/// Make a graph output expect its producer's tensor in the producer's original layout.
fn restore_origin(graph: &mut ComputeGraph, src: OutAnchor, dst: InAnchor) -> Result<()> {
    let produced = graph.output_tensor(src)?.clone();
    if let Some(input) = graph.op_desc_mut(dst.node)?.inputs.get_mut(dst.index) {
        input.format = produced.origin_format;
        input.sub_format = 0;
        input.shape_range = shape::static_range(&produced.origin_shape);
        input.shape = produced.origin_shape;
    }
    Ok(())
}

/// Remove everything added since `watermark` and reconnect `src -> dst`.
fn rollback(graph: &mut ComputeGraph, watermark: NodeId, src: OutAnchor, dst: InAnchor) {
    let added: Vec<NodeId> = graph.node_ids().filter(|id| *id >= watermark).collect();
    for node in added {
        if let Err(error) = graph.remove_node(node) {
            tracing::error!(%node, %error, "rollback could not remove node");
        }
    }
    if graph.peer_out(dst).is_none()
        && let Err(error) = graph.add_edge(src, dst)
    {
        tracing::error!(%src, %dst, %error, "rollback could not restore edge");
    }
}
