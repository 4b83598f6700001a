//! Pass entry point.

use kiln_ir::ComputeGraph;

use crate::capability::KernelCapability;
use crate::context::PassContext;
use crate::error::Result;
use crate::insertion::TransNodeInsertion;
use crate::merging::merge_all_trans_ops;

/// Counters of one pass run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub edges_examined: usize,
    pub edges_unchanged: usize,
    pub nodes_inserted: usize,
    pub nodes_merged: usize,
}

/// Insert conversion nodes on every selected edge, then merge inverse pairs
/// when enabled.
///
/// On error the graph must be discarded: edges converted before the failing
/// one keep their new nodes.
#[tracing::instrument(skip_all, fields(graph = graph.name()))]
pub fn run_trans_node_pass(
    graph: &mut ComputeGraph,
    ctx: &PassContext,
    capability: &dyn KernelCapability,
) -> Result<PassReport> {
    let insertion = TransNodeInsertion::new(ctx, capability).run(graph)?;
    let nodes_merged = if ctx.config.merge_trans_ops { merge_all_trans_ops(graph)? } else { 0 };

    let report = PassReport {
        edges_examined: insertion.edges_examined,
        edges_unchanged: insertion.edges_unchanged,
        nodes_inserted: insertion.nodes_inserted,
        nodes_merged,
    };
    tracing::debug!(?report, "conversion pass finished");
    Ok(report)
}
