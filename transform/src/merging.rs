//! Removal of mutually inverse conversion pairs.
//!
//! A conversion node `A` whose only consumer `B` has the same op type and
//! exactly undoes it (`B.in0 ~ A.out0`, `B.out0 ~ A.in0`) is dropped together
//! with `B`; `A`'s producer then feeds `B`'s consumers directly. Pairs that
//! are adjacent but not exact inverses stay.

use std::collections::VecDeque;

use itertools::Itertools;
use kiln_ir::op::op_types;
use kiln_ir::{ComputeGraph, InAnchor, NodeId, OutAnchor};

use crate::error::Result;
use crate::strategy::TransformKind;

/// An inverse pair and the producer feeding its first node.
struct InversePair {
    first: NodeId,
    second: NodeId,
    producer: OutAnchor,
}

/// Remove every inverse conversion pair. Returns the number of removed nodes,
/// auxiliary constants included.
///
/// After a removal the producer is examined again, so chains collapse from
/// the inside out and a second call finds nothing left to do.
#[tracing::instrument(skip_all, fields(graph = graph.name()))]
pub fn merge_all_trans_ops(graph: &mut ComputeGraph) -> Result<usize> {
    let mut worklist: VecDeque<NodeId> = graph.topological_order()?.into();
    let mut removed = 0;

    while let Some(node) = worklist.pop_front() {
        let Some(pair) = inverse_pair(graph, node)? else { continue };
        let producer = pair.producer.node;
        removed += remove_pair(graph, pair)?;
        worklist.push_front(producer);
    }

    tracing::debug!(removed, "merged inverse conversions");
    Ok(removed)
}

fn inverse_pair(graph: &ComputeGraph, first: NodeId) -> Result<Option<InversePair>> {
    if !graph.contains(first) {
        return Ok(None);
    }
    let first_desc = graph.op_desc(first)?;
    if TransformKind::from_op_type(&first_desc.op_type).is_none() || first_desc.outputs.len() != 1 {
        return Ok(None);
    }
    let Some(producer) = graph.peer_out(InAnchor { node: first, index: 0 }) else { return Ok(None) };
    let &[consumer] = graph.peers_in(OutAnchor { node: first, index: 0 }) else { return Ok(None) };
    if consumer.index != 0 {
        return Ok(None);
    }

    let second = consumer.node;
    let second_desc = graph.op_desc(second)?;
    if second_desc.op_type != first_desc.op_type || second_desc.outputs.len() != 1 {
        return Ok(None);
    }

    let inverse = match (first_desc.input(0), first_desc.output(0), second_desc.input(0), second_desc.output(0)) {
        (Some(first_in), Some(first_out), Some(second_in), Some(second_out)) => {
            second_in.same_layout(first_out) && second_out.same_layout(first_in)
        }
        _ => false,
    };
    Ok(inverse.then_some(InversePair { first, second, producer }))
}

fn remove_pair(graph: &mut ComputeGraph, pair: InversePair) -> Result<usize> {
    let InversePair { first, second, producer } = pair;
    let in_pair = |node: &NodeId| *node == first || *node == second;

    let consumers = graph.peers_in(OutAnchor { node: second, index: 0 }).to_vec();
    let control_in: Vec<NodeId> = [first, second]
        .iter()
        .flat_map(|node| graph.control_inputs(*node))
        .copied()
        .filter(|node| !in_pair(node))
        .unique()
        .collect();
    let control_out: Vec<NodeId> = [first, second]
        .iter()
        .flat_map(|node| graph.control_outputs(*node))
        .copied()
        .filter(|node| !in_pair(node))
        .unique()
        .collect();

    // Shape constants of reshapes; dropped below once nothing reads them.
    let mut constants = Vec::new();
    for node in [first, second] {
        for src in graph.in_peers(node)?.into_iter().skip(1).flatten() {
            if graph.op_desc(src.node)?.op_type == op_types::CONST {
                constants.push(src.node);
            }
        }
    }

    graph.remove_node(first)?;
    graph.remove_node(second)?;
    let mut removed = 2;

    for dst in &consumers {
        graph.add_edge(producer, *dst)?;
        for &pred in control_in.iter().filter(|pred| **pred != dst.node) {
            graph.add_control_edge(pred, dst.node)?;
        }
    }
    for &succ in control_out.iter().filter(|succ| **succ != producer.node) {
        graph.add_control_edge(producer.node, succ)?;
    }

    for constant in constants {
        let unused = graph.peers_in(OutAnchor { node: constant, index: 0 }).is_empty()
            && graph.control_outputs(constant).is_empty();
        if graph.contains(constant) && unused {
            graph.remove_node(constant)?;
            removed += 1;
        }
    }

    tracing::debug!(%first, %second, %producer, consumers = consumers.len(), "removed inverse conversion pair");
    Ok(removed)
}
