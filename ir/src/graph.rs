//! Arena-backed compute graph.
//!
//! Nodes live in a slot vector and are addressed by [`NodeId`] handles. Anchors
//! are plain relations `(node, port)`: every input port holds at most one
//! producer, every output port holds the list of its consumers. Control edges
//! are kept per node in both directions.
//!
//! Removing a node frees its slot; handles are never reused within one graph,
//! so a stale handle reports [`Error::NodeNotFound`] instead of aliasing a new node.

use std::collections::{BTreeSet, HashMap};

use smallvec::SmallVec;
use snafu::{OptionExt, ensure};
use tracing::trace;

use crate::error::*;
use crate::op::OpDesc;
use crate::tensor::TensorDesc;

/// Opaque node handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("%{_0}")]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Output port of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{node}:out{index}")]
pub struct OutAnchor {
    pub node: NodeId,
    pub index: usize,
}

/// Input port of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{node}:in{index}")]
pub struct InAnchor {
    pub node: NodeId,
    pub index: usize,
}

#[derive(Debug, Clone)]
struct Node {
    desc: OpDesc,
    inputs: SmallVec<[Option<OutAnchor>; 4]>,
    outputs: SmallVec<[SmallVec<[InAnchor; 2]>; 2]>,
    control_in: SmallVec<[NodeId; 2]>,
    control_out: SmallVec<[NodeId; 2]>,
}

/// Mutable computation graph.
///
/// Port counts are fixed when a node is added, from the number of input and
/// output descriptors on its [`OpDesc`].
#[derive(Debug, Clone, Default)]
pub struct ComputeGraph {
    name: String,
    slots: Vec<Option<Node>>,
    live: usize,
}

impl ComputeGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), slots: Vec::new(), live: 0 }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.live
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.slots.get(node.index()).is_some_and(Option::is_some)
    }

    /// Live node handles in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate().filter(|(_, slot)| slot.is_some()).map(|(idx, _)| NodeId(idx as u32))
    }

    /// Handle the next added node will receive. Every live node at or above a
    /// watermark was added after it was taken.
    pub fn watermark(&self) -> NodeId {
        NodeId(self.slots.len() as u32)
    }

    pub fn add_node(&mut self, desc: OpDesc) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        let inputs = SmallVec::from_elem(None, desc.inputs.len());
        let outputs = (0..desc.outputs.len()).map(|_| SmallVec::new()).collect();
        trace!(node = %id, name = %desc.name, op_type = %desc.op_type, "add node");
        let node = Node { desc, inputs, outputs, control_in: SmallVec::new(), control_out: SmallVec::new() };
        self.slots.push(Some(node));
        self.live += 1;
        id
    }

    /// Remove a node and every data/control edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<OpDesc> {
        let node = self.slots.get_mut(id.index()).and_then(Option::take).context(NodeNotFoundSnafu { node: id })?;

        for (index, producer) in node.inputs.iter().enumerate() {
            if let Some(src) = producer
                && let Some(src_node) = self.node_mut(src.node)
            {
                src_node.outputs[src.index].retain(|dst| *dst != InAnchor { node: id, index });
            }
        }
        for consumers in &node.outputs {
            for dst in consumers {
                if let Some(dst_node) = self.node_mut(dst.node) {
                    dst_node.inputs[dst.index] = None;
                }
            }
        }
        for pred in &node.control_in {
            if let Some(pred_node) = self.node_mut(*pred) {
                pred_node.control_out.retain(|succ| *succ != id);
            }
        }
        for succ in &node.control_out {
            if let Some(succ_node) = self.node_mut(*succ) {
                succ_node.control_in.retain(|pred| *pred != id);
            }
        }

        self.live -= 1;
        trace!(node = %id, name = %node.desc.name, "remove node");
        Ok(node.desc)
    }

    pub fn op_desc(&self, id: NodeId) -> Result<&OpDesc> {
        self.node(id).map(|node| &node.desc).context(NodeNotFoundSnafu { node: id })
    }

    pub fn op_desc_mut(&mut self, id: NodeId) -> Result<&mut OpDesc> {
        self.node_mut(id).map(|node| &mut node.desc).context(NodeNotFoundSnafu { node: id })
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.node_ids().find(|id| self.node(*id).is_some_and(|node| node.desc.name == name))
    }

    /// Live nodes with the given operator type.
    pub fn nodes_of_type<'a>(&'a self, op_type: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.node_ids().filter(move |id| self.node(*id).is_some_and(|node| node.desc.op_type == op_type))
    }

    /// Validated output anchor.
    pub fn out_anchor(&self, node: NodeId, index: usize) -> Result<OutAnchor> {
        let len = self.node(node).context(NodeNotFoundSnafu { node })?.outputs.len();
        ensure!(index < len, PortOutOfRangeSnafu { node, index, len, direction: Direction::Output });
        Ok(OutAnchor { node, index })
    }

    /// Validated input anchor.
    pub fn in_anchor(&self, node: NodeId, index: usize) -> Result<InAnchor> {
        let len = self.node(node).context(NodeNotFoundSnafu { node })?.inputs.len();
        ensure!(index < len, PortOutOfRangeSnafu { node, index, len, direction: Direction::Input });
        Ok(InAnchor { node, index })
    }

    /// Tensor produced at `anchor`.
    pub fn output_tensor(&self, anchor: OutAnchor) -> Result<&TensorDesc> {
        let anchor = self.out_anchor(anchor.node, anchor.index)?;
        Ok(&self.op_desc(anchor.node)?.outputs[anchor.index])
    }

    /// Tensor expected at `anchor`.
    pub fn input_tensor(&self, anchor: InAnchor) -> Result<&TensorDesc> {
        let anchor = self.in_anchor(anchor.node, anchor.index)?;
        Ok(&self.op_desc(anchor.node)?.inputs[anchor.index])
    }

    pub fn add_edge(&mut self, src: OutAnchor, dst: InAnchor) -> Result<()> {
        self.out_anchor(src.node, src.index)?;
        self.in_anchor(dst.node, dst.index)?;
        if let Some(existing) = self.peer_out(dst) {
            return InputAlreadyLinkedSnafu { anchor: dst, existing }.fail();
        }

        self.expect_node_mut(dst.node)?.inputs[dst.index] = Some(src);
        self.expect_node_mut(src.node)?.outputs[src.index].push(dst);
        trace!(%src, %dst, "add edge");
        Ok(())
    }

    pub fn remove_edge(&mut self, src: OutAnchor, dst: InAnchor) -> Result<()> {
        ensure!(self.peer_out(dst) == Some(src), EdgeNotFoundSnafu { src, dst });

        self.expect_node_mut(dst.node)?.inputs[dst.index] = None;
        self.expect_node_mut(src.node)?.outputs[src.index].retain(|peer| *peer != dst);
        trace!(%src, %dst, "remove edge");
        Ok(())
    }

    /// Producer feeding `dst`, if connected.
    pub fn peer_out(&self, dst: InAnchor) -> Option<OutAnchor> {
        self.node(dst.node).and_then(|node| node.inputs.get(dst.index).copied().flatten())
    }

    /// Consumers of `src`; empty for unknown anchors.
    pub fn peers_in(&self, src: OutAnchor) -> &[InAnchor] {
        self.node(src.node).and_then(|node| node.outputs.get(src.index)).map(|peers| peers.as_slice()).unwrap_or(&[])
    }

    /// Producers of every input port of `node`, in port order.
    pub fn in_peers(&self, node: NodeId) -> Result<SmallVec<[Option<OutAnchor>; 4]>> {
        Ok(self.node(node).context(NodeNotFoundSnafu { node })?.inputs.clone())
    }

    /// Replace the edge `src -> dst` by `src -> node:in0` and `node:out0 -> dst`.
    pub fn insert_between(&mut self, src: OutAnchor, dst: InAnchor, node: NodeId) -> Result<()> {
        let node_in = self.in_anchor(node, 0)?;
        let node_out = self.out_anchor(node, 0)?;

        self.remove_edge(src, dst)?;
        self.add_edge(src, node_in)?;
        self.add_edge(node_out, dst)
    }

    /// Add a control dependency `src -> dst`. Duplicate edges are ignored.
    pub fn add_control_edge(&mut self, src: NodeId, dst: NodeId) -> Result<()> {
        ensure!(self.contains(dst), NodeNotFoundSnafu { node: dst });
        let src_node = self.expect_node_mut(src)?;
        if src_node.control_out.contains(&dst) {
            return Ok(());
        }
        src_node.control_out.push(dst);
        self.expect_node_mut(dst)?.control_in.push(src);
        Ok(())
    }

    pub fn remove_control_edge(&mut self, src: NodeId, dst: NodeId) -> Result<()> {
        self.expect_node_mut(src)?.control_out.retain(|succ| *succ != dst);
        self.expect_node_mut(dst)?.control_in.retain(|pred| *pred != src);
        Ok(())
    }

    pub fn control_inputs(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|node| node.control_in.as_slice()).unwrap_or(&[])
    }

    pub fn control_outputs(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|node| node.control_out.as_slice()).unwrap_or(&[])
    }

    /// Every data edge, ordered by producer.
    pub fn data_edges(&self) -> Vec<(OutAnchor, InAnchor)> {
        let mut edges = Vec::new();
        for (idx, slot) in self.slots.iter().enumerate() {
            let Some(node) = slot else { continue };
            for (port, consumers) in node.outputs.iter().enumerate() {
                let src = OutAnchor { node: NodeId(idx as u32), index: port };
                edges.extend(consumers.iter().map(|dst| (src, *dst)));
            }
        }
        edges
    }

    /// Kahn ordering over data and control edges; ties broken by handle.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        let mut in_degree: HashMap<NodeId, usize> = HashMap::with_capacity(self.live);
        for id in self.node_ids() {
            let node = &self.slots[id.index()];
            let degree = node.as_ref().map_or(0, |node| {
                node.inputs.iter().filter(|input| input.is_some()).count() + node.control_in.len()
            });
            in_degree.insert(id, degree);
        }

        let mut ready: BTreeSet<NodeId> = in_degree.iter().filter(|(_, deg)| **deg == 0).map(|(id, _)| *id).collect();
        let mut order = Vec::with_capacity(self.live);

        while let Some(id) = ready.pop_first() {
            order.push(id);
            let Some(node) = self.node(id) else { continue };
            let successors = node.outputs.iter().flatten().map(|dst| dst.node).chain(node.control_out.iter().copied());
            for succ in successors {
                if let Some(degree) = in_degree.get_mut(&succ) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(succ);
                    }
                }
            }
        }

        ensure!(order.len() == self.live, CycleDetectedSnafu { visited: order.len(), total: self.live });
        Ok(order)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn expect_node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.node_mut(id).context(NodeNotFoundSnafu { node: id })
    }
}
