use snafu::Snafu;

use crate::graph::{InAnchor, NodeId, OutAnchor};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Port direction, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Handle does not refer to a live node.
    #[snafu(display("node {node} is not part of the graph"))]
    NodeNotFound { node: NodeId },

    /// Port index beyond the node's declared ports.
    #[snafu(display("{direction} port {index} out of range on node {node} ({len} ports)"))]
    PortOutOfRange { node: NodeId, index: usize, len: usize, direction: Direction },

    /// Input ports accept a single producer.
    #[snafu(display("input {anchor} is already linked to {existing}"))]
    InputAlreadyLinked { anchor: InAnchor, existing: OutAnchor },

    /// No data edge between the two anchors.
    #[snafu(display("no edge {src} -> {dst}"))]
    EdgeNotFound { src: OutAnchor, dst: InAnchor },

    /// Topological ordering failed.
    #[snafu(display("graph contains a cycle ({visited} of {total} nodes ordered)"))]
    CycleDetected { visited: usize, total: usize },

    /// Malformed dimension vector.
    #[snafu(display("invalid shape {dims:?}: {reason}"))]
    InvalidShape { dims: Vec<i64>, reason: &'static str },
}
