use orbiter_domain::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    #[error("unknown node id: {0}")]
    UnknownNode(NodeId),

    /// Remaining node ids still part of a cycle once Kahn's algorithm gets
    /// stuck, sorted lexicographically for deterministic error messages.
    #[error("cycle detected among nodes: {}", .0.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(", "))]
    Cycle(Vec<NodeId>),
}
