//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::NodeId;

/// Domain errors represent violations of the tree invariants.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("no node with display ordinal {0}")]
    OrdinalNotFound(usize),

    #[error("cycle detected: {node} cannot be moved below its descendant {target}")]
    CycleDetected { node: NodeId, target: NodeId },

    #[error("duplicate node id in document: {0}")]
    DuplicateId(NodeId),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("unknown edit operation: {0}")]
    UnknownOperation(String),

    #[error("invalid duration for {node}: {value}")]
    InvalidDuration { node: NodeId, value: f64 },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
