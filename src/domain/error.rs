//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::arena::NodeId;

/// Domain errors represent violations of the tree contract.
/// These are independent of configuration and host concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node no longer in tree: {0}")]
    StaleNode(NodeId),

    #[error("cycle detected in ancestor chain of: {0}")]
    CycleDetected(NodeId),

    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("invalid tree description: {message}")]
    InvalidTree { message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
