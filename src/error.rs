//! Error types for structural misuse of the history tree.
//!
//! Only wiring bugs are reported as errors (duplicate ids, attaching a node
//! twice, type-confused stack lookups). Expected empty conditions — nothing
//! to undo, an absent id, a detached context — are reported as `false`,
//! `None` or `0` by the operations themselves and never as errors.

use thiserror::Error;

/// A structural misuse of the history tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// A child with the same id already exists in the target group.
    #[error("duplicate child id `{0}`")]
    DuplicateChildId(String),

    /// The node is already attached to another group (the tree is a tree,
    /// not a DAG).
    #[error("node `{0}` already has a parent group")]
    AlreadyAttached(String),

    /// Node ids must be non-empty (they form focus paths).
    #[error("node id must not be empty")]
    EmptyId,

    /// A stack with this id exists but owns a different context type.
    #[error("stack `{0}` has a different context type")]
    ContextTypeMismatch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            HistoryError::DuplicateChildId("mesh".into()).to_string(),
            "duplicate child id `mesh`"
        );
        assert_eq!(
            HistoryError::AlreadyAttached("params".into()).to_string(),
            "node `params` already has a parent group"
        );
        assert_eq!(
            HistoryError::EmptyId.to_string(),
            "node id must not be empty"
        );
        assert_eq!(
            HistoryError::ContextTypeMismatch("params".into()).to_string(),
            "stack `params` has a different context type"
        );
    }
}
