//! Error types for task domain validation and parsing.

use super::{TaskKind, TaskState};
use thiserror::Error;

/// Errors returned while mutating task records.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The state machine does not allow the requested move.
    #[error("{kind} {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Task family.
        kind: TaskKind,
        /// Task identifier.
        id: String,
        /// Current state.
        from: TaskState,
        /// Requested state.
        to: TaskState,
    },
}

/// Error returned while parsing task states from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task state: {0}")]
pub struct ParseTaskStateError(pub String);
