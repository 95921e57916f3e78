//! Errors returned by task orchestration services.

use crate::changeset::domain::{ChangesetDomainError, ComponentId};
use crate::task::{
    domain::{TaskDomainError, TaskKind},
    ports::{ExecutorError, LogStoreError, PlanStoreError},
};
use crate::versioning::{domain::RecordError, ports::VersionedStoreError};
use std::time::Duration;
use thiserror::Error;

/// Result type for orchestration services.
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

/// Errors returned by plan, apply, merge, rebase and removal services.
///
/// [`OrchestrationError::is_user_error`] separates invalid requests from
/// failures of the system serving them.
#[derive(Debug, Clone, Error)]
pub enum OrchestrationError {
    /// No changeset carries the requested name or identifier.
    #[error("changeset not found: {0}")]
    ChangesetNotFound(String),

    /// The component does not exist on the changeset branch.
    #[error("component not found: {0}")]
    ComponentNotFound(ComponentId),

    /// The task does not exist.
    #[error("{kind} not found: {id}")]
    TaskNotFound {
        /// Task family.
        kind: TaskKind,
        /// Requested identifier.
        id: String,
    },

    /// Merged changesets cannot be deleted.
    #[error("changeset '{0}' is merged and cannot be deleted")]
    MergedChangeset(String),

    /// Changeset validation failed.
    #[error(transparent)]
    Changeset(#[from] ChangesetDomainError),

    /// Task state machine rejected a transition.
    #[error(transparent)]
    Task(#[from] TaskDomainError),

    /// Versioned store operation failed.
    #[error(transparent)]
    Store(#[from] VersionedStoreError),

    /// Typed record access failed.
    #[error(transparent)]
    Repository(#[from] RecordError),

    /// The provisioning executor failed.
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// The plan artifact store failed.
    #[error(transparent)]
    PlanStore(#[from] PlanStoreError),

    /// The log store failed.
    #[error(transparent)]
    LogStore(#[from] LogStoreError),

    /// A fetched record carries a different identifier than requested.
    #[error("{kind} identity mismatch: requested {requested}, fetched {fetched}")]
    IdentityMismatch {
        /// Task family.
        kind: TaskKind,
        /// Requested identifier.
        requested: String,
        /// Identifier found in the record.
        fetched: String,
    },

    /// The task ran past its deadline.
    #[error("task exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),

    /// Marking the task failed also failed.
    #[error("{original}; recording the failure also failed: {compensation}")]
    Compensation {
        /// Error that interrupted the task.
        original: Box<OrchestrationError>,
        /// Error raised while marking the task failed.
        compensation: Box<OrchestrationError>,
    },

    /// The worker pools were already started.
    #[error("workers already started")]
    AlreadyStarted,
}

impl OrchestrationError {
    /// Returns `true` when the request itself was invalid, as opposed to a
    /// failure of the system serving it.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ChangesetNotFound(_)
                | Self::ComponentNotFound(_)
                | Self::TaskNotFound { .. }
                | Self::MergedChangeset(_)
                | Self::Changeset(_)
                | Self::Task(_)
                | Self::AlreadyStarted
                | Self::Store(VersionedStoreError::Conflict { .. })
        )
    }

    pub(crate) fn not_found(kind: TaskKind, id: impl ToString) -> Self {
        Self::TaskNotFound {
            kind,
            id: id.to_string(),
        }
    }
}
