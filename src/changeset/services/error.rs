//! Service-level errors for changeset and component use cases.

use crate::changeset::domain::{ChangesetDomainError, ComponentId};
use crate::versioning::{domain::RecordError, ports::VersionedStoreError};
use thiserror::Error;

/// Errors returned by changeset and component services.
#[derive(Debug, Clone, Error)]
pub enum ChangesetServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] ChangesetDomainError),

    /// No changeset carries the requested name.
    #[error("changeset not found: {0}")]
    NotFound(String),

    /// A changeset with the requested name already exists.
    #[error("changeset already exists: {0}")]
    Duplicate(String),

    /// The requested name belongs to a reserved branch.
    #[error("changeset name '{0}' is reserved")]
    ReservedName(String),

    /// The component does not exist on the changeset branch.
    #[error("component not found: {0}")]
    ComponentNotFound(ComponentId),

    /// A component with the requested name already exists on the branch.
    #[error("component already exists: {0}")]
    DuplicateComponent(String),

    /// Versioned store operation failed.
    #[error(transparent)]
    Store(#[from] VersionedStoreError),

    /// Typed record access failed.
    #[error(transparent)]
    Repository(#[from] RecordError),
}

impl ChangesetServiceError {
    /// Returns `true` when the request itself was invalid, as opposed to a
    /// failure of the system serving it.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Domain(_)
                | Self::NotFound(_)
                | Self::Duplicate(_)
                | Self::ReservedName(_)
                | Self::ComponentNotFound(_)
                | Self::DuplicateComponent(_)
        )
    }
}

/// Result type for changeset and component services.
pub type ChangesetServiceResult<T> = Result<T, ChangesetServiceError>;
