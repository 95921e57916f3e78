//! Error types for changeset domain validation and parsing.

use super::{ChangesetState, ReviewState};
use crate::versioning::domain::VersioningDomainError;
use thiserror::Error;

/// Errors returned while constructing or mutating changesets and components.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChangesetDomainError {
    /// The changeset name is not a valid branch name.
    #[error("invalid changeset name: {0}")]
    InvalidChangesetName(#[from] VersioningDomainError),

    /// The component name is empty after trimming.
    #[error("component name must not be empty")]
    EmptyComponentName,

    /// The component name contains characters outside `[a-z0-9_-]`.
    #[error(
        "component name '{0}' contains invalid characters (only lowercase alphanumeric, '-' and '_' allowed)"
    )]
    InvalidComponentName(String),

    /// The module source is empty after trimming.
    #[error("module source must not be empty")]
    EmptyModuleSource,

    /// The changeset no longer accepts changes.
    #[error("changeset '{name}' is {state} and cannot be changed")]
    ChangesetNotOpen {
        /// Changeset name.
        name: String,
        /// Current lifecycle state.
        state: ChangesetState,
    },

    /// A review state change is not allowed.
    #[error("cannot move changeset review from {from} to {to}")]
    InvalidReviewTransition {
        /// Current review state.
        from: ReviewState,
        /// Requested review state.
        to: ReviewState,
    },
}

/// Error returned while parsing changeset states.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown changeset state: {0}")]
pub struct ParseChangesetStateError(pub String);

/// Error returned while parsing review states.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown review state: {0}")]
pub struct ParseReviewStateError(pub String);
