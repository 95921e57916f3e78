//! Error types for versioned storage values and records.

use thiserror::Error;

/// Errors returned while constructing versioning domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VersioningDomainError {
    /// The branch name is empty after trimming.
    #[error("branch name must not be empty")]
    EmptyBranchName,

    /// The branch name exceeds the 100-character storage limit.
    #[error("branch name exceeds 100 character limit: {0}")]
    BranchNameTooLong(String),

    /// The branch name contains characters or sequences that are not allowed.
    #[error(
        "invalid branch name '{0}' (allowed: letters, digits, '.', '_', '-', '/'; no '..', no leading '-' or '/')"
    )]
    InvalidBranchName(String),
}

/// Result type for typed record access.
pub type RecordResult<T> = Result<T, RecordError>;

/// Errors returned while reading or writing typed records in a dataset.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    /// A row with the same key already exists.
    #[error("duplicate {table} row: {key}")]
    Duplicate {
        /// Table name.
        table: &'static str,
        /// Row key.
        key: String,
    },

    /// No row exists for the key.
    #[error("{table} row not found: {key}")]
    NotFound {
        /// Table name.
        table: &'static str,
        /// Row key.
        key: String,
    },

    /// The row could not be converted to or from the record type.
    #[error("{table} row {key} could not be encoded or decoded: {message}")]
    Codec {
        /// Table name.
        table: &'static str,
        /// Row key.
        key: String,
        /// Serializer diagnostic.
        message: String,
    },
}

/// Paths of the row fields changed differently on both sides of a merge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("conflicting changes at {}", .0.join(", "))]
pub struct MergeConflicts(pub Vec<String>);

impl MergeConflicts {
    /// Returns the conflicting `table/key.field` paths.
    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.0
    }
}
