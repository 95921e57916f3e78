//! Operation log store port.

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Result type for log store operations.
pub type LogStoreResult<T> = Result<T, LogStoreError>;

/// Destination for provisioning tool output.
pub type LogSink = Box<dyn Write + Send>;

/// Operation a log belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Plan output.
    Plan,
    /// Apply output.
    Apply,
}

impl OperationKind {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Apply => "apply",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persists the output of plan and apply operations.
pub trait LogStore: Send + Sync {
    /// Opens a writer for a new log, truncating any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError::Persistence`] when the log cannot be created.
    fn new_log_writer(&self, kind: OperationKind, id: Uuid) -> LogStoreResult<LogSink>;

    /// Opens a reader over a stored log.
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError::NotFound`] when no log exists.
    fn load_log(&self, kind: OperationKind, id: Uuid) -> LogStoreResult<Box<dyn Read + Send>>;

    /// Deletes a log. Deleting a missing log succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError::Persistence`] when removal fails.
    fn delete_log(&self, kind: OperationKind, id: Uuid) -> LogStoreResult<()>;
}

/// Errors returned by log store implementations.
#[derive(Debug, Clone, Error)]
pub enum LogStoreError {
    /// No log exists for the operation.
    #[error("{kind} log not found: {id}")]
    NotFound {
        /// Operation kind.
        kind: OperationKind,
        /// Operation identifier.
        id: Uuid,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LogStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
