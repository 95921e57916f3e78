//! Domain model for branch-versioned storage.
//!
//! Rows are JSON documents grouped into named tables. Typed records map onto
//! rows through the [`Record`] trait so repositories never touch raw JSON.

mod dataset;
mod error;
mod ids;
mod snapshot;

pub use dataset::{Dataset, Record};
pub use error::{MergeConflicts, RecordError, RecordResult, VersioningDomainError};
pub use ids::{BranchName, CommitId};
pub use snapshot::Snapshot;
