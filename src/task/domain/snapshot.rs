//! Branch position captured when a task is requested.

use crate::versioning::domain::CommitId;
use serde::{Deserialize, Serialize};

/// Merge-base with main and changeset head at decision time.
///
/// Stored on plans, merges and rebases and compared against the live branch
/// when the task runs to detect concurrent movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSnapshot {
    merge_base: CommitId,
    head: CommitId,
}

impl BranchSnapshot {
    /// Creates a snapshot.
    #[must_use]
    pub const fn new(merge_base: CommitId, head: CommitId) -> Self {
        Self { merge_base, head }
    }

    /// Nearest common ancestor of main and the changeset.
    #[must_use]
    pub const fn merge_base(&self) -> &CommitId {
        &self.merge_base
    }

    /// Changeset branch tip.
    #[must_use]
    pub const fn head(&self) -> &CommitId {
        &self.head
    }
}
