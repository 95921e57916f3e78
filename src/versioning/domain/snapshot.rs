//! Read-only view of a commit.

use super::{CommitId, Dataset};
use std::sync::Arc;

/// Immutable dataset as of one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    commit: CommitId,
    data: Arc<Dataset>,
}

impl Snapshot {
    /// Creates a snapshot for a commit and its data.
    #[must_use]
    pub const fn new(commit: CommitId, data: Arc<Dataset>) -> Self {
        Self { commit, data }
    }

    /// Returns the commit the snapshot was taken at.
    #[must_use]
    pub const fn commit(&self) -> &CommitId {
        &self.commit
    }

    /// Returns the dataset.
    #[must_use]
    pub fn data(&self) -> &Dataset {
        &self.data
    }
}
