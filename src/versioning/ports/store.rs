//! Store port for branch-scoped transactions and branch operations.

use crate::versioning::domain::{BranchName, CommitId, Dataset, MergeConflicts, Snapshot};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for versioned store operations.
pub type VersionedStoreResult<T> = Result<T, VersionedStoreError>;

/// Branch-versioned transactional store.
///
/// Writes to one branch are serialized: [`VersionedStore::begin`] waits until
/// no other transaction, merge, rebase or deletion holds the branch.
#[async_trait]
pub trait VersionedStore: Send + Sync {
    /// Opens a write transaction on the tip of `branch`.
    ///
    /// Dropping the transaction without committing leaves the branch
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`VersionedStoreError::BranchNotFound`] when the branch does
    /// not exist.
    async fn begin(&self, branch: &BranchName) -> VersionedStoreResult<Box<dyn WriteTransaction>>;

    /// Returns a read-only snapshot of the tip of `branch`.
    async fn checkout(&self, branch: &BranchName) -> VersionedStoreResult<Snapshot>;

    /// Returns a read-only snapshot of a historical commit.
    async fn checkout_commit(&self, commit: &CommitId) -> VersionedStoreResult<Snapshot>;

    /// Returns the nearest common ancestor of two branch tips.
    async fn merge_base(
        &self,
        left: &BranchName,
        right: &BranchName,
    ) -> VersionedStoreResult<CommitId>;

    /// Returns the commit at the tip of `branch`.
    async fn branch_head(&self, branch: &BranchName) -> VersionedStoreResult<CommitId>;

    /// Merges `from` into `into`, recording a merge commit on `into`.
    ///
    /// The merge only proceeds while the tip of `from` is still `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionedStoreError::BranchMoved`] when `from` no longer
    /// points at `expected`, and [`VersionedStoreError::Conflict`] when both
    /// sides changed the same value differently. `into` is left unchanged in
    /// both cases.
    async fn merge_branch(
        &self,
        into: &BranchName,
        from: &BranchName,
        expected: &CommitId,
        message: &str,
    ) -> VersionedStoreResult<CommitId>;

    /// Replays the commits unique to `branch` onto the tip of `onto` and
    /// advances `branch` to the result.
    ///
    /// # Errors
    ///
    /// Returns [`VersionedStoreError::Conflict`] when a replayed commit
    /// conflicts; `branch` is left unchanged.
    async fn rebase_branch(
        &self,
        branch: &BranchName,
        onto: &BranchName,
    ) -> VersionedStoreResult<CommitId>;

    /// Creates `name` pointing at the tip of `from`.
    async fn create_branch(&self, name: &BranchName, from: &BranchName) -> VersionedStoreResult<()>;

    /// Deletes a branch. Commits stay reachable by identifier.
    async fn delete_branch(&self, name: &BranchName) -> VersionedStoreResult<()>;

    /// Returns whether a branch exists.
    async fn branch_exists(&self, name: &BranchName) -> VersionedStoreResult<bool>;

    /// Returns `true` when the tip of `branch` descends from `commit` with at
    /// least one additional commit.
    async fn has_commits_after(
        &self,
        branch: &BranchName,
        commit: &CommitId,
    ) -> VersionedStoreResult<bool>;
}

/// Open write transaction on one branch.
///
/// The transaction holds the branch exclusively until it is committed or
/// dropped.
#[async_trait]
pub trait WriteTransaction: Send {
    /// Branch the transaction writes to.
    fn branch(&self) -> &BranchName;

    /// Branch tip when the transaction was opened.
    fn head(&self) -> &CommitId;

    /// Working dataset.
    fn data(&self) -> &Dataset;

    /// Mutable working dataset.
    fn data_mut(&mut self) -> &mut Dataset;

    /// Commits the working dataset with `message`.
    ///
    /// Returns the new tip, or the unchanged head when nothing was modified.
    async fn commit(self: Box<Self>, message: &str) -> VersionedStoreResult<CommitId>;
}

/// Errors returned by versioned store implementations.
#[derive(Debug, Clone, Error)]
pub enum VersionedStoreError {
    /// The branch does not exist.
    #[error("branch not found: {0}")]
    BranchNotFound(BranchName),

    /// A branch with the same name already exists.
    #[error("branch already exists: {0}")]
    BranchExists(BranchName),

    /// The commit does not exist.
    #[error("commit not found: {0}")]
    CommitNotFound(CommitId),

    /// The two branches share no history.
    #[error("branches {left} and {right} have no common ancestor")]
    NoCommonAncestor {
        /// First branch.
        left: BranchName,
        /// Second branch.
        right: BranchName,
    },

    /// The branch tip differs from the commit the caller validated.
    #[error("branch {branch} moved from {expected} to {actual}")]
    BranchMoved {
        /// Branch that moved.
        branch: BranchName,
        /// Tip the caller expected.
        expected: CommitId,
        /// Tip found.
        actual: CommitId,
    },

    /// A merge or rebase hit conflicting changes.
    #[error("cannot combine {from} with {onto}: {conflicts}")]
    Conflict {
        /// Branch whose changes were being applied.
        from: BranchName,
        /// Branch the changes were applied onto.
        onto: BranchName,
        /// Conflicting paths.
        conflicts: MergeConflicts,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl VersionedStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
