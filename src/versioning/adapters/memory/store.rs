//! In-memory versioned store.

use super::graph::CommitGraph;
use crate::versioning::{
    domain::{BranchName, CommitId, Dataset, Snapshot},
    ports::{VersionedStore, VersionedStoreError, VersionedStoreResult, WriteTransaction},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// In-memory branch-versioned store.
///
/// Every commit keeps a full copy of its dataset, which keeps merge-base and
/// historical checkouts trivial. Suitable for tests and single-process
/// deployments without durability requirements.
#[derive(Debug, Clone)]
pub struct InMemoryVersionedStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    graph: RwLock<CommitGraph>,
    branch_locks: Mutex<HashMap<BranchName, Arc<tokio::sync::Mutex<()>>>>,
}

impl InMemoryVersionedStore {
    /// Creates a store holding a single empty commit on `default_branch`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionedStoreError::Persistence`] when the root commit
    /// cannot be recorded.
    pub fn new(default_branch: BranchName) -> VersionedStoreResult<Self> {
        Ok(Self {
            inner: Arc::new(StoreInner {
                graph: RwLock::new(CommitGraph::with_root(default_branch)?),
                branch_locks: Mutex::new(HashMap::new()),
            }),
        })
    }
}

impl StoreInner {
    fn read(&self) -> VersionedStoreResult<RwLockReadGuard<'_, CommitGraph>> {
        self.graph
            .read()
            .map_err(|err| VersionedStoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> VersionedStoreResult<RwLockWriteGuard<'_, CommitGraph>> {
        self.graph
            .write()
            .map_err(|err| VersionedStoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn branch_lock(&self, branch: &BranchName) -> VersionedStoreResult<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .branch_locks
            .lock()
            .map_err(|err| VersionedStoreError::persistence(std::io::Error::other(err.to_string())))?;
        Ok(Arc::clone(locks.entry(branch.clone()).or_default()))
    }

    async fn lock_branch(&self, branch: &BranchName) -> VersionedStoreResult<OwnedMutexGuard<()>> {
        let lock = self.branch_lock(branch)?;
        Ok(lock.lock_owned().await)
    }

    fn tip(&self, branch: &BranchName) -> VersionedStoreResult<CommitId> {
        Ok(self.read()?.tip(branch)?.clone())
    }

    fn merge_locked(
        &self,
        into: &BranchName,
        from: &BranchName,
        expected: &CommitId,
        message: &str,
    ) -> VersionedStoreResult<CommitId> {
        let mut graph = self.write()?;
        let ours = graph.tip(into)?.clone();
        let theirs = graph.tip(from)?.clone();
        if theirs != *expected {
            return Err(VersionedStoreError::BranchMoved {
                branch: from.clone(),
                expected: expected.clone(),
                actual: theirs,
            });
        }
        let base = graph
            .merge_base(&ours, &theirs)?
            .ok_or_else(|| VersionedStoreError::NoCommonAncestor {
                left: into.clone(),
                right: from.clone(),
            })?;
        if base == theirs {
            return Ok(ours);
        }

        let merged = Dataset::three_way_merge(
            &*graph.data(&base)?,
            &*graph.data(&ours)?,
            &*graph.data(&theirs)?,
        )
        .map_err(|conflicts| VersionedStoreError::Conflict {
            from: from.clone(),
            onto: into.clone(),
            conflicts,
        })?;
        let commit = graph.record(vec![ours, theirs], message, merged)?;
        graph.set_tip(into.clone(), commit.clone());
        Ok(commit)
    }

    fn rebase_locked(&self, branch: &BranchName, onto: &BranchName) -> VersionedStoreResult<CommitId> {
        let mut graph = self.write()?;
        let tip = graph.tip(branch)?.clone();
        let onto_tip = graph.tip(onto)?.clone();
        if graph.ancestors(&tip)?.contains(&onto_tip) {
            return Ok(tip);
        }

        let replayed = graph
            .replay(&tip, &onto_tip)?
            .map_err(|conflicts| VersionedStoreError::Conflict {
                from: branch.clone(),
                onto: onto.clone(),
                conflicts,
            })?;
        let mut current = onto_tip;
        for (message, data) in replayed {
            current = graph.record(vec![current], &message, data)?;
        }
        graph.set_tip(branch.clone(), current.clone());
        Ok(current)
    }
}

#[async_trait]
impl VersionedStore for InMemoryVersionedStore {
    async fn begin(&self, branch: &BranchName) -> VersionedStoreResult<Box<dyn WriteTransaction>> {
        let guard = self.inner.lock_branch(branch).await?;
        let (head, data) = {
            let graph = self.inner.read()?;
            let head = graph.tip(branch)?.clone();
            let data = graph.data(&head)?;
            (head, data)
        };
        Ok(Box::new(InMemoryTransaction {
            inner: Arc::clone(&self.inner),
            _guard: guard,
            branch: branch.clone(),
            head,
            working: (*data).clone(),
            original: data,
        }))
    }

    async fn checkout(&self, branch: &BranchName) -> VersionedStoreResult<Snapshot> {
        let graph = self.inner.read()?;
        let tip = graph.tip(branch)?;
        graph.snapshot(tip)
    }

    async fn checkout_commit(&self, commit: &CommitId) -> VersionedStoreResult<Snapshot> {
        self.inner.read()?.snapshot(commit)
    }

    async fn merge_base(
        &self,
        left: &BranchName,
        right: &BranchName,
    ) -> VersionedStoreResult<CommitId> {
        let graph = self.inner.read()?;
        let left_tip = graph.tip(left)?;
        let right_tip = graph.tip(right)?;
        graph
            .merge_base(left_tip, right_tip)?
            .ok_or_else(|| VersionedStoreError::NoCommonAncestor {
                left: left.clone(),
                right: right.clone(),
            })
    }

    async fn branch_head(&self, branch: &BranchName) -> VersionedStoreResult<CommitId> {
        self.inner.tip(branch)
    }

    async fn merge_branch(
        &self,
        into: &BranchName,
        from: &BranchName,
        expected: &CommitId,
        message: &str,
    ) -> VersionedStoreResult<CommitId> {
        let _guard = self.inner.lock_branch(into).await?;
        let commit = self.inner.merge_locked(into, from, expected, message)?;
        debug!(into = %into, from = %from, commit = commit.short(), "merged branch");
        Ok(commit)
    }

    async fn rebase_branch(
        &self,
        branch: &BranchName,
        onto: &BranchName,
    ) -> VersionedStoreResult<CommitId> {
        let _guard = self.inner.lock_branch(branch).await?;
        let commit = self.inner.rebase_locked(branch, onto)?;
        debug!(branch = %branch, onto = %onto, commit = commit.short(), "rebased branch");
        Ok(commit)
    }

    async fn create_branch(&self, name: &BranchName, from: &BranchName) -> VersionedStoreResult<()> {
        let mut graph = self.inner.write()?;
        if graph.has_branch(name) {
            return Err(VersionedStoreError::BranchExists(name.clone()));
        }
        let tip = graph.tip(from)?.clone();
        graph.set_tip(name.clone(), tip);
        Ok(())
    }

    async fn delete_branch(&self, name: &BranchName) -> VersionedStoreResult<()> {
        let _guard = self.inner.lock_branch(name).await?;
        self.inner.write()?.remove_branch(name)
    }

    async fn branch_exists(&self, name: &BranchName) -> VersionedStoreResult<bool> {
        Ok(self.inner.read()?.has_branch(name))
    }

    async fn has_commits_after(
        &self,
        branch: &BranchName,
        commit: &CommitId,
    ) -> VersionedStoreResult<bool> {
        let graph = self.inner.read()?;
        let tip = graph.tip(branch)?;
        graph.snapshot(commit)?;
        Ok(tip != commit && graph.ancestors(tip)?.contains(commit))
    }
}

/// Write transaction over a private copy of the branch tip.
struct InMemoryTransaction {
    inner: Arc<StoreInner>,
    _guard: OwnedMutexGuard<()>,
    branch: BranchName,
    head: CommitId,
    working: Dataset,
    original: Arc<Dataset>,
}

#[async_trait]
impl WriteTransaction for InMemoryTransaction {
    fn branch(&self) -> &BranchName {
        &self.branch
    }

    fn head(&self) -> &CommitId {
        &self.head
    }

    fn data(&self) -> &Dataset {
        &self.working
    }

    fn data_mut(&mut self) -> &mut Dataset {
        &mut self.working
    }

    async fn commit(self: Box<Self>, message: &str) -> VersionedStoreResult<CommitId> {
        let Self {
            inner,
            _guard,
            branch,
            head,
            working,
            original,
        } = *self;
        if working == *original {
            return Ok(head);
        }

        let mut graph = inner.write()?;
        if graph.tip(&branch)? != &head {
            return Err(VersionedStoreError::persistence(std::io::Error::other(format!(
                "branch {branch} moved while a transaction held it"
            ))));
        }
        let commit = graph.record(vec![head], message, working)?;
        graph.set_tip(branch.clone(), commit.clone());
        debug!(branch = %branch, commit = commit.short(), summary = message, "committed");
        Ok(commit)
    }
}
