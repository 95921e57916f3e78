//! Commit graph backing the in-memory store.

use crate::versioning::{
    domain::{BranchName, CommitId, Dataset, MergeConflicts, Snapshot},
    ports::{VersionedStoreError, VersionedStoreResult},
};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Commit {
    parents: Vec<CommitId>,
    message: String,
    sequence: u64,
    data: Arc<Dataset>,
}

/// Commits and branch pointers.
#[derive(Debug, Default)]
pub(super) struct CommitGraph {
    commits: HashMap<CommitId, Commit>,
    branches: HashMap<BranchName, CommitId>,
    next_sequence: u64,
}

impl CommitGraph {
    /// Creates a graph with one empty root commit on `branch`.
    pub(super) fn with_root(branch: BranchName) -> VersionedStoreResult<Self> {
        let mut graph = Self::default();
        let root = graph.record(Vec::new(), "initialize data repository", Dataset::new())?;
        graph.branches.insert(branch, root);
        Ok(graph)
    }

    pub(super) fn tip(&self, branch: &BranchName) -> VersionedStoreResult<&CommitId> {
        self.branches
            .get(branch)
            .ok_or_else(|| VersionedStoreError::BranchNotFound(branch.clone()))
    }

    pub(super) fn has_branch(&self, branch: &BranchName) -> bool {
        self.branches.contains_key(branch)
    }

    pub(super) fn set_tip(&mut self, branch: BranchName, commit: CommitId) {
        self.branches.insert(branch, commit);
    }

    pub(super) fn remove_branch(&mut self, branch: &BranchName) -> VersionedStoreResult<()> {
        self.branches
            .remove(branch)
            .map(|_| ())
            .ok_or_else(|| VersionedStoreError::BranchNotFound(branch.clone()))
    }

    fn commit(&self, id: &CommitId) -> VersionedStoreResult<&Commit> {
        self.commits
            .get(id)
            .ok_or_else(|| VersionedStoreError::CommitNotFound(id.clone()))
    }

    pub(super) fn snapshot(&self, id: &CommitId) -> VersionedStoreResult<Snapshot> {
        let commit = self.commit(id)?;
        Ok(Snapshot::new(id.clone(), Arc::clone(&commit.data)))
    }

    pub(super) fn data(&self, id: &CommitId) -> VersionedStoreResult<Arc<Dataset>> {
        Ok(Arc::clone(&self.commit(id)?.data))
    }

    /// Stores a commit and returns its content-derived identifier.
    pub(super) fn record(
        &mut self,
        parents: Vec<CommitId>,
        message: &str,
        data: Dataset,
    ) -> VersionedStoreResult<CommitId> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let encoded = serde_json::to_vec(&data).map_err(VersionedStoreError::persistence)?;
        let mut hasher = Sha256::new();
        for parent in &parents {
            hasher.update(parent.as_str());
            hasher.update([0_u8]);
        }
        hasher.update(message);
        hasher.update(sequence.to_string());
        hasher.update(&encoded);
        let id = CommitId::new(format!("{:x}", hasher.finalize()));

        self.commits.insert(
            id.clone(),
            Commit {
                parents,
                message: message.to_owned(),
                sequence,
                data: Arc::new(data),
            },
        );
        Ok(id)
    }

    /// Returns `start` and every commit reachable from it.
    pub(super) fn ancestors(&self, start: &CommitId) -> VersionedStoreResult<HashSet<CommitId>> {
        let mut seen = HashSet::new();
        let mut pending = VecDeque::from([start.clone()]);
        while let Some(id) = pending.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            pending.extend(self.commit(&id)?.parents.iter().cloned());
        }
        Ok(seen)
    }

    /// Returns the common ancestor with the highest sequence number.
    ///
    /// Ancestors always carry lower sequence numbers than their descendants,
    /// so the result is never an ancestor of another common ancestor.
    pub(super) fn merge_base(
        &self,
        left: &CommitId,
        right: &CommitId,
    ) -> VersionedStoreResult<Option<CommitId>> {
        let left_ancestors = self.ancestors(left)?;
        let right_ancestors = self.ancestors(right)?;
        let mut best: Option<(u64, &CommitId)> = None;
        for id in left_ancestors.intersection(&right_ancestors) {
            let sequence = self.commit(id)?.sequence;
            if best.is_none_or(|(best_sequence, _)| sequence > best_sequence) {
                best = Some((sequence, id));
            }
        }
        Ok(best.map(|(_, id)| id.clone()))
    }

    /// Computes the datasets produced by replaying the first-parent history
    /// of `tip` that is not reachable from `onto` on top of `onto`.
    ///
    /// Nothing is recorded, so a conflict leaves the graph untouched.
    pub(super) fn replay(
        &self,
        tip: &CommitId,
        onto: &CommitId,
    ) -> VersionedStoreResult<Result<Vec<(String, Dataset)>, MergeConflicts>> {
        let onto_ancestors = self.ancestors(onto)?;
        let mut chain = Vec::new();
        let mut cursor = tip.clone();
        while !onto_ancestors.contains(&cursor) {
            let commit = self.commit(&cursor)?;
            let Some(parent) = commit.parents.first() else {
                break;
            };
            chain.push((cursor.clone(), parent.clone()));
            cursor = parent.clone();
        }
        chain.reverse();

        let mut current = (*self.data(onto)?).clone();
        let mut replayed = Vec::with_capacity(chain.len());
        for (commit_id, parent_id) in chain {
            let commit = self.commit(&commit_id)?;
            let parent_data = self.data(&parent_id)?;
            match Dataset::three_way_merge(&parent_data, &current, &commit.data) {
                Ok(merged) => {
                    current = merged.clone();
                    replayed.push((commit.message.clone(), merged));
                }
                Err(conflicts) => return Ok(Err(conflicts)),
            }
        }
        Ok(Ok(replayed))
    }
}
