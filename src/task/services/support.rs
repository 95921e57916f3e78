//! Shared plumbing for task services: branch resolution, guarded state
//! transitions and the compensating Failed transition.

use super::{OrchestrationError, OrchestrationResult};
use crate::changeset::{
    domain::{Changeset, ChangesetId, ChangesetName, ChangesetState},
    ports::ChangesetRepository,
};
use crate::config::BranchLayout;
use crate::task::{
    domain::{BranchSnapshot, TaskRecord, TaskState},
    ports::{TaskRepository, TaskRepositoryMut},
};
use crate::versioning::{
    domain::{BranchName, Dataset, Record, Snapshot},
    ports::VersionedStore,
};
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs `on_failure` when `result` is an error.
///
/// The original error is returned unchanged when the side effect succeeds;
/// otherwise both errors are combined into
/// [`OrchestrationError::Compensation`].
pub(crate) async fn compensate<T, F, Fut>(
    result: OrchestrationResult<T>,
    on_failure: F,
) -> OrchestrationResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = OrchestrationResult<()>>,
{
    let original = match result {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    match on_failure().await {
        Ok(()) => Err(original),
        Err(compensation) => Err(OrchestrationError::Compensation {
            original: Box::new(original),
            compensation: Box::new(compensation),
        }),
    }
}

/// Fails unless `record` carries the requested identifier.
pub(crate) fn ensure_identity<R: TaskRecord>(requested: R::Id, record: &R) -> OrchestrationResult<()> {
    if record.id() == requested {
        return Ok(());
    }
    Err(OrchestrationError::IdentityMismatch {
        kind: R::KIND,
        requested: requested.to_string(),
        fetched: record.id().to_string(),
    })
}

/// Store, clock and branch layout shared by every task service.
pub(crate) struct TaskContext<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
    layout: BranchLayout,
}

impl<S, C> Clone for TaskContext<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            layout: self.layout.clone(),
        }
    }
}

impl<S, C> TaskContext<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    pub(crate) const fn new(store: Arc<S>, clock: Arc<C>, layout: BranchLayout) -> Self {
        Self {
            store,
            clock,
            layout,
        }
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }

    pub(crate) const fn main(&self) -> &BranchName {
        self.layout.main()
    }

    pub(crate) const fn admin(&self) -> &BranchName {
        self.layout.admin()
    }

    pub(crate) async fn changeset_by_name(&self, name: &str) -> OrchestrationResult<Changeset> {
        let changeset_name = ChangesetName::new(name)?;
        let snapshot = self.store.checkout(self.main()).await?;
        snapshot
            .data()
            .find_changeset_by_name(&changeset_name)?
            .ok_or_else(|| OrchestrationError::ChangesetNotFound(changeset_name.to_string()))
    }

    pub(crate) async fn changeset_by_id(&self, id: ChangesetId) -> OrchestrationResult<Changeset> {
        let snapshot = self.store.checkout(self.main()).await?;
        snapshot
            .data()
            .find_changeset(id)?
            .ok_or_else(|| OrchestrationError::ChangesetNotFound(id.to_string()))
    }

    pub(crate) async fn open_changesets(&self) -> OrchestrationResult<Vec<Changeset>> {
        let snapshot = self.store.checkout(self.main()).await?;
        Ok(snapshot
            .data()
            .list_changesets()?
            .into_iter()
            .filter(Changeset::is_open)
            .collect())
    }

    /// Branch holding the plans and applies of `changeset`: its own branch
    /// until it is merged, main afterwards.
    pub(crate) fn task_branch<'a>(&'a self, changeset: &'a Changeset) -> &'a BranchName {
        match changeset.state() {
            ChangesetState::Merged => self.main(),
            ChangesetState::Open | ChangesetState::Closed => changeset.branch(),
        }
    }

    /// Records merge-base with main and head of the changeset branch.
    pub(crate) async fn capture_snapshot(
        &self,
        changeset: &Changeset,
    ) -> OrchestrationResult<BranchSnapshot> {
        let merge_base = self.store.merge_base(self.main(), changeset.branch()).await?;
        let head = self.store.branch_head(changeset.branch()).await?;
        Ok(BranchSnapshot::new(merge_base, head))
    }

    /// Checks out `branch`, or returns `None` when it does not exist.
    pub(crate) async fn checkout_if_exists(
        &self,
        branch: &BranchName,
    ) -> OrchestrationResult<Option<Snapshot>> {
        if !self.store.branch_exists(branch).await? {
            return Ok(None);
        }
        Ok(Some(self.store.checkout(branch).await?))
    }

    /// Reads a task from the tip of `branch`, verifying its identity.
    pub(crate) async fn fetch<R>(&self, branch: &BranchName, id: R::Id) -> OrchestrationResult<R>
    where
        R: TaskRecord + Record,
    {
        let snapshot = self.store.checkout(branch).await?;
        let record: R = snapshot
            .data()
            .find_task(id)?
            .ok_or_else(|| OrchestrationError::not_found(R::KIND, id))?;
        ensure_identity(id, &record)?;
        Ok(record)
    }

    /// Re-reads a task inside a transaction on `branch`, verifies its
    /// identity and moves it to `target`.
    pub(crate) async fn transition<R>(
        &self,
        branch: &BranchName,
        id: R::Id,
        target: TaskState,
    ) -> OrchestrationResult<R>
    where
        R: TaskRecord + Record,
    {
        let mut tx = self.store.begin(branch).await?;
        let mut record: R = tx
            .data()
            .find_task(id)?
            .ok_or_else(|| OrchestrationError::not_found(R::KIND, id))?;
        ensure_identity(id, &record)?;
        record.transition_to(target, self.clock())?;
        tx.data_mut().update_task(&record)?;
        tx.commit(&format!("{} {id} {target}", R::KIND)).await?;
        debug!(kind = %R::KIND, id = %id, state = %target, "task transitioned");
        Ok(record)
    }

    /// Compensating transition to Failed.
    pub(crate) async fn mark_failed<R>(&self, branch: &BranchName, id: R::Id) -> OrchestrationResult<()>
    where
        R: TaskRecord + Record,
    {
        self.transition::<R>(branch, id, TaskState::Failed)
            .await
            .map(|_| ())
    }

    /// Moves every Started task on `branch` to Aborted.
    pub(crate) async fn abort_started<R>(&self, branch: &BranchName) -> OrchestrationResult<usize>
    where
        R: TaskRecord + Record,
    {
        let mut tx = self.store.begin(branch).await?;
        let started: Vec<R> = tx.data().tasks_in_state(TaskState::Started)?;
        let count = started.len();
        for mut record in started {
            record.transition_to(TaskState::Aborted, self.clock())?;
            tx.data_mut().update_task(&record)?;
            warn!(kind = %R::KIND, id = %record.id(), "aborted interrupted task");
        }
        tx.commit(&format!("abort interrupted {} tasks", R::KIND))
            .await?;
        Ok(count)
    }

    /// Moves every Queued or Started task of `changeset` in `data` to
    /// Cancelled.
    pub(crate) fn cancel_pending<R>(
        &self,
        data: &mut Dataset,
        changeset: ChangesetId,
    ) -> OrchestrationResult<usize>
    where
        R: TaskRecord + Record,
    {
        let pending: Vec<R> = data
            .tasks_for_changeset::<R>(changeset)?
            .into_iter()
            .filter(|record| matches!(record.state(), TaskState::Queued | TaskState::Started))
            .collect();
        let count = pending.len();
        for mut record in pending {
            record.transition_to(TaskState::Cancelled, self.clock())?;
            data.update_task(&record)?;
        }
        Ok(count)
    }
}
