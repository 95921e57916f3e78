//! Rebase orchestration.
//!
//! Rebase records live on the admin branch so that rebasing a changeset
//! never rewrites the history holding its own request.

use super::{
    Deadline, OrchestrationError, OrchestrationResult,
    support::{TaskContext, compensate},
};
use crate::config::BranchLayout;
use crate::task::{
    domain::{Rebase, RebaseId, TaskKind, TaskRecord, TaskState},
    ports::{TaskRepository, TaskRepositoryMut},
};
use crate::versioning::{
    domain::CommitId,
    ports::{VersionedStore, VersionedStoreError},
};
use crate::worker::{TaskQueue, TaskRunner};
use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Creates, runs and reads rebases.
#[derive(Clone)]
pub struct RebaseService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    ctx: TaskContext<S, C>,
    queue: TaskQueue<RebaseId>,
}

impl<S, C> RebaseService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    /// Creates a rebase service pushing new rebases to `queue`.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        clock: Arc<C>,
        layout: BranchLayout,
        queue: TaskQueue<RebaseId>,
    ) -> Self {
        Self {
            ctx: TaskContext::new(store, clock, layout),
            queue,
        }
    }

    /// Records a Queued rebase of an open changeset onto main.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::ChangesetNotFound`] or
    /// [`OrchestrationError::Changeset`] when the changeset is not
    /// open.
    pub async fn create_rebase(&self, changeset: &str) -> OrchestrationResult<Rebase> {
        let owner = self.ctx.changeset_by_name(changeset).await?;
        owner.ensure_open()?;
        let snapshot = self.ctx.capture_snapshot(&owner).await?;
        self.ensure_admin_branch().await?;

        let rebase = Rebase::new(owner.id(), snapshot, self.ctx.clock());
        let mut tx = self.ctx.store().begin(self.ctx.admin()).await?;
        tx.data_mut().store_task(&rebase)?;
        tx.commit(&format!("queue rebase {} of {}", rebase.id(), owner.name()))
            .await?;

        info!(changeset = %owner.name(), rebase = %rebase.id(), "queued rebase");
        self.queue.enqueue(rebase.id());
        Ok(rebase)
    }

    /// Returns a rebase.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::TaskNotFound`] when the rebase
    /// does not exist.
    pub async fn get_rebase(&self, rebase_id: RebaseId) -> OrchestrationResult<Rebase> {
        if !self.ctx.store().branch_exists(self.ctx.admin()).await? {
            return Err(OrchestrationError::not_found(TaskKind::Rebase, rebase_id));
        }
        self.ctx.fetch(self.ctx.admin(), rebase_id).await
    }

    /// Returns every rebase of the changeset, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::ChangesetNotFound`] when the
    /// changeset does not exist.
    pub async fn list_rebases(&self, changeset: &str) -> OrchestrationResult<Vec<Rebase>> {
        let owner = self.ctx.changeset_by_name(changeset).await?;
        let Some(snapshot) = self.ctx.checkout_if_exists(self.ctx.admin()).await? else {
            return Ok(Vec::new());
        };
        Ok(snapshot.data().tasks_for_changeset(owner.id())?)
    }

    /// Runs a Queued rebase, replaying the changeset onto the tip of main.
    ///
    /// Plans taken before the rebase keep their old merge-base; merging
    /// requires re-planning the changed components afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::Task`] when the rebase is not
    /// Queued and otherwise the first failure, including replay conflicts,
    /// after marking the rebase Failed.
    #[instrument(skip(self, deadline), fields(kind = %TaskKind::Rebase))]
    pub async fn run_rebase(
        &self,
        rebase_id: RebaseId,
        deadline: Deadline,
    ) -> OrchestrationResult<Rebase> {
        let admin = self.ctx.admin();
        let rebase: Rebase = self
            .ctx
            .transition(admin, rebase_id, TaskState::Started)
            .await?;
        let result = self.execute(&rebase, deadline).await;
        compensate(result, || self.ctx.mark_failed::<Rebase>(admin, rebase_id)).await
    }

    async fn execute(&self, rebase: &Rebase, deadline: Deadline) -> OrchestrationResult<Rebase> {
        let owner = self.ctx.changeset_by_id(rebase.changeset_id()).await?;
        owner.ensure_open()?;
        let head: CommitId = deadline
            .bound(
                self.ctx
                    .store()
                    .rebase_branch(owner.branch(), self.ctx.main()),
            )
            .await?;
        let finished = self
            .ctx
            .transition(self.ctx.admin(), rebase.id(), TaskState::Succeeded)
            .await?;
        info!(changeset = %owner.name(), rebase = %rebase.id(), head = %head.short(), "rebased changeset");
        Ok(finished)
    }

    async fn ensure_admin_branch(&self) -> OrchestrationResult<()> {
        let store = self.ctx.store();
        if store.branch_exists(self.ctx.admin()).await? {
            return Ok(());
        }
        match store.create_branch(self.ctx.admin(), self.ctx.main()).await {
            Ok(()) => {
                debug!(branch = %self.ctx.admin(), "created admin branch");
                Ok(())
            }
            Err(VersionedStoreError::BranchExists(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl<S, C> TaskRunner for RebaseService<S, C>
where
    S: VersionedStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    type Job = RebaseId;

    fn kind(&self) -> TaskKind {
        TaskKind::Rebase
    }

    async fn run(&self, job: RebaseId, deadline: Deadline) -> OrchestrationResult<()> {
        self.run_rebase(job, deadline).await.map(|_| ())
    }

    async fn queued(&self) -> OrchestrationResult<Vec<RebaseId>> {
        let Some(snapshot) = self.ctx.checkout_if_exists(self.ctx.admin()).await? else {
            return Ok(Vec::new());
        };
        let rebases: Vec<Rebase> = snapshot.data().tasks_in_state(TaskState::Queued)?;
        Ok(rebases.iter().map(TaskRecord::id).collect())
    }

    async fn recover_interrupted(&self) -> OrchestrationResult<usize> {
        if !self.ctx.store().branch_exists(self.ctx.admin()).await? {
            return Ok(0);
        }
        self.ctx.abort_started::<Rebase>(self.ctx.admin()).await
    }
}
