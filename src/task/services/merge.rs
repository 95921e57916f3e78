//! Merge orchestration.
//!
//! A merge records the merge-base and head of its changeset when requested.
//! At run time both are re-derived inside a transaction on the changeset
//! branch; if either moved, or a changed component lacks a current
//! successful plan, the merge is rejected instead of folded into main. Only
//! the head that passed validation is merged.

use super::{
    Deadline, OrchestrationError, OrchestrationResult, Provisioning,
    support::{TaskContext, compensate, ensure_identity},
};
use crate::changeset::{
    domain::{Changeset, Component, ComponentChange, diff_components},
    ports::{ChangesetRepository, ChangesetRepositoryMut, ComponentRepository},
};
use crate::config::BranchLayout;
use crate::task::{
    domain::{
        Apply, ApplyId, Merge, MergeId, MergeOutcome, MergeRejection, Plan, PlanId, TaskKind,
        TaskRecord, TaskState,
    },
    ports::{OperationKind, TaskRepository, TaskRepositoryMut},
};
use crate::versioning::{
    domain::{CommitId, Dataset},
    ports::{VersionedStore, VersionedStoreError, WriteTransaction},
};
use crate::worker::{TaskQueue, TaskRunner};
use async_trait::async_trait;
use mockable::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Plan deleted before a merge because no changed component refers to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Orphan {
    plan: PlanId,
    apply: Option<ApplyId>,
}

enum Readiness {
    Ready {
        /// Changeset head that passed validation, after orphan cleanup.
        head: CommitId,
        orphans: Vec<Orphan>,
    },
    Rejected(MergeRejection),
}

/// Creates, runs and reads merges.
#[derive(Clone)]
pub struct MergeService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    ctx: TaskContext<S, C>,
    provisioning: Provisioning,
    queue: TaskQueue<MergeId>,
    applies: TaskQueue<ApplyId>,
}

impl<S, C> MergeService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    /// Creates a merge service pushing new merges to `queue` and the
    /// applies released by a merge to `applies`.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        clock: Arc<C>,
        layout: BranchLayout,
        provisioning: Provisioning,
        queue: TaskQueue<MergeId>,
        applies: TaskQueue<ApplyId>,
    ) -> Self {
        Self {
            ctx: TaskContext::new(store, clock, layout),
            provisioning,
            queue,
            applies,
        }
    }

    /// Records a Queued merge of an open changeset and offers it to the
    /// worker.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::ChangesetNotFound`] or
    /// [`OrchestrationError::Changeset`] when the changeset is not open.
    pub async fn create_merge(&self, changeset: &str) -> OrchestrationResult<Merge> {
        let requested = self.ctx.changeset_by_name(changeset).await?;
        let mut tx = self.ctx.store().begin(self.ctx.main()).await?;
        let owner = tx
            .data()
            .find_changeset(requested.id())?
            .ok_or_else(|| OrchestrationError::ChangesetNotFound(changeset.to_owned()))?;
        owner.ensure_open()?;
        let snapshot = self.ctx.capture_snapshot(&owner).await?;
        let merge = Merge::new(owner.id(), snapshot, self.ctx.clock());
        tx.data_mut().store_task(&merge)?;
        tx.commit(&format!("queue merge {} of {}", merge.id(), owner.name()))
            .await?;

        info!(changeset = %owner.name(), merge = %merge.id(), "queued merge");
        self.queue.enqueue(merge.id());
        Ok(merge)
    }

    /// Returns a merge.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::TaskNotFound`] when the merge does not
    /// exist.
    pub async fn get_merge(&self, merge_id: MergeId) -> OrchestrationResult<Merge> {
        self.ctx.fetch(self.ctx.main(), merge_id).await
    }

    /// Returns every merge of the changeset, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::ChangesetNotFound`] when the changeset
    /// does not exist.
    pub async fn list_merges(&self, changeset: &str) -> OrchestrationResult<Vec<Merge>> {
        let owner = self.ctx.changeset_by_name(changeset).await?;
        let snapshot = self.ctx.store().checkout(self.ctx.main()).await?;
        Ok(snapshot.data().tasks_for_changeset(owner.id())?)
    }

    /// Runs a Queued merge.
    ///
    /// A rejected merge is a normal outcome: the merge ends Failed with the
    /// reason recorded, the changeset review becomes Rejected and
    /// [`MergeOutcome::Rejected`] is returned.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::Task`] when the merge is not Queued and
    /// otherwise the first system failure, after marking the merge Failed.
    #[instrument(skip(self, deadline), fields(kind = %TaskKind::Merge))]
    pub async fn run_merge(
        &self,
        merge_id: MergeId,
        deadline: Deadline,
    ) -> OrchestrationResult<MergeOutcome> {
        let main = self.ctx.main();
        let merge: Merge = self
            .ctx
            .transition(main, merge_id, TaskState::Started)
            .await?;
        let result = self.execute(&merge, deadline).await;
        compensate(result, || self.ctx.mark_failed::<Merge>(main, merge_id)).await
    }

    async fn execute(&self, merge: &Merge, deadline: Deadline) -> OrchestrationResult<MergeOutcome> {
        let owner = self.ctx.changeset_by_id(merge.changeset_id()).await?;
        owner.ensure_open()?;

        let (head, orphans) = match deadline.bound(self.prepare(merge, &owner)).await? {
            Readiness::Ready { head, orphans } => (head, orphans),
            Readiness::Rejected(rejection) => return self.reject(merge, rejection).await,
        };
        self.purge_outputs(&orphans).await;

        let merged = deadline
            .bound(self.ctx.store().merge_branch(
                self.ctx.main(),
                owner.branch(),
                &head,
                &format!("merge changeset {}", owner.name()),
            ))
            .await;
        match merged {
            Ok(commit) => self.finish(merge, &owner, commit).await,
            Err(OrchestrationError::Store(VersionedStoreError::Conflict { conflicts, .. })) => {
                let paths = conflicts.paths().to_vec();
                self.reject(merge, MergeRejection::Conflict { paths }).await
            }
            Err(OrchestrationError::Store(VersionedStoreError::BranchMoved {
                expected,
                actual,
                ..
            })) => {
                let rejection = MergeRejection::ChangesetMoved {
                    recorded: expected,
                    current: actual,
                };
                self.reject(merge, rejection).await
            }
            Err(err) => Err(err),
        }
    }

    /// Validates the merge against the current branch state and, when it may
    /// proceed, deletes plans no changed component refers to.
    async fn prepare(&self, merge: &Merge, owner: &Changeset) -> OrchestrationResult<Readiness> {
        let store = self.ctx.store();
        let branch = owner.branch();
        let mut tx = store.begin(branch).await?;
        let recorded = merge.snapshot();
        let current_head = tx.head().clone();

        if store.has_commits_after(branch, recorded.head()).await? {
            return Ok(Readiness::Rejected(MergeRejection::ChangesetMoved {
                recorded: recorded.head().clone(),
                current: current_head,
            }));
        }
        let merge_base = store.merge_base(self.ctx.main(), branch).await?;
        if merge_base != *recorded.merge_base() {
            return Ok(Readiness::Rejected(MergeRejection::MergeBaseMoved {
                recorded: recorded.merge_base().clone(),
                current: merge_base,
            }));
        }
        if current_head != *recorded.head() {
            return Ok(Readiness::Rejected(MergeRejection::ChangesetMoved {
                recorded: recorded.head().clone(),
                current: current_head,
            }));
        }

        let base = store.checkout_commit(&merge_base).await?;
        let upstream = store.checkout(self.ctx.main()).await?;
        let changes = diff_components(base.data(), tx.data())?;
        let mut referenced = BTreeSet::new();
        for change in &changes {
            let plan = match validate_change(
                owner,
                change,
                &merge_base,
                base.data(),
                upstream.data(),
                tx.data(),
            )? {
                Ok(plan) => plan,
                Err(rejection) => return Ok(Readiness::Rejected(rejection)),
            };
            if self.planned_definition(&plan).await?.as_ref() != Some(&change.component) {
                return Ok(Readiness::Rejected(MergeRejection::PlanOutdated {
                    component: change.component.name().clone(),
                    plan: plan.id(),
                }));
            }
            referenced.insert(plan.id());
        }

        let orphans = remove_orphans(tx.data_mut(), owner, &referenced)?;
        if orphans.is_empty() {
            return Ok(Readiness::Ready {
                head: current_head,
                orphans,
            });
        }
        let head = tx
            .commit(&format!(
                "remove {} orphaned plans before merging {}",
                orphans.len(),
                owner.name()
            ))
            .await?;
        Ok(Readiness::Ready { head, orphans })
    }

    /// Returns the component definition the plan was computed from.
    async fn planned_definition(&self, plan: &Plan) -> OrchestrationResult<Option<Component>> {
        let planned = self
            .ctx
            .store()
            .checkout_commit(plan.snapshot().head())
            .await?;
        Ok(planned.data().find_component(plan.component_id())?)
    }

    /// Deletes artifacts and logs of removed plans and applies.
    ///
    /// Failures are logged; the rows are already gone so nothing refers to
    /// the leftovers.
    async fn purge_outputs(&self, orphans: &[Orphan]) {
        let logs = self.provisioning.log_store();
        for orphan in orphans {
            if let Err(err) = self.provisioning.plan_store().delete_plan(orphan.plan).await {
                warn!(plan = %orphan.plan, error = %err, "failed to delete plan artifact");
            }
            if let Err(err) = logs.delete_log(OperationKind::Plan, orphan.plan.into_inner()) {
                warn!(plan = %orphan.plan, error = %err, "failed to delete plan log");
            }
            let Some(apply) = orphan.apply else {
                continue;
            };
            if let Err(err) = logs.delete_log(OperationKind::Apply, apply.into_inner()) {
                warn!(apply = %apply, error = %err, "failed to delete apply log");
            }
        }
        if !orphans.is_empty() {
            info!(count = orphans.len(), "removed orphaned plans");
        }
    }

    async fn reject(
        &self,
        merge: &Merge,
        rejection: MergeRejection,
    ) -> OrchestrationResult<MergeOutcome> {
        let mut tx = self.ctx.store().begin(self.ctx.main()).await?;
        let mut failed = reload(&*tx, merge.id())?;
        failed.record_rejection(rejection.clone());
        failed.transition_to(TaskState::Failed, self.ctx.clock())?;
        tx.data_mut().update_task(&failed)?;
        if let Some(mut owner) = tx.data().find_changeset(merge.changeset_id())? {
            owner.reject(self.ctx.clock());
            tx.data_mut().update_changeset(&owner)?;
        }
        tx.commit(&format!("reject merge {}", merge.id())).await?;

        info!(merge = %merge.id(), reason = %rejection, "merge rejected");
        Ok(MergeOutcome::Rejected(rejection))
    }

    async fn finish(
        &self,
        merge: &Merge,
        owner: &Changeset,
        commit: CommitId,
    ) -> OrchestrationResult<MergeOutcome> {
        let mut tx = self.ctx.store().begin(self.ctx.main()).await?;
        let mut succeeded = reload(&*tx, merge.id())?;
        let mut merged = tx
            .data()
            .find_changeset(owner.id())?
            .ok_or_else(|| OrchestrationError::ChangesetNotFound(owner.name().to_string()))?;
        merged.mark_merged(self.ctx.clock())?;
        succeeded.transition_to(TaskState::Succeeded, self.ctx.clock())?;
        tx.data_mut().update_changeset(&merged)?;
        tx.data_mut().update_task(&succeeded)?;
        tx.commit(&format!("merge {} succeeded", merge.id())).await?;

        info!(changeset = %owner.name(), merge = %merge.id(), commit = %commit.short(), "merged changeset");
        if let Err(err) = self.release_applies(owner).await {
            warn!(
                changeset = %owner.name(),
                error = %err,
                "failed to release applies, leaving them to the recovery sweep"
            );
        }
        Ok(MergeOutcome::Merged { commit })
    }

    async fn release_applies(&self, owner: &Changeset) -> OrchestrationResult<()> {
        let snapshot = self.ctx.store().checkout(self.ctx.main()).await?;
        let applies: Vec<Apply> = snapshot.data().tasks_for_changeset(owner.id())?;
        for apply in applies.iter().filter(|apply| apply.state() == TaskState::Queued) {
            self.applies.enqueue(apply.id());
        }
        Ok(())
    }
}

fn reload(tx: &dyn WriteTransaction, merge_id: MergeId) -> OrchestrationResult<Merge> {
    let merge: Merge = tx
        .data()
        .find_task(merge_id)?
        .ok_or_else(|| OrchestrationError::not_found(TaskKind::Merge, merge_id))?;
    ensure_identity(merge_id, &merge)?;
    Ok(merge)
}

/// Checks one changed component, returning the plan that covers it.
fn validate_change(
    owner: &Changeset,
    change: &ComponentChange,
    merge_base: &CommitId,
    base: &Dataset,
    upstream: &Dataset,
    head: &Dataset,
) -> OrchestrationResult<Result<Plan, MergeRejection>> {
    let component_id = change.component_id();
    let component = change.component.name().clone();
    if upstream.find_component(component_id)? != base.find_component(component_id)? {
        return Ok(Err(MergeRejection::UpstreamChanged { component }));
    }
    let Some(plan) = head.latest_plan_for_component(owner.id(), component_id)? else {
        return Ok(Err(MergeRejection::PlanMissing { component }));
    };
    if plan.state() != TaskState::Succeeded {
        return Ok(Err(MergeRejection::PlanNotSucceeded {
            component,
            plan: plan.id(),
            state: plan.state(),
        }));
    }
    if plan.snapshot().merge_base() != merge_base {
        return Ok(Err(MergeRejection::PlanStale {
            component,
            plan: plan.id(),
        }));
    }
    Ok(Ok(plan))
}

/// Deletes every plan of the changeset outside `referenced`, with its apply.
fn remove_orphans(
    data: &mut Dataset,
    owner: &Changeset,
    referenced: &BTreeSet<PlanId>,
) -> OrchestrationResult<Vec<Orphan>> {
    let plans: Vec<Plan> = data.tasks_for_changeset(owner.id())?;
    let mut orphans = Vec::new();
    for plan in plans.iter().filter(|plan| !referenced.contains(&plan.id())) {
        let apply = data.apply_for_plan(plan.id())?.map(|apply| apply.id());
        if let Some(apply_id) = apply {
            data.delete_task::<Apply>(apply_id);
        }
        data.delete_task::<Plan>(plan.id());
        orphans.push(Orphan {
            plan: plan.id(),
            apply,
        });
    }
    Ok(orphans)
}

#[async_trait]
impl<S, C> TaskRunner for MergeService<S, C>
where
    S: VersionedStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    type Job = MergeId;

    fn kind(&self) -> TaskKind {
        TaskKind::Merge
    }

    async fn run(&self, job: MergeId, deadline: Deadline) -> OrchestrationResult<()> {
        let outcome = self.run_merge(job, deadline).await?;
        if let MergeOutcome::Rejected(rejection) = outcome {
            info!(merge = %job, reason = %rejection, "merge finished without merging");
        }
        Ok(())
    }

    async fn queued(&self) -> OrchestrationResult<Vec<MergeId>> {
        let snapshot = self.ctx.store().checkout(self.ctx.main()).await?;
        let merges: Vec<Merge> = snapshot.data().tasks_in_state(TaskState::Queued)?;
        Ok(merges.iter().map(TaskRecord::id).collect())
    }

    async fn recover_interrupted(&self) -> OrchestrationResult<usize> {
        self.ctx.abort_started::<Merge>(self.ctx.main()).await
    }
}
