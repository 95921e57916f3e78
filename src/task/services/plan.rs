//! Plan orchestration.

use super::{
    Deadline, OrchestrationError, OrchestrationResult, Provisioning,
    support::{TaskContext, compensate, ensure_identity},
};
use crate::changeset::{
    domain::{Component, ComponentId},
    ports::ComponentRepository,
};
use crate::config::BranchLayout;
use crate::task::{
    domain::{Apply, BranchSnapshot, Plan, PlanId, TaskKind, TaskRecord, TaskState},
    ports::{OperationKind, PlanOutput, TaskRepository, TaskRepositoryMut},
};
use crate::versioning::{domain::BranchName, ports::VersionedStore};
use crate::worker::{TaskQueue, TaskRunner};
use async_trait::async_trait;
use mockable::Clock;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Work item for the plan worker.
///
/// Plans live on their changeset's branch, so the job carries both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanJob {
    /// Plan to run.
    pub plan_id: PlanId,
    /// Branch holding the plan.
    pub branch: BranchName,
}

impl fmt::Display for PlanJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.plan_id, self.branch)
    }
}

/// Creates, runs and reads plans.
#[derive(Clone)]
pub struct PlanService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    ctx: TaskContext<S, C>,
    provisioning: Provisioning,
    queue: TaskQueue<PlanJob>,
}

impl<S, C> PlanService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    /// Creates a plan service pushing new plans to `queue`.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        clock: Arc<C>,
        layout: BranchLayout,
        provisioning: Provisioning,
        queue: TaskQueue<PlanJob>,
    ) -> Self {
        Self {
            ctx: TaskContext::new(store, clock, layout),
            provisioning,
            queue,
        }
    }

    /// Records a Queued plan for a component and offers it to the worker.
    ///
    /// The plan captures the merge-base with main and the branch head at
    /// request time.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::ChangesetNotFound`],
    /// [`OrchestrationError::Changeset`] when the changeset is not open, or
    /// [`OrchestrationError::ComponentNotFound`].
    pub async fn create_plan(
        &self,
        changeset: &str,
        component_id: ComponentId,
    ) -> OrchestrationResult<Plan> {
        let owner = self.ctx.changeset_by_name(changeset).await?;
        owner.ensure_open()?;

        let mut tx = self.ctx.store().begin(owner.branch()).await?;
        if tx.data().find_component(component_id)?.is_none() {
            return Err(OrchestrationError::ComponentNotFound(component_id));
        }
        let merge_base = self
            .ctx
            .store()
            .merge_base(self.ctx.main(), owner.branch())
            .await?;
        let sequence = tx
            .data()
            .latest_plan_for_component(owner.id(), component_id)?
            .map_or(0, |latest| latest.sequence().saturating_add(1));
        let snapshot = BranchSnapshot::new(merge_base, tx.head().clone());
        let plan = Plan::new(
            owner.id(),
            component_id,
            sequence,
            snapshot,
            self.ctx.clock(),
        );
        tx.data_mut().store_task(&plan)?;
        tx.commit(&format!("queue plan {}", plan.id())).await?;

        info!(changeset = %owner.name(), plan = %plan.id(), component = %component_id, "queued plan");
        self.queue.enqueue(PlanJob {
            plan_id: plan.id(),
            branch: owner.branch().clone(),
        });
        Ok(plan)
    }

    /// Returns a plan of the changeset.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::TaskNotFound`] when the plan does not
    /// exist.
    pub async fn get_plan(&self, changeset: &str, plan_id: PlanId) -> OrchestrationResult<Plan> {
        let owner = self.ctx.changeset_by_name(changeset).await?;
        self.ctx.fetch(self.ctx.task_branch(&owner), plan_id).await
    }

    /// Returns every plan of the changeset, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::ChangesetNotFound`] when the changeset
    /// does not exist.
    pub async fn list_plans(&self, changeset: &str) -> OrchestrationResult<Vec<Plan>> {
        let owner = self.ctx.changeset_by_name(changeset).await?;
        let snapshot = self.ctx.store().checkout(self.ctx.task_branch(&owner)).await?;
        Ok(snapshot.data().tasks_for_changeset(owner.id())?)
    }

    /// Runs a Queued plan to completion.
    ///
    /// On success the plan records its resource counts, becomes Succeeded and
    /// gains a Queued apply. Any failure after the plan started marks it
    /// Failed.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::Task`] when the plan is not Queued,
    /// [`OrchestrationError::IdentityMismatch`] when the stored record
    /// disagrees with `plan_id`, and otherwise the first failure, wrapped in
    /// [`OrchestrationError::Compensation`] when marking the plan Failed also
    /// failed.
    #[instrument(skip(self, deadline), fields(kind = %TaskKind::Plan))]
    pub async fn run_plan(
        &self,
        plan_id: PlanId,
        branch: &BranchName,
        deadline: Deadline,
    ) -> OrchestrationResult<Plan> {
        let plan: Plan = self
            .ctx
            .transition(branch, plan_id, TaskState::Started)
            .await?;
        let result = self.execute(&plan, branch, deadline).await;
        compensate(result, || self.ctx.mark_failed::<Plan>(branch, plan_id)).await
    }

    /// Runs a Queued plan of the named changeset.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::ChangesetNotFound`] and otherwise the
    /// errors of [`PlanService::run_plan`].
    pub async fn run_changeset_plan(
        &self,
        changeset: &str,
        plan_id: PlanId,
        deadline: Deadline,
    ) -> OrchestrationResult<Plan> {
        let owner = self.ctx.changeset_by_name(changeset).await?;
        self.run_plan(plan_id, owner.branch(), deadline).await
    }

    async fn execute(
        &self,
        plan: &Plan,
        branch: &BranchName,
        deadline: Deadline,
    ) -> OrchestrationResult<Plan> {
        let component = self.component_at_head(plan).await?;
        let output = self.invoke_executor(plan, &component, deadline).await?;
        deadline
            .bound(
                self.provisioning
                    .plan_store()
                    .store_plan(plan.id(), &output.artifact),
            )
            .await?;

        let mut tx = self.ctx.store().begin(branch).await?;
        let mut finished: Plan = tx
            .data()
            .find_task(plan.id())?
            .ok_or_else(|| OrchestrationError::not_found(TaskKind::Plan, plan.id()))?;
        ensure_identity(plan.id(), &finished)?;
        finished.record_counts(output.counts);
        finished.transition_to(TaskState::Succeeded, self.ctx.clock())?;
        tx.data_mut().update_task(&finished)?;
        let apply = Apply::for_plan(&finished, self.ctx.clock());
        tx.data_mut().store_apply(&apply)?;
        tx.commit(&format!("plan {} succeeded", plan.id())).await?;

        info!(
            plan = %plan.id(),
            apply = %apply.id(),
            add = output.counts.add,
            change = output.counts.change,
            destroy = output.counts.destroy,
            "plan succeeded"
        );
        Ok(finished)
    }

    async fn component_at_head(&self, plan: &Plan) -> OrchestrationResult<Component> {
        let component_id = plan.component_id();
        let snapshot = self
            .ctx
            .store()
            .checkout_commit(plan.snapshot().head())
            .await?;
        snapshot
            .data()
            .find_component(component_id)?
            .ok_or(OrchestrationError::ComponentNotFound(component_id))
    }

    async fn invoke_executor(
        &self,
        plan: &Plan,
        component: &Component,
        deadline: Deadline,
    ) -> OrchestrationResult<PlanOutput> {
        let log = self
            .provisioning
            .log_store()
            .new_log_writer(OperationKind::Plan, plan.id().into_inner())?;
        let work_dir = self.provisioning.work_dir(TaskKind::Plan, plan.id());
        let mut executor = self
            .provisioning
            .executors()
            .create(component, &work_dir, log)?;

        let output = deadline
            .bound(async {
                executor.init().await?;
                executor.plan().await
            })
            .await;
        if let Err(err) = executor.close().await {
            warn!(plan = %plan.id(), error = %err, "failed to close executor");
        }
        output
    }
}

#[async_trait]
impl<S, C> TaskRunner for PlanService<S, C>
where
    S: VersionedStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    type Job = PlanJob;

    fn kind(&self) -> TaskKind {
        TaskKind::Plan
    }

    async fn run(&self, job: PlanJob, deadline: Deadline) -> OrchestrationResult<()> {
        self.run_plan(job.plan_id, &job.branch, deadline)
            .await
            .map(|_| ())
    }

    async fn queued(&self) -> OrchestrationResult<Vec<PlanJob>> {
        let mut jobs = Vec::new();
        for owner in self.ctx.open_changesets().await? {
            let snapshot = self.ctx.store().checkout(owner.branch()).await?;
            let plans: Vec<Plan> = snapshot.data().tasks_in_state(TaskState::Queued)?;
            jobs.extend(plans.into_iter().map(|plan| PlanJob {
                plan_id: plan.id(),
                branch: owner.branch().clone(),
            }));
        }
        Ok(jobs)
    }

    async fn recover_interrupted(&self) -> OrchestrationResult<usize> {
        let mut aborted = 0;
        for owner in self.ctx.open_changesets().await? {
            aborted += self.ctx.abort_started::<Plan>(owner.branch()).await?;
        }
        Ok(aborted)
    }
}
