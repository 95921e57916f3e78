//! Apply orchestration.
//!
//! Applies are created by successful plans and run on main once their
//! changeset has merged.

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
    domain::{
        Apply, ApplyId, Plan, ResourceRecord, StateRecord, TaskKind, TaskRecord, TaskState,
    },
    ports::{
        ApplyOutput, OperationKind, PlanArtifact, ResourceRepository, ResourceRepositoryMut,
        TaskRepository, TaskRepositoryMut,
    },
};
use crate::versioning::ports::VersionedStore;
use crate::worker::TaskRunner;
use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Runs and reads applies.
#[derive(Clone)]
pub struct ApplyService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    ctx: TaskContext<S, C>,
    provisioning: Provisioning,
}

impl<S, C> ApplyService<S, C>
where
    S: VersionedStore,
    C: Clock + Send + Sync,
{
    /// Creates an apply service.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        clock: Arc<C>,
        layout: BranchLayout,
        provisioning: Provisioning,
    ) -> Self {
        Self {
            ctx: TaskContext::new(store, clock, layout),
            provisioning,
        }
    }

    /// Returns an apply of the changeset.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::TaskNotFound`] when the apply does not
    /// exist.
    pub async fn get_apply(&self, changeset: &str, apply_id: ApplyId) -> OrchestrationResult<Apply> {
        let owner = self.ctx.changeset_by_name(changeset).await?;
        self.ctx.fetch(self.ctx.task_branch(&owner), apply_id).await
    }

    /// Returns every apply of the changeset, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::ChangesetNotFound`] when the changeset
    /// does not exist.
    pub async fn list_applies(&self, changeset: &str) -> OrchestrationResult<Vec<Apply>> {
        let owner = self.ctx.changeset_by_name(changeset).await?;
        let snapshot = self.ctx.store().checkout(self.ctx.task_branch(&owner)).await?;
        Ok(snapshot.data().tasks_for_changeset(owner.id())?)
    }

    /// Returns the latest provisioning state of a component on main.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::Store`] or
    /// [`OrchestrationError::Repository`] when the read fails.
    pub async fn component_state(
        &self,
        component: ComponentId,
    ) -> OrchestrationResult<Option<StateRecord>> {
        let snapshot = self.ctx.store().checkout(self.ctx.main()).await?;
        Ok(snapshot.data().find_state(component)?)
    }

    /// Returns the resources provisioned for a component on main.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::Store`] or
    /// [`OrchestrationError::Repository`] when the read fails.
    pub async fn component_resources(
        &self,
        component: ComponentId,
    ) -> OrchestrationResult<Vec<ResourceRecord>> {
        let snapshot = self.ctx.store().checkout(self.ctx.main()).await?;
        Ok(snapshot.data().list_resources(component)?)
    }

    /// Runs a Queued apply on main.
    ///
    /// The component is resolved as it was when its plan was requested and
    /// the stored plan artifact is applied. Resources and state are recorded
    /// together with the Succeeded transition.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::Task`] when the apply is not Queued,
    /// [`OrchestrationError::IdentityMismatch`] when the stored record
    /// disagrees with `apply_id`, and otherwise the first failure, wrapped in
    /// [`OrchestrationError::Compensation`] when marking the apply Failed
    /// also failed.
    #[instrument(skip(self, deadline), fields(kind = %TaskKind::Apply))]
    pub async fn run_apply(&self, apply_id: ApplyId, deadline: Deadline) -> OrchestrationResult<Apply> {
        let main = self.ctx.main();
        let apply: Apply = self
            .ctx
            .transition(main, apply_id, TaskState::Started)
            .await?;
        let result = self.execute(&apply, deadline).await;
        compensate(result, || self.ctx.mark_failed::<Apply>(main, apply_id)).await
    }

    async fn execute(&self, apply: &Apply, deadline: Deadline) -> OrchestrationResult<Apply> {
        let plan: Plan = self.ctx.fetch(self.ctx.main(), apply.plan_id()).await?;
        let component = self.component_at(&plan).await?;
        let artifact = deadline
            .bound(self.provisioning.plan_store().load_plan(plan.id()))
            .await?;
        let output = self
            .invoke_executor(apply, &component, &artifact, deadline)
            .await?;
        self.record(apply, output).await
    }

    async fn component_at(&self, plan: &Plan) -> OrchestrationResult<Component> {
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
        apply: &Apply,
        component: &Component,
        artifact: &PlanArtifact,
        deadline: Deadline,
    ) -> OrchestrationResult<ApplyOutput> {
        let log = self
            .provisioning
            .log_store()
            .new_log_writer(OperationKind::Apply, apply.id().into_inner())?;
        let work_dir = self.provisioning.work_dir(TaskKind::Apply, apply.id());
        let mut executor = self
            .provisioning
            .executors()
            .create(component, &work_dir, log)?;

        let output = deadline
            .bound(async {
                executor.init().await?;
                executor.apply(artifact).await
            })
            .await;
        if let Err(err) = executor.close().await {
            warn!(apply = %apply.id(), error = %err, "failed to close executor");
        }
        output
    }

    async fn record(&self, apply: &Apply, output: ApplyOutput) -> OrchestrationResult<Apply> {
        let component_id = apply.component_id();
        let resources: Vec<ResourceRecord> = output
            .resources
            .into_iter()
            .map(|resource| {
                ResourceRecord::new(
                    component_id,
                    apply.id(),
                    resource.address,
                    resource.resource_type,
                    resource.attributes,
                )
            })
            .collect();
        let state = StateRecord::new(
            component_id,
            apply.id(),
            output.state,
            output.outputs,
            self.ctx.clock(),
        );

        let mut tx = self.ctx.store().begin(self.ctx.main()).await?;
        let mut finished: Apply = tx
            .data()
            .find_task(apply.id())?
            .ok_or_else(|| OrchestrationError::not_found(TaskKind::Apply, apply.id()))?;
        ensure_identity(apply.id(), &finished)?;
        tx.data_mut().replace_resources(component_id, &resources)?;
        tx.data_mut().store_state(&state)?;
        finished.transition_to(TaskState::Succeeded, self.ctx.clock())?;
        tx.data_mut().update_task(&finished)?;
        tx.commit(&format!("apply {} succeeded", apply.id())).await?;

        info!(apply = %apply.id(), component = %component_id, resources = resources.len(), "apply succeeded");
        Ok(finished)
    }
}

#[async_trait]
impl<S, C> TaskRunner for ApplyService<S, C>
where
    S: VersionedStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    type Job = ApplyId;

    fn kind(&self) -> TaskKind {
        TaskKind::Apply
    }

    async fn run(&self, job: ApplyId, deadline: Deadline) -> OrchestrationResult<()> {
        self.run_apply(job, deadline).await.map(|_| ())
    }

    async fn queued(&self) -> OrchestrationResult<Vec<ApplyId>> {
        let snapshot = self.ctx.store().checkout(self.ctx.main()).await?;
        let applies: Vec<Apply> = snapshot.data().tasks_in_state(TaskState::Queued)?;
        Ok(applies.iter().map(TaskRecord::id).collect())
    }

    async fn recover_interrupted(&self) -> OrchestrationResult<usize> {
        self.ctx.abort_started::<Apply>(self.ctx.main()).await
    }
}
