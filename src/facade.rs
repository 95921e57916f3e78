//! Single entry point for presentation layers.
//!
//! [`Facade`] composes one service per task family around a shared store and
//! clock, wires the push queues between them and launches the four worker
//! loops on [`Facade::start`]. The services stay independently usable
//! through the accessors.

use crate::changeset::{
    domain::{Changeset, Component, ComponentId, ReviewState, Variables},
    services::{ChangesetService, ChangesetServiceResult, ComponentService, CreateComponentRequest},
};
use crate::config::{ConfigError, OrchestratorConfig};
use crate::task::{
    domain::{
        Apply, ApplyId, Merge, MergeId, MergeOutcome, Plan, PlanId, Rebase, RebaseId, TaskKind,
    },
    ports::{ExecutorFactory, LogStore, PlanStore},
    services::{
        ApplyService, ChangesetRemovalService, Deadline, MergeService, OrchestrationError,
        OrchestrationResult, PlanJob, PlanService, Provisioning, RebaseService, RemovalSummary,
    },
};
use crate::versioning::ports::VersionedStore;
use crate::worker::{TaskIntake, TaskRunner, TaskWorker, task_queue};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

struct Intakes {
    plans: TaskIntake<PlanJob>,
    applies: TaskIntake<ApplyId>,
    merges: TaskIntake<MergeId>,
    rebases: TaskIntake<RebaseId>,
}

/// Every changeyard use case behind one value.
pub struct Facade<S, C>
where
    S: VersionedStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    changesets: ChangesetService<S, C>,
    components: ComponentService<S, C>,
    plans: Arc<PlanService<S, C>>,
    applies: Arc<ApplyService<S, C>>,
    merges: Arc<MergeService<S, C>>,
    rebases: Arc<RebaseService<S, C>>,
    removal: ChangesetRemovalService<S, C>,
    intakes: Option<Intakes>,
    recovery_interval: Duration,
    task_deadline: Duration,
}

impl<S, C> Facade<S, C>
where
    S: VersionedStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Composes the services described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration is invalid.
    pub fn new(
        config: &OrchestratorConfig,
        store: Arc<S>,
        clock: Arc<C>,
        executors: Arc<dyn ExecutorFactory>,
        plan_store: Arc<dyn PlanStore>,
        log_store: Arc<dyn LogStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = config.branch_layout()?;
        let provisioning =
            Provisioning::new(executors, plan_store, log_store, config.work_root.clone());

        let (plan_queue, plan_intake) = task_queue(TaskKind::Plan, config.queue_capacity);
        let (apply_queue, apply_intake) = task_queue(TaskKind::Apply, config.queue_capacity);
        let (merge_queue, merge_intake) = task_queue(TaskKind::Merge, config.queue_capacity);
        let (rebase_queue, rebase_intake) = task_queue(TaskKind::Rebase, config.queue_capacity);

        let changesets =
            ChangesetService::new(Arc::clone(&store), Arc::clone(&clock), layout.clone());
        let components =
            ComponentService::new(Arc::clone(&store), Arc::clone(&clock), layout.clone());
        let plans = PlanService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            layout.clone(),
            provisioning.clone(),
            plan_queue,
        );
        let applies = ApplyService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            layout.clone(),
            provisioning.clone(),
        );
        let merges = MergeService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            layout.clone(),
            provisioning.clone(),
            merge_queue,
            apply_queue,
        );
        let rebases = RebaseService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            layout.clone(),
            rebase_queue,
        );
        let removal = ChangesetRemovalService::new(store, clock, layout, provisioning);

        Ok(Self {
            changesets,
            components,
            plans: Arc::new(plans),
            applies: Arc::new(applies),
            merges: Arc::new(merges),
            rebases: Arc::new(rebases),
            removal,
            intakes: Some(Intakes {
                plans: plan_intake,
                applies: apply_intake,
                merges: merge_intake,
                rebases: rebase_intake,
            }),
            recovery_interval: config.recovery_interval(),
            task_deadline: config.task_deadline(),
        })
    }

    /// Launches the plan, apply, merge and rebase worker loops.
    ///
    /// Each loop stops when `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::AlreadyStarted`] on a second call.
    pub fn start(&mut self, shutdown: &CancellationToken) -> OrchestrationResult<Vec<JoinHandle<()>>> {
        let intakes = self.intakes.take().ok_or(OrchestrationError::AlreadyStarted)?;
        let handles = vec![
            self.spawn(Arc::clone(&self.plans), intakes.plans, shutdown),
            self.spawn(Arc::clone(&self.applies), intakes.applies, shutdown),
            self.spawn(Arc::clone(&self.merges), intakes.merges, shutdown),
            self.spawn(Arc::clone(&self.rebases), intakes.rebases, shutdown),
        ];
        info!(
            recovery_interval = ?self.recovery_interval,
            task_deadline = ?self.task_deadline,
            "started task workers"
        );
        Ok(handles)
    }

    fn spawn<R: TaskRunner>(
        &self,
        runner: Arc<R>,
        intake: TaskIntake<R::Job>,
        shutdown: &CancellationToken,
    ) -> JoinHandle<()> {
        TaskWorker::new(runner, intake, self.recovery_interval, self.task_deadline)
            .start(shutdown.child_token())
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.task_deadline)
    }

    /// Returns the changeset service.
    #[must_use]
    pub const fn changesets(&self) -> &ChangesetService<S, C> {
        &self.changesets
    }

    /// Returns the component service.
    #[must_use]
    pub const fn components(&self) -> &ComponentService<S, C> {
        &self.components
    }

    /// Returns the plan service.
    #[must_use]
    pub fn plans(&self) -> &PlanService<S, C> {
        &self.plans
    }

    /// Returns the apply service.
    #[must_use]
    pub fn applies(&self) -> &ApplyService<S, C> {
        &self.applies
    }

    /// Returns the merge service.
    #[must_use]
    pub fn merges(&self) -> &MergeService<S, C> {
        &self.merges
    }

    /// Returns the rebase service.
    #[must_use]
    pub fn rebases(&self) -> &RebaseService<S, C> {
        &self.rebases
    }

    /// Returns the changeset removal service.
    #[must_use]
    pub const fn removal(&self) -> &ChangesetRemovalService<S, C> {
        &self.removal
    }

    /// See [`ChangesetService::create`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn create_changeset(&self, name: &str) -> ChangesetServiceResult<Changeset> {
        self.changesets.create(name).await
    }

    /// See [`ChangesetService::get`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn get_changeset(&self, name: &str) -> ChangesetServiceResult<Changeset> {
        self.changesets.get(name).await
    }

    /// See [`ChangesetService::list`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn list_changesets(&self) -> ChangesetServiceResult<Vec<Changeset>> {
        self.changesets.list().await
    }

    /// See [`ChangesetService::update_review_state`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn update_review_state(
        &self,
        name: &str,
        target: ReviewState,
    ) -> ChangesetServiceResult<Changeset> {
        self.changesets.update_review_state(name, target).await
    }

    /// See [`ChangesetService::close`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn close_changeset(&self, name: &str) -> ChangesetServiceResult<Changeset> {
        self.changesets.close(name).await
    }

    /// See [`ChangesetRemovalService::delete_changeset`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn delete_changeset(&self, name: &str) -> OrchestrationResult<RemovalSummary> {
        self.removal.delete_changeset(name).await
    }

    /// See [`ComponentService::create`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn create_component(
        &self,
        changeset: &str,
        request: CreateComponentRequest,
    ) -> ChangesetServiceResult<Component> {
        self.components.create(changeset, request).await
    }

    /// See [`ComponentService::update`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn update_component(
        &self,
        changeset: &str,
        id: ComponentId,
        variables: Variables,
    ) -> ChangesetServiceResult<Component> {
        self.components.update(changeset, id, variables).await
    }

    /// See [`ComponentService::get`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn get_component(
        &self,
        changeset: &str,
        id: ComponentId,
    ) -> ChangesetServiceResult<Component> {
        self.components.get(changeset, id).await
    }

    /// See [`ComponentService::list`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn list_components(&self, changeset: &str) -> ChangesetServiceResult<Vec<Component>> {
        self.components.list(changeset).await
    }

    /// See [`PlanService::create_plan`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn create_plan(
        &self,
        changeset: &str,
        component: ComponentId,
    ) -> OrchestrationResult<Plan> {
        self.plans.create_plan(changeset, component).await
    }

    /// See [`PlanService::get_plan`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn get_plan(&self, changeset: &str, plan: PlanId) -> OrchestrationResult<Plan> {
        self.plans.get_plan(changeset, plan).await
    }

    /// See [`PlanService::list_plans`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn list_plans(&self, changeset: &str) -> OrchestrationResult<Vec<Plan>> {
        self.plans.list_plans(changeset).await
    }

    /// Runs a plan now with the configured deadline.
    ///
    /// # Errors
    ///
    /// See [`PlanService::run_plan`].
    pub async fn run_plan(&self, changeset: &str, plan: PlanId) -> OrchestrationResult<Plan> {
        self.plans
            .run_changeset_plan(changeset, plan, self.deadline())
            .await
    }

    /// See [`ApplyService::get_apply`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn get_apply(&self, changeset: &str, apply: ApplyId) -> OrchestrationResult<Apply> {
        self.applies.get_apply(changeset, apply).await
    }

    /// See [`ApplyService::list_applies`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn list_applies(&self, changeset: &str) -> OrchestrationResult<Vec<Apply>> {
        self.applies.list_applies(changeset).await
    }

    /// Runs an apply now with the configured deadline.
    ///
    /// # Errors
    ///
    /// See [`ApplyService::run_apply`].
    pub async fn run_apply(&self, apply: ApplyId) -> OrchestrationResult<Apply> {
        self.applies.run_apply(apply, self.deadline()).await
    }

    /// See [`MergeService::create_merge`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn create_merge(&self, changeset: &str) -> OrchestrationResult<Merge> {
        self.merges.create_merge(changeset).await
    }

    /// See [`MergeService::get_merge`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn get_merge(&self, merge: MergeId) -> OrchestrationResult<Merge> {
        self.merges.get_merge(merge).await
    }

    /// See [`MergeService::list_merges`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn list_merges(&self, changeset: &str) -> OrchestrationResult<Vec<Merge>> {
        self.merges.list_merges(changeset).await
    }

    /// Runs a merge now with the configured deadline.
    ///
    /// # Errors
    ///
    /// See [`MergeService::run_merge`].
    pub async fn run_merge(&self, merge: MergeId) -> OrchestrationResult<MergeOutcome> {
        self.merges.run_merge(merge, self.deadline()).await
    }

    /// See [`RebaseService::create_rebase`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn create_rebase(&self, changeset: &str) -> OrchestrationResult<Rebase> {
        self.rebases.create_rebase(changeset).await
    }

    /// See [`RebaseService::get_rebase`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn get_rebase(&self, rebase: RebaseId) -> OrchestrationResult<Rebase> {
        self.rebases.get_rebase(rebase).await
    }

    /// See [`RebaseService::list_rebases`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn list_rebases(&self, changeset: &str) -> OrchestrationResult<Vec<Rebase>> {
        self.rebases.list_rebases(changeset).await
    }

    /// Runs a rebase now with the configured deadline.
    ///
    /// # Errors
    ///
    /// See [`RebaseService::run_rebase`].
    pub async fn run_rebase(&self, rebase: RebaseId) -> OrchestrationResult<Rebase> {
        self.rebases.run_rebase(rebase, self.deadline()).await
    }
}
