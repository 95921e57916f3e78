//! Shared world state for changeset flow BDD scenarios.

use std::sync::Arc;

use changeyard::{
    changeset::domain::Component,
    config::OrchestratorConfig,
    facade::Facade,
    task::{
        adapters::memory::{
            InMemoryLogStore, InMemoryPlanStore, ModuleDefinition, ScriptedExecutorFactory,
        },
        domain::{ApplyId, Merge, Plan, TaskRecord},
        services::RemovalSummary,
    },
    versioning::{adapters::memory::InMemoryVersionedStore, domain::BranchName},
};
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest::fixture;

/// Facade type used by the BDD world.
pub type TestFacade = Facade<InMemoryVersionedStore, DefaultClock>;

/// Scenario world for changeset flow behaviour tests.
pub struct FlowWorld {
    pub facade: TestFacade,
    pub store: Arc<InMemoryVersionedStore>,
    pub plan_store: Arc<InMemoryPlanStore>,
    pub log_store: Arc<InMemoryLogStore>,
    pub component: Option<Component>,
    pub plans: Vec<Plan>,
    pub applies: Vec<ApplyId>,
    pub merges: Vec<(String, Merge)>,
    pub removal: Option<RemovalSummary>,
}

impl FlowWorld {
    /// Creates a world around a facade with the default configuration and a
    /// scripted executor that knows `modules/web`.
    ///
    /// # Panics
    ///
    /// Panics when the default configuration cannot be composed.
    #[must_use]
    pub fn new() -> Self {
        let config = OrchestratorConfig::default();
        let main = BranchName::new(config.main_branch.clone()).expect("default main branch");
        let store = Arc::new(InMemoryVersionedStore::new(main).expect("store initialises"));
        let plan_store = Arc::new(InMemoryPlanStore::new());
        let log_store = Arc::new(InMemoryLogStore::new());
        let executors = ScriptedExecutorFactory::new()
            .with_module("modules/web", ModuleDefinition::new("aws_instance"));
        let facade = Facade::new(
            &config,
            Arc::clone(&store),
            Arc::new(DefaultClock),
            Arc::new(executors),
            Arc::clone(&plan_store) as _,
            Arc::clone(&log_store) as _,
        )
        .expect("facade composes");

        Self {
            facade,
            store,
            plan_store,
            log_store,
            component: None,
            plans: Vec::new(),
            applies: Vec::new(),
            merges: Vec::new(),
            removal: None,
        }
    }

    /// Returns the component the scenario operates on.
    ///
    /// # Errors
    ///
    /// Returns an error when no component was created yet.
    pub fn component(&self) -> Result<Component, eyre::Report> {
        self.component
            .clone()
            .ok_or_else(|| eyre::eyre!("missing component in scenario world"))
    }

    /// Creates and runs a plan of the scenario component, recording the
    /// stored result.
    ///
    /// # Errors
    ///
    /// Returns an error when the plan cannot be created or read back; a
    /// failed run is recorded rather than returned.
    pub fn plan(&mut self, changeset: &str) -> Result<Plan, eyre::Report> {
        let component = self.component()?;
        let queued = run_async(self.facade.create_plan(changeset, component.id()))
            .wrap_err("create plan")?;
        let _outcome = run_async(self.facade.run_plan(changeset, queued.id()));
        let plan = run_async(self.facade.get_plan(changeset, queued.id())).wrap_err("read plan")?;
        self.plans.push(plan.clone());
        Ok(plan)
    }

    /// Creates and runs a merge, recording the stored result.
    ///
    /// # Errors
    ///
    /// Returns an error when the merge cannot be created, run or read back.
    pub fn merge(&mut self, changeset: &str) -> Result<Merge, eyre::Report> {
        let queued = run_async(self.facade.create_merge(changeset)).wrap_err("create merge")?;
        run_async(self.facade.run_merge(queued.id())).wrap_err("run merge")?;
        let merge = run_async(self.facade.get_merge(queued.id())).wrap_err("read merge")?;
        self.merges.push((changeset.to_owned(), merge.clone()));
        Ok(merge)
    }

    /// Returns merges recorded for `changeset` in request order.
    pub fn merges_of<'a>(&'a self, changeset: &'a str) -> impl Iterator<Item = &'a Merge> + 'a {
        self.merges
            .iter()
            .filter(move |(name, _)| name == changeset)
            .map(|(_, merge)| merge)
    }
}

impl Default for FlowWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> FlowWorld {
    FlowWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
