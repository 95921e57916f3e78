//! Shared wiring for in-memory orchestration tests.

use changeyard::{
    changeset::{domain::Component, services::CreateComponentRequest},
    config::OrchestratorConfig,
    facade::Facade,
    task::{
        adapters::memory::{
            InMemoryLogStore, InMemoryPlanStore, ModuleDefinition, ScriptedExecutorFactory,
        },
        domain::{Plan, TaskRecord},
    },
    versioning::{adapters::memory::InMemoryVersionedStore, domain::BranchName},
};
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest::fixture;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Module source the scripted executor knows how to provision.
pub const WEB_MODULE: &str = "modules/web";

/// Facade wired to in-memory adapters.
pub type Orchestrator = Facade<InMemoryVersionedStore, DefaultClock>;

/// A facade plus handles on the adapters behind it.
pub struct Deployment {
    pub facade: Orchestrator,
    pub store: Arc<InMemoryVersionedStore>,
    pub plan_store: Arc<InMemoryPlanStore>,
    pub log_store: Arc<InMemoryLogStore>,
}

/// Builds a deployment from `config`.
///
/// # Errors
///
/// Returns an error when the configuration or the store is invalid.
pub fn deploy(config: &OrchestratorConfig) -> eyre::Result<Deployment> {
    let main = BranchName::new(config.main_branch.clone()).wrap_err("main branch name")?;
    let store = Arc::new(InMemoryVersionedStore::new(main).wrap_err("initialise store")?);
    let plan_store = Arc::new(InMemoryPlanStore::new());
    let log_store = Arc::new(InMemoryLogStore::new());
    let executors =
        ScriptedExecutorFactory::new().with_module(WEB_MODULE, ModuleDefinition::new("aws_instance"));
    let facade = Facade::new(
        config,
        Arc::clone(&store),
        Arc::new(DefaultClock),
        Arc::new(executors),
        Arc::clone(&plan_store) as _,
        Arc::clone(&log_store) as _,
    )
    .wrap_err("compose facade")?;
    Ok(Deployment {
        facade,
        store,
        plan_store,
        log_store,
    })
}

/// Provides a deployment using the default configuration.
#[fixture]
pub fn deployment() -> Deployment {
    deploy(&OrchestratorConfig::default()).expect("default deployment")
}

/// Creates `changeset` holding a `web` component built from `module`.
///
/// # Errors
///
/// Returns an error when either creation fails.
pub async fn changeset_with_web(
    facade: &Orchestrator,
    changeset: &str,
    module: &str,
) -> eyre::Result<Component> {
    facade
        .create_changeset(changeset)
        .await
        .wrap_err("create changeset")?;
    facade
        .create_component(
            changeset,
            CreateComponentRequest::new("web", module).with_variable("size", json!(1)),
        )
        .await
        .wrap_err("create component")
}

/// Creates and immediately runs a plan, returning the stored result.
///
/// # Errors
///
/// Returns an error when the plan cannot be created or read back. A failed
/// run is not an error; inspect the returned plan's state.
pub async fn plan_now(
    facade: &Orchestrator,
    changeset: &str,
    component: &Component,
) -> eyre::Result<Plan> {
    let queued = facade
        .create_plan(changeset, component.id())
        .await
        .wrap_err("create plan")?;
    let _outcome = facade.run_plan(changeset, queued.id()).await;
    facade
        .get_plan(changeset, queued.id())
        .await
        .wrap_err("read plan")
}

/// Polls `check` until it holds or five seconds pass.
///
/// # Errors
///
/// Returns an error when the condition never holds or `check` fails.
pub async fn eventually<F, Fut>(description: &str, mut check: F) -> eyre::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = eyre::Result<bool>>,
{
    let polling = async {
        loop {
            if check().await? {
                return Ok::<(), eyre::Report>(());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), polling)
        .await
        .map_err(|_| eyre::eyre!("timed out waiting for {description}"))?
}
