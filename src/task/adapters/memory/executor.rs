//! Scripted provisioning executor.
//!
//! Modules are registered by source. Planning a component whose module
//! source is unknown fails during init, which mirrors a provisioning tool
//! that cannot fetch its module.

use crate::changeset::domain::Component;
use crate::task::{
    domain::ResourceCounts,
    ports::{
        ApplyOutput, DiscoveredResource, ExecutorError, ExecutorFactory, ExecutorResult, LogSink,
        PlanArtifact, PlanOutput, ProvisioningExecutor,
    },
};
use async_trait::async_trait;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, RwLock};

/// Behaviour of one registered module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDefinition {
    resource_type: String,
    counts: ResourceCounts,
}

impl ModuleDefinition {
    /// Creates a module provisioning one resource of `resource_type`.
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            counts: ResourceCounts::new(1, 0, 0),
        }
    }

    /// Overrides the counts reported by plans.
    #[must_use]
    pub const fn with_counts(mut self, counts: ResourceCounts) -> Self {
        self.counts = counts;
        self
    }
}

/// Builds [`ProvisioningExecutor`]s that simulate registered modules.
#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutorFactory {
    modules: Arc<RwLock<HashMap<String, ModuleDefinition>>>,
}

impl ScriptedExecutorFactory {
    /// Creates a factory with no registered modules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module, returning the factory.
    #[must_use]
    pub fn with_module(self, source: impl Into<String>, module: ModuleDefinition) -> Self {
        self.register(source, module);
        self
    }

    /// Registers or replaces a module.
    pub fn register(&self, source: impl Into<String>, module: ModuleDefinition) {
        if let Ok(mut modules) = self.modules.write() {
            modules.insert(source.into(), module);
        }
    }
}

impl ExecutorFactory for ScriptedExecutorFactory {
    fn create(
        &self,
        component: &Component,
        _work_dir: &Utf8Path,
        log: LogSink,
    ) -> ExecutorResult<Box<dyn ProvisioningExecutor>> {
        let modules = self
            .modules
            .read()
            .map_err(|err| ExecutorError::runtime(std::io::Error::other(err.to_string())))?;
        Ok(Box::new(ScriptedExecutor {
            component: component.clone(),
            module: modules.get(component.module_source().as_str()).cloned(),
            log,
            initialised: false,
        }))
    }
}

#[derive(Serialize, Deserialize)]
struct ScriptedPlan {
    component: String,
    module: String,
    variables: Value,
}

struct ScriptedExecutor {
    component: Component,
    module: Option<ModuleDefinition>,
    log: LogSink,
    initialised: bool,
}

impl ScriptedExecutor {
    fn log_line(&mut self, line: &str) -> ExecutorResult<()> {
        writeln!(self.log, "{line}").map_err(ExecutorError::runtime)
    }

    fn module(&self) -> ExecutorResult<&ModuleDefinition> {
        match (&self.module, self.initialised) {
            (Some(module), true) => Ok(module),
            _ => Err(ExecutorError::runtime(std::io::Error::other(
                "executor used before a successful init",
            ))),
        }
    }

    fn variables(&self) -> ExecutorResult<Value> {
        serde_json::to_value(self.component.variables()).map_err(ExecutorError::runtime)
    }
}

#[async_trait]
impl ProvisioningExecutor for ScriptedExecutor {
    async fn init(&mut self) -> ExecutorResult<()> {
        let source = self.component.module_source().to_string();
        self.log_line(&format!("initialising module {source}"))?;
        if self.module.is_none() {
            self.log_line(&format!("error: module {source} not found"))?;
            return Err(ExecutorError::Init(format!("module source not found: {source}")));
        }
        self.initialised = true;
        Ok(())
    }

    async fn plan(&mut self) -> ExecutorResult<PlanOutput> {
        let counts = self.module()?.counts;
        let plan = ScriptedPlan {
            component: self.component.name().to_string(),
            module: self.component.module_source().to_string(),
            variables: self.variables()?,
        };
        let bytes = serde_json::to_vec(&plan).map_err(ExecutorError::runtime)?;
        self.log_line(&format!(
            "plan: {} to add, {} to change, {} to destroy",
            counts.add, counts.change, counts.destroy
        ))?;
        Ok(PlanOutput {
            artifact: PlanArtifact::new(bytes),
            counts,
        })
    }

    async fn apply(&mut self, artifact: &PlanArtifact) -> ExecutorResult<ApplyOutput> {
        let resource_type = self.module()?.resource_type.clone();
        let plan: ScriptedPlan = serde_json::from_slice(artifact.as_bytes())
            .map_err(|err| ExecutorError::Apply(format!("unreadable plan artifact: {err}")))?;
        if plan.component != self.component.name().as_str() {
            return Err(ExecutorError::Apply(format!(
                "plan artifact belongs to component {}",
                plan.component
            )));
        }

        let address = format!("{resource_type}.{}", plan.component);
        self.log_line(&format!("apply: {address} created"))?;
        Ok(ApplyOutput {
            state: json!({"module": plan.module, "variables": plan.variables.clone()}),
            outputs: json!({"address": address}),
            resources: vec![DiscoveredResource {
                address,
                resource_type,
                attributes: plan.variables,
            }],
        })
    }

    async fn close(&mut self) -> ExecutorResult<()> {
        self.log.flush().map_err(ExecutorError::runtime)
    }
}
