//! Provisioning executor port.
//!
//! An executor drives the external provisioning tool for one component. A
//! fresh executor is built per task by an [`ExecutorFactory`].

use super::LogSink;
use crate::changeset::domain::Component;
use crate::task::domain::ResourceCounts;
use async_trait::async_trait;
use camino::Utf8Path;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Opaque plan produced by [`ProvisioningExecutor::plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanArtifact(Vec<u8>);

impl PlanArtifact {
    /// Wraps serialized plan bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the plan bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the artifact, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Output of a successful plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutput {
    /// Plan to hand to a later apply.
    pub artifact: PlanArtifact,
    /// Resources the plan would add, change and destroy.
    pub counts: ResourceCounts,
}

/// A resource reported by a successful apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredResource {
    /// Provisioning address.
    pub address: String,
    /// Provider resource type.
    pub resource_type: String,
    /// Provider attributes.
    pub attributes: Value,
}

/// Output of a successful apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutput {
    /// Opaque provisioning state.
    pub state: Value,
    /// Module outputs.
    pub outputs: Value,
    /// Resources present after the apply.
    pub resources: Vec<DiscoveredResource>,
}

/// Drives the provisioning tool for one component.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProvisioningExecutor: Send {
    /// Prepares the working directory.
    async fn init(&mut self) -> ExecutorResult<()>;

    /// Computes a plan for the component.
    async fn plan(&mut self) -> ExecutorResult<PlanOutput>;

    /// Applies a previously computed plan.
    async fn apply(&mut self, artifact: &PlanArtifact) -> ExecutorResult<ApplyOutput>;

    /// Releases the working directory.
    async fn close(&mut self) -> ExecutorResult<()>;
}

/// Builds executors.
#[cfg_attr(test, mockall::automock)]
pub trait ExecutorFactory: Send + Sync {
    /// Creates an executor for `component` working in `work_dir` and writing
    /// tool output to `log`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] when the executor cannot be prepared.
    fn create(
        &self,
        component: &Component,
        work_dir: &Utf8Path,
        log: LogSink,
    ) -> ExecutorResult<Box<dyn ProvisioningExecutor>>;
}

/// Errors returned by executor implementations.
#[derive(Debug, Clone, Error)]
pub enum ExecutorError {
    /// Initialisation failed, e.g. because the module cannot be fetched.
    #[error("executor init failed: {0}")]
    Init(String),

    /// Planning failed.
    #[error("executor plan failed: {0}")]
    Plan(String),

    /// Applying failed.
    #[error("executor apply failed: {0}")]
    Apply(String),

    /// Generic runtime failure.
    #[error("executor runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl ExecutorError {
    /// Wraps a runtime error from the executor adapter.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
