//! Port contracts for task orchestration.
//!
//! Ports define infrastructure-agnostic interfaces used by task services:
//! typed repositories over branch datasets, the provisioning executor, and
//! the plan artifact and log stores.

pub mod executor;
pub mod log_store;
pub mod plan_store;
pub mod repository;

pub use executor::{
    ApplyOutput, DiscoveredResource, ExecutorError, ExecutorFactory, ExecutorResult, PlanArtifact,
    PlanOutput, ProvisioningExecutor,
};
pub use log_store::{LogSink, LogStore, LogStoreError, LogStoreResult, OperationKind};
pub use plan_store::{PlanStore, PlanStoreError, PlanStoreResult};
pub use repository::{
    ResourceRepository, ResourceRepositoryMut, TaskRepository, TaskRepositoryMut,
};

#[cfg(test)]
pub use executor::{MockExecutorFactory, MockProvisioningExecutor};
