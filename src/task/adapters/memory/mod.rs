//! In-memory task adapters.

mod executor;
mod log_store;
mod plan_store;

pub use executor::{ModuleDefinition, ScriptedExecutorFactory};
pub use log_store::InMemoryLogStore;
pub use plan_store::InMemoryPlanStore;
