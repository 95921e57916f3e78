//! Plan artifact store port.

use super::PlanArtifact;
use crate::task::domain::PlanId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for plan store operations.
pub type PlanStoreResult<T> = Result<T, PlanStoreError>;

/// Persists plan artifacts between plan and apply.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Stores the artifact of a plan, replacing any previous one.
    async fn store_plan(&self, plan: PlanId, artifact: &PlanArtifact) -> PlanStoreResult<()>;

    /// Loads the artifact of a plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlanStoreError::NotFound`] when nothing was stored.
    async fn load_plan(&self, plan: PlanId) -> PlanStoreResult<PlanArtifact>;

    /// Deletes the artifact of a plan. Deleting a missing artifact succeeds.
    async fn delete_plan(&self, plan: PlanId) -> PlanStoreResult<()>;

    /// Returns whether an artifact exists for the plan.
    async fn has_plan(&self, plan: PlanId) -> PlanStoreResult<bool>;
}

/// Errors returned by plan store implementations.
#[derive(Debug, Clone, Error)]
pub enum PlanStoreError {
    /// No artifact exists for the plan.
    #[error("plan artifact not found: {0}")]
    NotFound(PlanId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl PlanStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
