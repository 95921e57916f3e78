//! In-memory plan artifact store.

use crate::task::{
    domain::PlanId,
    ports::{PlanArtifact, PlanStore, PlanStoreError, PlanStoreResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory plan artifact store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlanStore {
    artifacts: Arc<RwLock<HashMap<PlanId, PlanArtifact>>>,
}

impl InMemoryPlanStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`PlanStoreError::Persistence`] when the lock is poisoned.
    pub fn artifact_count(&self) -> PlanStoreResult<usize> {
        let artifacts = self
            .artifacts
            .read()
            .map_err(|err| PlanStoreError::persistence(std::io::Error::other(err.to_string())))?;
        Ok(artifacts.len())
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn store_plan(&self, plan: PlanId, artifact: &PlanArtifact) -> PlanStoreResult<()> {
        let mut artifacts = self
            .artifacts
            .write()
            .map_err(|err| PlanStoreError::persistence(std::io::Error::other(err.to_string())))?;
        artifacts.insert(plan, artifact.clone());
        Ok(())
    }

    async fn load_plan(&self, plan: PlanId) -> PlanStoreResult<PlanArtifact> {
        let artifacts = self
            .artifacts
            .read()
            .map_err(|err| PlanStoreError::persistence(std::io::Error::other(err.to_string())))?;
        artifacts
            .get(&plan)
            .cloned()
            .ok_or(PlanStoreError::NotFound(plan))
    }

    async fn delete_plan(&self, plan: PlanId) -> PlanStoreResult<()> {
        let mut artifacts = self
            .artifacts
            .write()
            .map_err(|err| PlanStoreError::persistence(std::io::Error::other(err.to_string())))?;
        artifacts.remove(&plan);
        Ok(())
    }

    async fn has_plan(&self, plan: PlanId) -> PlanStoreResult<bool> {
        let artifacts = self
            .artifacts
            .read()
            .map_err(|err| PlanStoreError::persistence(std::io::Error::other(err.to_string())))?;
        Ok(artifacts.contains_key(&plan))
    }
}
