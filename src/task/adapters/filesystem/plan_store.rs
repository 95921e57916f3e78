//! Plan artifacts stored as one file per plan.

use super::{ignore_missing, open_root};
use crate::task::{
    domain::PlanId,
    ports::{PlanArtifact, PlanStore, PlanStoreError, PlanStoreResult},
};
use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::fs_utf8::Dir;
use std::io;
use std::sync::Arc;

/// Stores plan artifacts under `<root>/plans/<plan-id>.plan`.
#[derive(Debug, Clone)]
pub struct FsPlanStore {
    dir: Arc<Dir>,
}

impl FsPlanStore {
    /// Opens the store, creating `<root>/plans` when missing.
    ///
    /// # Errors
    ///
    /// Returns [`PlanStoreError::Persistence`] when the directory cannot be
    /// created or opened.
    pub fn open(root: &Utf8Path) -> PlanStoreResult<Self> {
        let dir = open_root(root, "plans").map_err(PlanStoreError::persistence)?;
        Ok(Self { dir: Arc::new(dir) })
    }

    fn file_name(plan: PlanId) -> String {
        format!("{plan}.plan")
    }
}

#[async_trait]
impl PlanStore for FsPlanStore {
    async fn store_plan(&self, plan: PlanId, artifact: &PlanArtifact) -> PlanStoreResult<()> {
        self.dir
            .write(Self::file_name(plan), artifact.as_bytes())
            .map_err(PlanStoreError::persistence)
    }

    async fn load_plan(&self, plan: PlanId) -> PlanStoreResult<PlanArtifact> {
        match self.dir.read(Self::file_name(plan)) {
            Ok(bytes) => Ok(PlanArtifact::new(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(PlanStoreError::NotFound(plan)),
            Err(err) => Err(PlanStoreError::persistence(err)),
        }
    }

    async fn delete_plan(&self, plan: PlanId) -> PlanStoreResult<()> {
        ignore_missing(self.dir.remove_file(Self::file_name(plan))).map_err(PlanStoreError::persistence)
    }

    async fn has_plan(&self, plan: PlanId) -> PlanStoreResult<bool> {
        Ok(self.dir.exists(Self::file_name(plan)))
    }
}
