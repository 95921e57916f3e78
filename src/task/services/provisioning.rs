//! Collaborators that run provisioning tools and keep their output.

use crate::task::{
    domain::TaskKind,
    ports::{ExecutorFactory, LogStore, PlanStore},
};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;

/// Executor factory, artifact store, log store and working directory root
/// shared by the plan, apply, merge and removal services.
#[derive(Clone)]
pub struct Provisioning {
    executors: Arc<dyn ExecutorFactory>,
    plan_store: Arc<dyn PlanStore>,
    log_store: Arc<dyn LogStore>,
    work_root: Utf8PathBuf,
}

impl Provisioning {
    /// Bundles provisioning collaborators.
    #[must_use]
    pub fn new(
        executors: Arc<dyn ExecutorFactory>,
        plan_store: Arc<dyn PlanStore>,
        log_store: Arc<dyn LogStore>,
        work_root: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            executors,
            plan_store,
            log_store,
            work_root: work_root.into(),
        }
    }

    /// Returns the executor factory.
    #[must_use]
    pub fn executors(&self) -> &dyn ExecutorFactory {
        &*self.executors
    }

    /// Returns the plan artifact store.
    #[must_use]
    pub fn plan_store(&self) -> &dyn PlanStore {
        &*self.plan_store
    }

    /// Returns the log store.
    #[must_use]
    pub fn log_store(&self) -> &dyn LogStore {
        &*self.log_store
    }

    /// Returns the root under which executors get working directories.
    #[must_use]
    pub fn work_root(&self) -> &Utf8Path {
        &self.work_root
    }

    pub(crate) fn work_dir(&self, kind: TaskKind, id: impl std::fmt::Display) -> Utf8PathBuf {
        self.work_root.join(kind.as_str()).join(id.to_string())
    }
}
