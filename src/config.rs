//! Orchestrator configuration.
//!
//! Values default to the production settings: a 100-item push queue per
//! task family, a 30-minute recovery sweep and a 30-minute deadline for each
//! dispatched task.

use crate::versioning::domain::{BranchName, VersioningDomainError};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_QUEUE_CAPACITY: usize = 100;
const DEFAULT_RECOVERY_INTERVAL_SECS: u64 = 30 * 60;
const DEFAULT_TASK_DEADLINE_SECS: u64 = 30 * 60;

/// Errors returned while loading or validating configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(String),

    /// A configured branch name is invalid.
    #[error("invalid {field}: {source}")]
    Branch {
        /// Configuration field holding the branch name.
        field: &'static str,
        /// Validation failure.
        source: VersioningDomainError,
    },

    /// The main and admin branches must differ.
    #[error("main and admin branch must differ, both are '{0}'")]
    SharedBranch(String),

    /// A numeric setting must be greater than zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Runtime configuration for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Baseline branch changesets merge into.
    pub main_branch: String,
    /// Branch holding administrative records such as rebases.
    pub admin_branch: String,
    /// Capacity of each task family's push queue.
    pub queue_capacity: usize,
    /// Seconds between recovery sweeps.
    pub recovery_interval_secs: u64,
    /// Seconds a dispatched task may run before it is failed.
    pub task_deadline_secs: u64,
    /// Root directory for executor working directories.
    pub work_root: Utf8PathBuf,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            main_branch: "main".to_owned(),
            admin_branch: "admin".to_owned(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            recovery_interval_secs: DEFAULT_RECOVERY_INTERVAL_SECS,
            task_deadline_secs: DEFAULT_TASK_DEADLINE_SECS,
            work_root: Utf8PathBuf::from("work"),
        }
    }
}

impl OrchestratorConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is malformed or a value is
    /// invalid.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(document).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the push queue capacity.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the recovery sweep interval.
    #[must_use]
    pub const fn with_recovery_interval(mut self, interval: Duration) -> Self {
        self.recovery_interval_secs = interval.as_secs();
        self
    }

    /// Sets the per-task deadline.
    #[must_use]
    pub const fn with_task_deadline(mut self, deadline: Duration) -> Self {
        self.task_deadline_secs = deadline.as_secs();
        self
    }

    /// Sets the executor working directory root.
    #[must_use]
    pub fn with_work_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }

    /// Checks every setting.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.branch_layout()?;
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero("queue_capacity"));
        }
        if self.recovery_interval_secs == 0 {
            return Err(ConfigError::Zero("recovery_interval_secs"));
        }
        if self.task_deadline_secs == 0 {
            return Err(ConfigError::Zero("task_deadline_secs"));
        }
        Ok(())
    }

    /// Returns the validated branch layout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Branch`] for an invalid name or
    /// [`ConfigError::SharedBranch`] when both names are equal.
    pub fn branch_layout(&self) -> Result<BranchLayout, ConfigError> {
        let main = BranchName::new(self.main_branch.as_str()).map_err(|source| {
            ConfigError::Branch {
                field: "main_branch",
                source,
            }
        })?;
        let admin = BranchName::new(self.admin_branch.as_str()).map_err(|source| {
            ConfigError::Branch {
                field: "admin_branch",
                source,
            }
        })?;
        if main == admin {
            return Err(ConfigError::SharedBranch(main.to_string()));
        }
        Ok(BranchLayout { main, admin })
    }

    /// Returns the recovery sweep interval.
    #[must_use]
    pub const fn recovery_interval(&self) -> Duration {
        Duration::from_secs(self.recovery_interval_secs)
    }

    /// Returns the per-task deadline.
    #[must_use]
    pub const fn task_deadline(&self) -> Duration {
        Duration::from_secs(self.task_deadline_secs)
    }
}

/// The two well-known branches of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchLayout {
    main: BranchName,
    admin: BranchName,
}

impl BranchLayout {
    /// Creates a layout from validated names.
    #[must_use]
    pub const fn new(main: BranchName, admin: BranchName) -> Self {
        Self { main, admin }
    }

    /// Baseline branch.
    #[must_use]
    pub const fn main(&self) -> &BranchName {
        &self.main
    }

    /// Administrative branch.
    #[must_use]
    pub const fn admin(&self) -> &BranchName {
        &self.admin
    }

    /// Returns `true` when `name` is one of the reserved branches.
    #[must_use]
    pub fn is_reserved(&self, name: &BranchName) -> bool {
        name == &self.main || name == &self.admin
    }
}
