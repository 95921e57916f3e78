//! Per-dispatch deadline.

use super::{OrchestrationError, OrchestrationResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

/// Point in time after which a task's remaining steps are abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Creates a deadline `budget` from now.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Returns the time left before the deadline.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Returns `true` once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Runs `step`, failing with [`OrchestrationError::DeadlineExceeded`]
    /// when the deadline passes first.
    ///
    /// # Errors
    ///
    /// Returns the step's own error converted into [`OrchestrationError`], or
    /// [`OrchestrationError::DeadlineExceeded`].
    pub async fn bound<F, T, E>(&self, step: F) -> OrchestrationResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<OrchestrationError>,
    {
        match timeout_at(self.at, step).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(OrchestrationError::DeadlineExceeded(self.budget)),
        }
    }
}
