//! Worker loop shared by the four task families.

use super::TaskIntake;
use crate::task::{
    domain::TaskKind,
    services::{Deadline, OrchestrationResult},
};
use async_trait::async_trait;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Executes tasks of one family on behalf of a [`TaskWorker`].
#[async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    /// Work item identifying one task.
    type Job: Display + Send + 'static;

    /// Task family served by this runner.
    fn kind(&self) -> TaskKind;

    /// Drives one task to a terminal state within `deadline`.
    async fn run(&self, job: Self::Job, deadline: Deadline) -> OrchestrationResult<()>;

    /// Returns every task still waiting in Queued.
    async fn queued(&self) -> OrchestrationResult<Vec<Self::Job>>;

    /// Moves tasks left Started by a previous process to Aborted.
    ///
    /// Returns how many tasks were aborted.
    async fn recover_interrupted(&self) -> OrchestrationResult<usize>;
}

/// Background loop dispatching one task family.
pub struct TaskWorker<R: TaskRunner> {
    runner: Arc<R>,
    intake: TaskIntake<R::Job>,
    recovery_interval: Duration,
    task_deadline: Duration,
}

impl<R: TaskRunner> TaskWorker<R> {
    /// Creates a worker reading jobs from `intake`.
    #[must_use]
    pub const fn new(
        runner: Arc<R>,
        intake: TaskIntake<R::Job>,
        recovery_interval: Duration,
        task_deadline: Duration,
    ) -> Self {
        Self {
            runner,
            intake,
            recovery_interval,
            task_deadline,
        }
    }

    /// Launches the worker loop.
    ///
    /// Interrupted tasks are aborted once, then a recovery sweep runs
    /// immediately and every `recovery_interval` afterwards. The loop exits
    /// when `shutdown` is cancelled; dispatched tasks keep running until
    /// their deadline.
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        let kind = self.runner.kind();
        tokio::spawn(self.run_loop(shutdown).instrument(info_span!("task_worker", %kind)))
    }

    async fn run_loop(mut self, shutdown: CancellationToken) {
        self.abort_interrupted().await;

        let mut ticker = interval(self.recovery_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut intake_open = true;

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!("worker stopping");
                    break;
                }
                received = self.intake.recv(), if intake_open => match received {
                    Some(job) => self.dispatch(job),
                    None => {
                        debug!("task queue closed, relying on recovery sweep");
                        intake_open = false;
                    }
                },
                _ = ticker.tick() => self.sweep().await,
            }
        }
    }

    async fn abort_interrupted(&self) {
        match self.runner.recover_interrupted().await {
            Ok(0) => {}
            Ok(count) => warn!(count, "aborted tasks interrupted by a restart"),
            Err(err) => error!(error = %err, "failed to abort interrupted tasks"),
        }
    }

    async fn sweep(&self) {
        match self.runner.queued().await {
            Ok(jobs) => {
                debug!(count = jobs.len(), "recovery sweep");
                for job in jobs {
                    self.dispatch(job);
                }
            }
            Err(err) => error!(error = %err, "recovery sweep failed"),
        }
    }

    fn dispatch(&self, job: R::Job) {
        let task_runner = Arc::clone(&self.runner);
        let deadline = Deadline::after(self.task_deadline);
        let span = info_span!("dispatch", kind = %task_runner.kind(), job = %job);
        tokio::spawn(
            async move {
                match task_runner.run(job, deadline).await {
                    Ok(()) => info!("task finished"),
                    Err(err) if err.is_user_error() => warn!(error = %err, "task not run"),
                    Err(err) => error!(error = %err, "task failed"),
                }
            }
            .instrument(span),
        );
    }
}
