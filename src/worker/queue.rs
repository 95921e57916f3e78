//! Bounded, non-blocking push queue.

use crate::task::domain::TaskKind;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Producer half of a task queue.
#[derive(Debug)]
pub struct TaskQueue<J> {
    kind: TaskKind,
    sender: mpsc::Sender<J>,
}

impl<J> Clone for TaskQueue<J> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            sender: self.sender.clone(),
        }
    }
}

/// Consumer half of a task queue, owned by a [`super::TaskWorker`].
#[derive(Debug)]
pub struct TaskIntake<J> {
    kind: TaskKind,
    receiver: mpsc::Receiver<J>,
}

/// Creates a queue holding at most `capacity` pending jobs.
///
/// A capacity of zero is raised to one.
#[must_use]
pub fn task_queue<J>(kind: TaskKind, capacity: usize) -> (TaskQueue<J>, TaskIntake<J>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        TaskQueue { kind, sender },
        TaskIntake { kind, receiver },
    )
}

impl<J> TaskQueue<J> {
    /// Returns the task family this queue carries.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Offers `job` to the worker without waiting.
    ///
    /// Returns `false` when the job was dropped because the queue is full or
    /// the worker has stopped; the recovery sweep picks it up later.
    pub fn enqueue(&self, job: J) -> bool {
        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(kind = %self.kind, "task queue full, deferring to recovery sweep");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(kind = %self.kind, "task queue closed, job dropped");
                false
            }
        }
    }
}

impl<J> TaskIntake<J> {
    /// Returns the task family this intake carries.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Takes the next pending job without waiting.
    pub fn try_next(&mut self) -> Option<J> {
        self.receiver.try_recv().ok()
    }

    pub(super) async fn recv(&mut self) -> Option<J> {
        self.receiver.recv().await
    }
}
