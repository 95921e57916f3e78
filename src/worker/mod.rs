//! Background execution of queued tasks.
//!
//! Each task family gets one [`TaskWorker`] fed by two producers: a bounded
//! push queue filled when tasks are created, and a periodic recovery sweep
//! that re-reads Queued tasks from the store. The queue only lowers latency;
//! the sweep is what guarantees every task eventually runs.

mod pool;
mod queue;

pub use pool::{TaskRunner, TaskWorker};
pub use queue::{TaskIntake, TaskQueue, task_queue};
