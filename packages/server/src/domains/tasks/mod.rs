//! Task domain: the (URL, question) unit of work and its processing job.

pub mod model;
pub mod process;

pub use model::{BaseTaskStore, PostgresTaskStore, StoreError, Task, TaskOutcome, TaskStatus};
pub use process::{process_task, register_task_jobs, ProcessError, ProcessTaskJob};
