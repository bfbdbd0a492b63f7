//! Job infrastructure for background command execution.
//!
//! - [`PostgresJobQueue`] - durable Postgres-backed queue with at-least-once
//!   delivery and a bounded retry budget
//! - [`JobRegistry`] - job_type → typed handler dispatch
//! - [`JobRunner`] - long-running service that claims and executes jobs
//!
//! Business logic stays in domains; this module only moves jobs.

mod job;
mod queue;
mod registry;
mod runner;

pub use job::{Job, JobStatus};
pub use queue::{
    enqueue_command, ClaimedJob, CommandMeta, JobQueue, PostgresJobQueue, RetryPolicy,
};
pub use registry::{JobRegistry, SharedJobRegistry};
pub use runner::{JobRunner, JobRunnerConfig};
