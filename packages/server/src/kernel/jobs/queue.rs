//! Durable job queue over PostgreSQL.
//!
//! Delivery is at-least-once: a job is leased to one worker at a time, and
//! a crashed worker's lease expires back into the claimable set. Consumers
//! must tolerate re-execution.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::job::Job;

/// Default lease on a claimed job before it is considered abandoned.
const DEFAULT_LEASE_MS: i64 = 60_000;

/// Metadata for typed job payloads.
pub trait CommandMeta {
    /// The job type string (registry dispatch key).
    fn command_type(&self) -> &'static str;

    /// Total attempts before the job is dropped.
    fn max_attempts(&self) -> i32 {
        3
    }
}

/// A claimed job ready for execution.
#[derive(Debug)]
pub struct ClaimedJob {
    pub id: Uuid,
    pub job: Job,
}

impl ClaimedJob {
    /// Deserialize the command payload.
    pub fn deserialize<C: DeserializeOwned>(&self) -> Result<C> {
        serde_json::from_value(self.job.args.clone())
            .map_err(|e| anyhow!("failed to deserialize command: {}", e))
    }

    pub fn command_type(&self) -> &str {
        &self.job.job_type
    }
}

/// Retry schedule: a fixed number of total attempts with exponential
/// backoff between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: i32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after attempt number `attempt` failed,
    /// or None once the budget is exhausted.
    pub fn backoff_after(&self, attempt: i32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            None
        } else {
            Some(self.initial_backoff * 2u32.pow((attempt - 1).max(0) as u32))
        }
    }
}

/// Queue operations shared by the submission path and the runner.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job for immediate execution.
    async fn enqueue(
        &self,
        job_type: &str,
        args: serde_json::Value,
        max_attempts: i32,
    ) -> Result<Uuid>;

    /// Claim up to `limit` ready jobs for this worker.
    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>>;

    /// Remove a finished job from the backlog.
    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()>;

    /// Count a failure against the retry budget: reschedule with backoff
    /// while attempts remain, drop the job once they are exhausted.
    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Extend the lease for a running job.
    async fn heartbeat(&self, job_id: Uuid) -> Result<()>;
}

/// Enqueue a typed command.
pub async fn enqueue_command<C>(queue: &dyn JobQueue, command: &C) -> Result<Uuid>
where
    C: CommandMeta + Serialize,
{
    let args = serde_json::to_value(command)?;
    queue
        .enqueue(command.command_type(), args, command.max_attempts())
        .await
}

/// PostgreSQL-backed job queue.
pub struct PostgresJobQueue {
    db: PgPool,
    retry: RetryPolicy,
    lease_ms: i64,
}

impl PostgresJobQueue {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            retry: RetryPolicy::default(),
            lease_ms: DEFAULT_LEASE_MS,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl JobQueue for PostgresJobQueue {
    async fn enqueue(
        &self,
        job_type: &str,
        args: serde_json::Value,
        max_attempts: i32,
    ) -> Result<Uuid> {
        let job = Job::new(job_type, args, max_attempts);
        let inserted = job.insert(&self.db).await?;

        debug!(job_id = %inserted.id, job_type = %job_type, "job enqueued");
        Ok(inserted.id)
    }

    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>> {
        let jobs = Job::claim(limit, worker_id, self.lease_ms, &self.db).await?;

        Ok(jobs
            .into_iter()
            .map(|job| ClaimedJob { id: job.id, job })
            .collect())
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(job_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<()> {
        let Some(job) = Job::find_by_id(job_id, &self.db).await? else {
            warn!(job_id = %job_id, "mark_failed on unknown job");
            return Ok(());
        };

        match self.retry.backoff_after(job.attempt) {
            Some(delay) => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = 'pending',
                        attempt = attempt + 1,
                        next_run_at = NOW() + ($2 || ' milliseconds')::INTERVAL,
                        lease_expires_at = NULL,
                        worker_id = NULL,
                        error_message = $3,
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(job_id)
                .bind((delay.as_millis() as i64).to_string())
                .bind(error)
                .execute(&self.db)
                .await?;

                info!(
                    job_id = %job_id,
                    attempt = job.attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    "job failed, retry scheduled"
                );
            }
            None => {
                // Out of attempts. The task store already holds the terminal
                // failure, so the job is dropped outright.
                sqlx::query("DELETE FROM jobs WHERE id = $1")
                    .bind(job_id)
                    .execute(&self.db)
                    .await?;

                info!(
                    job_id = %job_id,
                    attempts = job.attempt,
                    "job failed, retry budget exhausted"
                );
            }
        }

        Ok(())
    }

    async fn heartbeat(&self, job_id: Uuid) -> Result<()> {
        Job::extend_lease(job_id, self.lease_ms, &self.db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_from_five_seconds() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.backoff_after(1), Some(Duration::from_secs(5)));
        assert_eq!(policy.backoff_after(2), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_backoff_exhausts_after_max_attempts() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.backoff_after(3), None);
        assert_eq!(policy.backoff_after(7), None);
    }

    #[test]
    fn test_claimed_job_deserializes_payload() {
        #[derive(serde::Deserialize)]
        struct Payload {
            name: String,
        }

        let job = Job::new("test_job", serde_json::json!({"name": "example"}), 3);
        let claimed = ClaimedJob { id: job.id, job };

        let payload: Payload = claimed.deserialize().unwrap();
        assert_eq!(payload.name, "example");
        assert_eq!(claimed.command_type(), "test_job");
    }
}
