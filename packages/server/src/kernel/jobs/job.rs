//! Job row model for the durable queue.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Queue-side status. Finished jobs (succeeded or out of retries) are
/// deleted rather than kept, so only in-flight states exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
}

/// A queued unit of background work.
#[derive(Debug, Clone, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub job_type: String,
    pub args: serde_json::Value,
    pub status: JobStatus,
    /// 1-based attempt counter; bumped when a failure is rescheduled.
    pub attempt: i32,
    pub max_attempts: i32,
    pub next_run_at: Option<DateTime<Utc>>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub worker_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a job for immediate execution.
    pub fn new(job_type: &str, args: serde_json::Value, max_attempts: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_type: job_type.to_string(),
            args,
            status: JobStatus::Pending,
            attempt: 1,
            max_attempts,
            next_run_at: Some(now),
            lease_expires_at: None,
            worker_id: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Insert the job into the database.
    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        let job = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO jobs (
                id, job_type, args, status, attempt, max_attempts,
                next_run_at, lease_expires_at, worker_id, error_message,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(&self.job_type)
        .bind(&self.args)
        .bind(self.status)
        .bind(self.attempt)
        .bind(self.max_attempts)
        .bind(self.next_run_at)
        .bind(self.lease_expires_at)
        .bind(&self.worker_id)
        .bind(&self.error_message)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await?;

        Ok(job)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let job = sqlx::query_as::<_, Self>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(job)
    }

    /// Claim jobs atomically using FOR UPDATE SKIP LOCKED. Running jobs
    /// whose lease expired are claimable again (crash redelivery).
    pub async fn claim(
        limit: i64,
        worker_id: &str,
        lease_ms: i64,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let jobs = sqlx::query_as::<_, Self>(
            r#"
            WITH next_jobs AS (
                SELECT id
                FROM jobs
                WHERE (status = 'pending' AND (next_run_at IS NULL OR next_run_at <= NOW()))
                   OR (status = 'running' AND lease_expires_at < NOW())
                ORDER BY COALESCE(next_run_at, created_at)
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE jobs
            SET status = 'running',
                lease_expires_at = NOW() + ($2 || ' milliseconds')::INTERVAL,
                worker_id = $3,
                updated_at = NOW()
            WHERE id IN (SELECT id FROM next_jobs)
            RETURNING *
            "#,
        )
        .bind(limit)
        .bind(lease_ms.to_string())
        .bind(worker_id)
        .fetch_all(pool)
        .await?;

        Ok(jobs)
    }

    /// Extend the lease for a running job (heartbeat).
    pub async fn extend_lease(id: Uuid, lease_ms: i64, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET lease_expires_at = NOW() + ($1 || ' milliseconds')::INTERVAL,
                updated_at = NOW()
            WHERE id = $2 AND status = 'running'
            "#,
        )
        .bind(lease_ms.to_string())
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }
}
