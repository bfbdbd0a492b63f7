//! Task record and store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

/// Task lifecycle. Transitions run pending → processing → terminal; a queue
/// redelivery re-runs processing and overwrites the same fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One submitted (URL, question) unit of work and its recorded outcome.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub website_url: String,
    pub question: String,
    pub status: TaskStatus,
    pub scraped_content: Option<String>,
    pub ai_answer: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Construct a fresh pending task.
    pub fn new(website_url: &str, question: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            website_url: website_url.to_string(),
            question: question.to_string(),
            status: TaskStatus::Pending,
            scraped_content: None,
            ai_answer: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Terminal outcome of processing. Folding both cases into one variant keeps
/// "completed with answer xor failed with reason" structural.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Completed { content: String, answer: String },
    Failed { reason: String },
}

/// Task persistence failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable task store: atomic create/read/update-by-id.
#[async_trait]
pub trait BaseTaskStore: Send + Sync {
    /// Insert a new pending task.
    async fn create(&self, website_url: &str, question: &str) -> Result<Task, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    /// All tasks, newest first.
    async fn list(&self) -> Result<Vec<Task>, StoreError>;

    /// Mark a task as being worked on. Idempotent under redelivery.
    async fn mark_processing(&self, id: Uuid) -> Result<(), StoreError>;

    /// Record the terminal outcome, overwriting any previous attempt's.
    async fn finish(&self, id: Uuid, outcome: TaskOutcome) -> Result<(), StoreError>;
}

/// PostgreSQL-backed task store.
#[derive(Clone)]
pub struct PostgresTaskStore {
    db: PgPool,
}

impl PostgresTaskStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BaseTaskStore for PostgresTaskStore {
    async fn create(&self, website_url: &str, question: &str) -> Result<Task, StoreError> {
        let task = Task::new(website_url, question);

        let inserted = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (id, website_url, question, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(task.id)
        .bind(&task.website_url)
        .bind(&task.question)
        .bind(task.status)
        .bind(task.created_at)
        .bind(task.updated_at)
        .fetch_one(&self.db)
        .await?;

        Ok(inserted)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(task)
    }

    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let tasks = sqlx::query_as::<_, Task>("SELECT * FROM tasks ORDER BY created_at DESC")
            .fetch_all(&self.db)
            .await?;

        Ok(tasks)
    }

    async fn mark_processing(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'processing',
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn finish(&self, id: Uuid, outcome: TaskOutcome) -> Result<(), StoreError> {
        let result = match outcome {
            TaskOutcome::Completed { content, answer } => {
                sqlx::query(
                    r#"
                    UPDATE tasks
                    SET status = 'completed',
                        scraped_content = $2,
                        ai_answer = $3,
                        error_message = NULL,
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(content)
                .bind(answer)
                .execute(&self.db)
                .await?
            }
            TaskOutcome::Failed { reason } => {
                sqlx::query(
                    r#"
                    UPDATE tasks
                    SET status = 'failed',
                        error_message = $2,
                        scraped_content = NULL,
                        ai_answer = NULL,
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(reason)
                .execute(&self.db)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_serializes_camel_case() {
        let task = Task::new("https://example.com", "What is this?");
        let json = serde_json::to_value(&task).unwrap();

        assert_eq!(json["websiteUrl"], "https://example.com");
        assert_eq!(json["question"], "What is this?");
        assert_eq!(json["status"], "pending");
        assert!(json["scrapedContent"].is_null());
        assert!(json["aiAnswer"].is_null());
        assert!(json["errorMessage"].is_null());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(TaskStatus::Processing).unwrap(),
            "processing"
        );
        assert_eq!(
            serde_json::to_value(TaskStatus::Completed).unwrap(),
            "completed"
        );
    }
}
