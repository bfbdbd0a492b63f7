//! The task processing job: the worker-side state machine.
//!
//! One claimed job drives one task from `processing` to a terminal state:
//! fetch the page, extract readable text, generate an answer, persist the
//! outcome. Every failure is recorded on the task and re-raised so the
//! queue counts it against the retry budget.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::kernel::answer::GenerationError;
use crate::kernel::extract::{extract_content, ExtractError};
use crate::kernel::jobs::{CommandMeta, JobRegistry};
use crate::kernel::scrape::{FetchError, MIN_HTML_LEN};
use crate::kernel::ServerDeps;

use super::model::{StoreError, TaskOutcome};

/// Queue message dispatching one task to a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessTaskJob {
    pub task_id: Uuid,
    pub website_url: String,
    pub question: String,
}

impl ProcessTaskJob {
    pub const JOB_TYPE: &'static str = "task:process";
}

impl CommandMeta for ProcessTaskJob {
    fn command_type(&self) -> &'static str {
        Self::JOB_TYPE
    }
}

/// Failure of one processing attempt. The rendered message is what lands in
/// the task's `error_message` and what the queue counts against the retry
/// budget.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Web scraping failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Web scraping failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("AI query failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("task store failure: {0}")]
    Store(#[from] StoreError),
}

/// Register task jobs with the registry.
pub fn register_task_jobs(registry: &mut JobRegistry) {
    registry.register::<ProcessTaskJob, _, _>(ProcessTaskJob::JOB_TYPE, |job, deps| async move {
        Ok(process_task(job, &deps).await?)
    });
}

/// Drive one task through processing to a terminal state.
///
/// Safe to re-run on redelivery: marking processing again is idempotent and
/// the terminal write overwrites the previous attempt's fields.
pub async fn process_task(job: ProcessTaskJob, deps: &ServerDeps) -> Result<(), ProcessError> {
    // If this write fails the job goes unacknowledged and the queue
    // redelivers; nothing else is touched.
    deps.tasks.mark_processing(job.task_id).await?;

    match run_pipeline(&job, deps).await {
        Ok((content, answer)) => {
            deps.tasks
                .finish(job.task_id, TaskOutcome::Completed { content, answer })
                .await?;

            info!(task_id = %job.task_id, "task completed");
            Ok(())
        }
        Err(e) => {
            let reason = e.to_string();

            // If this write also fails the task stays in processing and the
            // failure is only visible in the logs.
            if let Err(store_err) = deps
                .tasks
                .finish(
                    job.task_id,
                    TaskOutcome::Failed {
                        reason: reason.clone(),
                    },
                )
                .await
            {
                error!(task_id = %job.task_id, error = %store_err, "failed to record task failure");
            }

            warn!(task_id = %job.task_id, error = %reason, "task failed");
            Err(e)
        }
    }
}

/// Fetch, extract, generate.
async fn run_pipeline(
    job: &ProcessTaskJob,
    deps: &ServerDeps,
) -> Result<(String, String), ProcessError> {
    let html = deps.fetcher.fetch(&job.website_url).await?;
    if html.len() < MIN_HTML_LEN {
        return Err(FetchError::EmptyBody.into());
    }

    let content = extract_content(&html)?;
    let answer = deps.answerer.answer(&content, &job.question).await?;

    Ok((content, answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_messages_keep_step_prefixes() {
        let fetch: ProcessError = FetchError::Timeout.into();
        assert!(fetch.to_string().starts_with("Web scraping failed:"));

        let generation: ProcessError = GenerationError::EmptyAnswer.into();
        assert!(generation.to_string().starts_with("AI query failed:"));
    }

    #[test]
    fn test_job_uses_default_retry_budget() {
        let job = ProcessTaskJob {
            task_id: Uuid::new_v4(),
            website_url: "https://example.com".to_string(),
            question: "What is this site about?".to_string(),
        };

        assert_eq!(job.command_type(), "task:process");
        assert_eq!(job.max_attempts(), 3);
    }
}
