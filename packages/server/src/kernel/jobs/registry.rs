//! Job registry for deserializing and executing jobs.
//!
//! The registry maps job type strings (e.g., "task:process") to handlers
//! that reconstruct the typed payload from JSON and run the job logic. This
//! lets the runner claim jobs from the database and dispatch them without
//! knowing the concrete types.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;

use super::queue::ClaimedJob;
use crate::kernel::ServerDeps;

/// Async handler taking the raw payload and the shared dependencies.
type BoxedHandler = Box<
    dyn Fn(serde_json::Value, Arc<ServerDeps>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

/// Registry that maps job type strings to handlers.
///
/// Each domain registers its job types at startup; the runner then uses the
/// registry to deserialize and execute claimed jobs in one step.
#[derive(Default)]
pub struct JobRegistry {
    handlers: HashMap<&'static str, BoxedHandler>,
}

impl JobRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a job type with its handler.
    ///
    /// The handler is an async function that receives the deserialized
    /// payload and the shared dependencies.
    pub fn register<J, F, Fut>(&mut self, job_type: &'static str, handler: F)
    where
        J: DeserializeOwned + Send + 'static,
        F: Fn(J, Arc<ServerDeps>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let boxed: BoxedHandler = Box::new(move |value, deps| {
            let handler = handler.clone();
            Box::pin(async move {
                let job: J = serde_json::from_value(value)
                    .map_err(|e| anyhow!("failed to deserialize {}: {}", job_type, e))?;
                handler(job, deps).await
            })
        });

        self.handlers.insert(job_type, boxed);
    }

    /// Execute a claimed job using its registered handler.
    ///
    /// Fails if the job type is unknown, the payload does not deserialize,
    /// or the handler itself fails.
    pub async fn execute(&self, job: &ClaimedJob, deps: Arc<ServerDeps>) -> Result<()> {
        let handler = self
            .handlers
            .get(job.command_type())
            .ok_or_else(|| anyhow!("unknown job type: {}", job.command_type()))?;

        handler(job.job.args.clone(), deps).await
    }

    /// Check if a job type is registered.
    pub fn is_registered(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }
}

/// Thread-safe registry wrapped in Arc.
pub type SharedJobRegistry = Arc<JobRegistry>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    use crate::kernel::jobs::Job;
    use crate::kernel::test_dependencies::{
        InMemoryTaskStore, MockAnswerGenerator, MockPageFetcher,
    };

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct TestJob {
        name: String,
    }

    fn test_deps() -> Arc<ServerDeps> {
        Arc::new(ServerDeps::new(
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(MockPageFetcher::new()),
            Arc::new(MockAnswerGenerator::new()),
        ))
    }

    #[test]
    fn test_register_and_check() {
        let mut registry = JobRegistry::new();
        registry.register::<TestJob, _, _>("test_job", |_job, _deps| async move { Ok(()) });

        assert!(registry.is_registered("test_job"));
        assert!(!registry.is_registered("unknown_job"));
    }

    #[tokio::test]
    async fn test_execute_dispatches_to_handler() {
        let mut registry = JobRegistry::new();
        registry.register::<TestJob, _, _>("test_job", |job: TestJob, _deps| async move {
            if job.name == "boom" {
                Err(anyhow!("boom"))
            } else {
                Ok(())
            }
        });

        let ok_job = Job::new("test_job", serde_json::json!({"name": "fine"}), 3);
        let claimed = ClaimedJob {
            id: ok_job.id,
            job: ok_job,
        };
        assert!(registry.execute(&claimed, test_deps()).await.is_ok());

        let bad_job = Job::new("test_job", serde_json::json!({"name": "boom"}), 3);
        let claimed = ClaimedJob {
            id: bad_job.id,
            job: bad_job,
        };
        assert!(registry.execute(&claimed, test_deps()).await.is_err());
    }

    #[tokio::test]
    async fn test_execute_rejects_unknown_job_type() {
        let registry = JobRegistry::new();

        let job = Job::new("nope", serde_json::json!({}), 3);
        let claimed = ClaimedJob { id: job.id, job };

        let err = registry.execute(&claimed, test_deps()).await.unwrap_err();
        assert!(err.to_string().contains("unknown job type"));
    }
}
