//! Job runner service for processing background jobs.
//!
//! The `JobRunner` is a background service that:
//! - Polls the database for ready jobs via the queue
//! - Deserializes and executes claimed jobs through the registry
//! - Marks jobs succeeded/failed (the queue handles retries)
//!
//! # Architecture
//!
//! ```text
//! JobRunner
//!     │
//!     ├─► Claim a batch (JobQueue, bounded by concurrency)
//!     ├─► Execute batch concurrently (JobRegistry → domain handler)
//!     └─► Mark succeeded/failed (JobQueue schedules retries/drops)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::queue::{ClaimedJob, JobQueue};
use super::registry::SharedJobRegistry;
use crate::kernel::ServerDeps;

/// Configuration for the job runner.
#[derive(Debug, Clone)]
pub struct JobRunnerConfig {
    /// Maximum jobs processed simultaneously (also the claim batch size).
    pub concurrency: i64,
    /// How long to wait when no jobs are available.
    pub poll_interval: Duration,
    /// How often to extend leases of running jobs.
    pub heartbeat_interval: Duration,
    /// Worker ID for this instance.
    pub worker_id: String,
}

impl Default for JobRunnerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            poll_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(30),
            worker_id: format!("worker-{}", Uuid::new_v4()),
        }
    }
}

impl JobRunnerConfig {
    /// Create a config with a specific concurrency limit.
    pub fn with_concurrency(concurrency: i64) -> Self {
        Self {
            concurrency,
            ..Default::default()
        }
    }
}

/// Background service that processes jobs from the queue.
pub struct JobRunner {
    queue: Arc<dyn JobQueue>,
    registry: SharedJobRegistry,
    deps: Arc<ServerDeps>,
    config: JobRunnerConfig,
    shutdown: Arc<AtomicBool>,
}

impl JobRunner {
    /// Create a new job runner with default configuration.
    pub fn new(queue: Arc<dyn JobQueue>, registry: SharedJobRegistry, deps: Arc<ServerDeps>) -> Self {
        Self::with_config(queue, registry, deps, JobRunnerConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(
        queue: Arc<dyn JobQueue>,
        registry: SharedJobRegistry,
        deps: Arc<ServerDeps>,
        config: JobRunnerConfig,
    ) -> Self {
        Self {
            queue,
            registry,
            deps,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a shutdown handle for graceful shutdown.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Run the job runner until shutdown is requested.
    pub async fn run(self) -> Result<()> {
        info!(
            worker_id = %self.config.worker_id,
            concurrency = self.config.concurrency,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "job runner starting"
        );

        loop {
            if self.is_shutdown_requested() {
                break;
            }

            let jobs = match self
                .queue
                .claim(&self.config.worker_id, self.config.concurrency)
                .await
            {
                Ok(jobs) => jobs,
                Err(e) => {
                    error!(error = %e, "failed to claim jobs");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            if jobs.is_empty() {
                tokio::time::sleep(self.config.poll_interval).await;
                continue;
            }

            debug!(count = jobs.len(), "claimed jobs");

            // The claim limit bounds how many run at once; jobs within a
            // batch are independent and run concurrently.
            futures::future::join_all(jobs.into_iter().map(|job| self.process_job(job))).await;
        }

        info!(worker_id = %self.config.worker_id, "job runner stopped");
        Ok(())
    }

    /// Run until a Ctrl+C shutdown signal is received.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown_handle();

        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
            shutdown.store(true, Ordering::SeqCst);
        });

        self.run().await
    }

    /// Execute one job, then record the result with the queue.
    async fn process_job(&self, job: ClaimedJob) {
        let job_id = job.id;
        let job_type = job.command_type().to_string();

        debug!(job_id = %job_id, job_type = %job_type, "executing job");

        let result = self.execute_with_heartbeat(&job).await;

        match result {
            Ok(()) => {
                info!(job_id = %job_id, job_type = %job_type, "job succeeded");
                if let Err(e) = self.queue.mark_succeeded(job_id).await {
                    error!(job_id = %job_id, error = %e, "failed to mark job as succeeded");
                }
            }
            Err(e) => {
                warn!(job_id = %job_id, job_type = %job_type, error = %e, "job failed");
                if let Err(mark_err) = self.queue.mark_failed(job_id, &e.to_string()).await {
                    error!(job_id = %job_id, error = %mark_err, "failed to mark job as failed");
                }
            }
        }
    }

    /// Execute a job while periodically extending its lease so slow fetches
    /// and completions are not redelivered mid-flight.
    async fn execute_with_heartbeat(&self, job: &ClaimedJob) -> Result<()> {
        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        heartbeat.tick().await; // first tick fires immediately

        let execute = self.registry.execute(job, self.deps.clone());
        tokio::pin!(execute);

        loop {
            tokio::select! {
                result = &mut execute => return result,
                _ = heartbeat.tick() => {
                    if let Err(e) = self.queue.heartbeat(job.id).await {
                        warn!(job_id = %job.id, error = %e, "heartbeat failed");
                    }
                }
            }
        }
    }
}
