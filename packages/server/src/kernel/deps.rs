//! Server dependencies for job handlers (traits for testability).
//!
//! External services sit behind `Base*` trait abstractions so the pipeline
//! can run against scripted doubles in tests.

use std::sync::Arc;

use crate::domains::tasks::BaseTaskStore;
use crate::kernel::answer::BaseAnswerGenerator;
use crate::kernel::scrape::BasePageFetcher;

/// Dependency container handed to job handlers.
#[derive(Clone)]
pub struct ServerDeps {
    pub tasks: Arc<dyn BaseTaskStore>,
    pub fetcher: Arc<dyn BasePageFetcher>,
    pub answerer: Arc<dyn BaseAnswerGenerator>,
}

impl ServerDeps {
    pub fn new(
        tasks: Arc<dyn BaseTaskStore>,
        fetcher: Arc<dyn BasePageFetcher>,
        answerer: Arc<dyn BaseAnswerGenerator>,
    ) -> Self {
        Self {
            tasks,
            fetcher,
            answerer,
        }
    }
}
