// TestDependencies - mock implementations for testing
//
// Scripted doubles injected through ServerDeps in pipeline tests. Each mock
// replays queued responses in order and falls back to a sensible default
// once the queue is drained.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domains::tasks::{BaseTaskStore, StoreError, Task, TaskOutcome, TaskStatus};
use crate::kernel::answer::{BaseAnswerGenerator, GenerationError};
use crate::kernel::scrape::{BasePageFetcher, FetchError};

// =============================================================================
// Mock Page Fetcher
// =============================================================================

#[derive(Default)]
pub struct MockPageFetcher {
    responses: Mutex<VecDeque<Result<String, FetchError>>>,
    calls: Mutex<Vec<String>>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful fetch returning this HTML.
    pub fn with_page(self, html: &str) -> Self {
        self.responses.lock().unwrap().push_back(Ok(html.to_string()));
        self
    }

    /// Queue a failed fetch.
    pub fn with_failure(self, error: FetchError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// All URLs that were fetched.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BasePageFetcher for MockPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        let mut responses = self.responses.lock().unwrap();
        match responses.pop_front() {
            Some(result) => result,
            // Default page, long enough to pass every extraction threshold
            None => Ok(format!(
                "<html><body><p>{}</p></body></html>",
                "Mock page content for testing. ".repeat(8)
            )),
        }
    }
}

// =============================================================================
// Mock Answer Generator
// =============================================================================

#[derive(Default)]
pub struct MockAnswerGenerator {
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockAnswerGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful generation returning this answer.
    pub fn with_answer(self, answer: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(answer.to_string()));
        self
    }

    /// Queue a failed generation.
    pub fn with_failure(self, error: GenerationError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// All (content, question) pairs that were asked.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseAnswerGenerator for MockAnswerGenerator {
    async fn answer(&self, content: &str, question: &str) -> Result<String, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push((content.to_string(), question.to_string()));

        let mut responses = self.responses.lock().unwrap();
        match responses.pop_front() {
            Some(result) => result,
            None => Ok("This is a mock answer.".to_string()),
        }
    }
}

// =============================================================================
// In-Memory Task Store
// =============================================================================

/// Task store over a HashMap, recording every status write so tests can
/// assert transition order.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<Uuid, Task>>,
    history: Mutex<Vec<(Uuid, TaskStatus)>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status writes for one task, in order.
    pub fn status_history(&self, id: Uuid) -> Vec<TaskStatus> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|(task_id, _)| *task_id == id)
            .map(|(_, status)| *status)
            .collect()
    }
}

#[async_trait]
impl BaseTaskStore for InMemoryTaskStore {
    async fn create(&self, website_url: &str, question: &str) -> Result<Task, StoreError> {
        let task = Task::new(website_url, question);
        self.tasks.lock().unwrap().insert(task.id, task.clone());
        self.history
            .lock()
            .unwrap()
            .push((task.id, TaskStatus::Pending));
        Ok(task)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.tasks.lock().unwrap().values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn mark_processing(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        task.status = TaskStatus::Processing;
        task.updated_at = Utc::now();
        self.history
            .lock()
            .unwrap()
            .push((id, TaskStatus::Processing));
        Ok(())
    }

    async fn finish(&self, id: Uuid, outcome: TaskOutcome) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        match outcome {
            TaskOutcome::Completed { content, answer } => {
                task.status = TaskStatus::Completed;
                task.scraped_content = Some(content);
                task.ai_answer = Some(answer);
                task.error_message = None;
            }
            TaskOutcome::Failed { reason } => {
                task.status = TaskStatus::Failed;
                task.error_message = Some(reason);
                task.scraped_content = None;
                task.ai_answer = None;
            }
        }
        task.updated_at = Utc::now();
        self.history.lock().unwrap().push((id, task.status));
        Ok(())
    }
}
