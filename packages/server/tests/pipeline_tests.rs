//! End-to-end tests for the task processing state machine, driven through
//! scripted in-memory dependencies.

use std::sync::Arc;
use std::time::Duration;

use server_core::domains::tasks::{process_task, BaseTaskStore, ProcessTaskJob, TaskStatus};
use server_core::kernel::jobs::RetryPolicy;
use server_core::kernel::test_dependencies::{
    InMemoryTaskStore, MockAnswerGenerator, MockPageFetcher,
};
use server_core::kernel::{FetchError, GenerationError, ServerDeps};

const LONG_BODY: &str = "This example site explains, at considerable length, how its product \
                         works, who built it, and why anyone might care about any of that.";

fn page(body: &str) -> String {
    format!(
        "<html><head><title>Example</title></head><body><p>{}</p></body></html>",
        body
    )
}

fn deps(
    store: &Arc<InMemoryTaskStore>,
    fetcher: MockPageFetcher,
    answerer: MockAnswerGenerator,
) -> Arc<ServerDeps> {
    Arc::new(ServerDeps::new(
        store.clone(),
        Arc::new(fetcher),
        Arc::new(answerer),
    ))
}

async fn submit(store: &InMemoryTaskStore, url: &str, question: &str) -> ProcessTaskJob {
    let task = store.create(url, question).await.unwrap();
    ProcessTaskJob {
        task_id: task.id,
        website_url: task.website_url,
        question: task.question,
    }
}

#[tokio::test]
async fn successful_task_runs_pending_processing_completed() {
    let store = Arc::new(InMemoryTaskStore::new());
    let deps = deps(
        &store,
        MockPageFetcher::new().with_page(&page(LONG_BODY)),
        MockAnswerGenerator::new().with_answer("It explains how the product works."),
    );

    let job = submit(&store, "https://example.com", "What is this site about?").await;
    let created = store.get(job.task_id).await.unwrap().unwrap();
    assert_eq!(created.status, TaskStatus::Pending);

    process_task(job.clone(), &deps).await.unwrap();

    let task = store.get(job.task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(
        task.ai_answer.as_deref(),
        Some("It explains how the product works.")
    );
    assert!(task
        .scraped_content
        .as_deref()
        .unwrap()
        .contains("at considerable length"));
    assert!(task.error_message.is_none());

    assert_eq!(
        store.status_history(job.task_id),
        vec![
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Completed
        ]
    );
}

#[tokio::test]
async fn blocked_fetch_records_access_denied_failure() {
    let store = Arc::new(InMemoryTaskStore::new());
    let deps = deps(
        &store,
        MockPageFetcher::new().with_failure(FetchError::AccessDenied { status: 403 }),
        MockAnswerGenerator::new(),
    );

    let job = submit(&store, "https://blocked.example.com", "What is here?").await;
    let err = process_task(job.clone(), &deps).await.unwrap_err();
    assert!(err.to_string().contains("access denied"));

    let task = store.get(job.task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);

    let message = task.error_message.unwrap();
    assert!(message.starts_with("Web scraping failed:"));
    assert!(message.contains("access denied (403)"));
    assert!(task.scraped_content.is_none());
    assert!(task.ai_answer.is_none());
}

#[tokio::test]
async fn near_empty_page_fails_as_too_short() {
    let store = Arc::new(InMemoryTaskStore::new());
    let deps = deps(
        &store,
        // Raw response shorter than the 100-byte minimum
        MockPageFetcher::new().with_page("<body>fifty characters of body text, give or t</body>"),
        MockAnswerGenerator::new(),
    );

    let job = submit(&store, "https://thin.example.com", "What is here?").await;
    process_task(job.clone(), &deps).await.unwrap_err();

    let task = store.get(job.task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task
        .error_message
        .unwrap()
        .contains("empty or very short content"));
}

#[tokio::test]
async fn unextractable_page_fails_with_insufficient_content() {
    let store = Arc::new(InMemoryTaskStore::new());
    // Big enough HTML, almost no visible text
    let html = format!(
        "<html><body><script>{}</script>hi</body></html>",
        "var padding = 'xxxxxxxxxxxxxxxxxxxx';".repeat(5)
    );
    let deps = deps(
        &store,
        MockPageFetcher::new().with_page(&html),
        MockAnswerGenerator::new(),
    );

    let job = submit(&store, "https://spa.example.com", "What is here?").await;
    process_task(job.clone(), &deps).await.unwrap_err();

    let task = store.get(job.task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task
        .error_message
        .unwrap()
        .contains("insufficient content"));
}

#[tokio::test]
async fn generation_failure_records_ai_query_error() {
    let store = Arc::new(InMemoryTaskStore::new());
    let deps = deps(
        &store,
        MockPageFetcher::new().with_page(&page(LONG_BODY)),
        MockAnswerGenerator::new()
            .with_failure(GenerationError::Api("500 - upstream exploded".to_string())),
    );

    let job = submit(&store, "https://example.com", "What is here?").await;
    process_task(job.clone(), &deps).await.unwrap_err();

    let task = store.get(job.task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task
        .error_message
        .unwrap()
        .starts_with("AI query failed:"));
}

#[tokio::test]
async fn redelivery_overwrites_the_previous_attempts_outcome() {
    let store = Arc::new(InMemoryTaskStore::new());
    // First delivery fails at fetch, the redelivery succeeds
    let deps = deps(
        &store,
        MockPageFetcher::new()
            .with_failure(FetchError::UpstreamServer { status: 503 })
            .with_page(&page(LONG_BODY)),
        MockAnswerGenerator::new().with_answer("Recovered on retry."),
    );

    let job = submit(&store, "https://flaky.example.com", "Still there?").await;

    process_task(job.clone(), &deps).await.unwrap_err();
    let task = store.get(job.task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error_message.is_some());

    process_task(job.clone(), &deps).await.unwrap();
    let task = store.get(job.task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.scraped_content.is_some());
    assert_eq!(task.ai_answer.as_deref(), Some("Recovered on retry."));
    assert!(task.error_message.is_none());

    assert_eq!(
        store.status_history(job.task_id),
        vec![
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Failed,
            TaskStatus::Processing,
            TaskStatus::Completed
        ]
    );
}

#[tokio::test]
async fn redelivery_after_crash_mid_processing_still_terminates() {
    let store = Arc::new(InMemoryTaskStore::new());
    let deps = deps(
        &store,
        MockPageFetcher::new().with_page(&page(LONG_BODY)),
        MockAnswerGenerator::new(),
    );

    let job = submit(&store, "https://example.com", "What is here?").await;

    // Simulate a worker that claimed the job, marked processing, and died
    store.mark_processing(job.task_id).await.unwrap();

    // Redelivery re-runs the whole attempt
    process_task(job.clone(), &deps).await.unwrap();

    let task = store.get(job.task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.scraped_content.is_some() && task.ai_answer.is_some());
}

#[tokio::test]
async fn third_attempt_success_completes_the_task() {
    let store = Arc::new(InMemoryTaskStore::new());
    let deps = deps(
        &store,
        MockPageFetcher::new()
            .with_failure(FetchError::UpstreamServer { status: 503 })
            .with_failure(FetchError::UpstreamServer { status: 503 })
            .with_page(&page(LONG_BODY)),
        MockAnswerGenerator::new().with_answer("Third time lucky."),
    );
    let policy = RetryPolicy::default();

    let job = submit(&store, "https://flaky.example.com", "Up yet?").await;

    // Drive attempts the way the queue would: retry with backoff until the
    // budget runs out
    let mut attempt = 1;
    let mut delays = Vec::new();
    loop {
        match process_task(job.clone(), &deps).await {
            Ok(()) => break,
            Err(_) => match policy.backoff_after(attempt) {
                Some(delay) => {
                    delays.push(delay);
                    attempt += 1;
                }
                None => break,
            },
        }
    }

    assert_eq!(attempt, 3);
    assert_eq!(
        delays,
        vec![Duration::from_secs(5), Duration::from_secs(10)]
    );

    let task = store.get(job.task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.ai_answer.as_deref(), Some("Third time lucky."));
}

#[tokio::test]
async fn exhausted_retry_budget_leaves_the_task_failed() {
    let store = Arc::new(InMemoryTaskStore::new());
    let deps = deps(
        &store,
        MockPageFetcher::new()
            .with_failure(FetchError::RateLimited { status: 429 })
            .with_failure(FetchError::RateLimited { status: 429 })
            .with_failure(FetchError::RateLimited { status: 429 }),
        MockAnswerGenerator::new(),
    );
    let policy = RetryPolicy::default();

    let job = submit(&store, "https://ratelimited.example.com", "Anything?").await;

    let mut attempt = 1;
    loop {
        match process_task(job.clone(), &deps).await {
            Ok(()) => break,
            Err(_) => match policy.backoff_after(attempt) {
                Some(_) => attempt += 1,
                None => break,
            },
        }
    }

    // Three attempts total, then the queue drops the job
    assert_eq!(attempt, 3);
    assert_eq!(policy.backoff_after(attempt), None);

    let task = store.get(job.task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error_message.unwrap().contains("rate limited"));

    // The task never reverted to pending across any attempt
    let history = store.status_history(job.task_id);
    assert_eq!(history[0], TaskStatus::Pending);
    assert!(!history[1..].contains(&TaskStatus::Pending));
}

#[tokio::test]
async fn extracted_content_and_question_reach_the_generator() {
    let store = Arc::new(InMemoryTaskStore::new());
    let answerer = Arc::new(MockAnswerGenerator::new());
    let deps = Arc::new(ServerDeps::new(
        store.clone(),
        Arc::new(MockPageFetcher::new().with_page(&page(LONG_BODY))),
        answerer.clone(),
    ));

    let job = submit(&store, "https://example.com", "Who built it?").await;
    process_task(job, &deps).await.unwrap();

    let calls = answerer.calls();
    assert_eq!(calls.len(), 1);
    let (content, question) = &calls[0];
    assert!(content.contains("who built it, and why"));
    assert_eq!(question, "Who built it?");
}
