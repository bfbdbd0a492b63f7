// Main entry point for the API server and job runner

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::domains::tasks::{register_task_jobs, PostgresTaskStore};
use server_core::kernel::jobs::{JobRegistry, JobRunner, JobRunnerConfig, PostgresJobQueue};
use server_core::kernel::{HttpPageFetcher, OpenAiAnswerer, ServerDeps};
use server_core::server::{build_app, AppState};
use server_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Website Q&A API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Long-lived handles, constructed once and shared by reference
    let tasks = Arc::new(PostgresTaskStore::new(pool.clone()));
    let queue = Arc::new(PostgresJobQueue::new(pool.clone()));
    let fetcher = Arc::new(HttpPageFetcher::new().context("Failed to create page fetcher")?);
    let answerer = Arc::new(OpenAiAnswerer::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    ));

    let deps = Arc::new(ServerDeps::new(tasks.clone(), fetcher, answerer));

    // Register job handlers and spawn the runner
    let mut registry = JobRegistry::new();
    register_task_jobs(&mut registry);

    let runner = JobRunner::with_config(
        queue.clone(),
        Arc::new(registry),
        deps,
        JobRunnerConfig::with_concurrency(config.worker_concurrency),
    );
    tokio::spawn(async move {
        if let Err(e) = runner.run().await {
            tracing::error!(error = %e, "Job runner exited with error");
        }
    });

    // Build application
    let app = build_app(AppState {
        db_pool: pool,
        tasks,
        queue,
    });

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
