//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domains::tasks::BaseTaskStore;
use crate::kernel::jobs::JobQueue;
use crate::server::routes::{
    create_task_handler, get_task_handler, health_handler, list_tasks_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub tasks: Arc<dyn BaseTaskStore>,
    pub queue: Arc<dyn JobQueue>,
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    // CORS configuration - the web UI runs as a separate service
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/tasks", post(create_task_handler).get(list_tasks_handler))
        .route("/tasks/:id", get(get_task_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
