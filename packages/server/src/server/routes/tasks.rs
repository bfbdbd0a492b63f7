//! Task submission and read endpoints.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use url::Url;
use uuid::Uuid;

use crate::domains::tasks::{ProcessTaskJob, Task};
use crate::kernel::jobs::enqueue_command;
use crate::kernel::scrape::normalize_url;
use crate::server::app::AppState;

/// Submission payload. Fields are optional so missing input surfaces as a
/// 400 with a readable message rather than a deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Synchronous API failure, rendered as `{error, message}`.
#[derive(Debug)]
pub enum ApiError {
    Validation {
        error: &'static str,
        message: String,
    },
    NotFound {
        error: &'static str,
    },
    Internal {
        error: &'static str,
        message: String,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation { error, message } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error,
                    message: Some(message),
                },
            ),
            ApiError::NotFound { error } => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error,
                    message: None,
                },
            ),
            ApiError::Internal { error, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error,
                    message: Some(message),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Validate and normalize a submission: both fields present, question
/// non-blank, URL parseable once the scheme is defaulted.
fn validate_submission(request: &CreateTaskRequest) -> Result<(String, String), ApiError> {
    let (Some(website_url), Some(question)) = (&request.website_url, &request.question) else {
        return Err(ApiError::Validation {
            error: "Missing required fields",
            message: "websiteUrl and question are required".to_string(),
        });
    };

    let question = question.trim();
    if question.is_empty() {
        return Err(ApiError::Validation {
            error: "Missing required fields",
            message: "websiteUrl and question are required".to_string(),
        });
    }

    let website_url = normalize_url(website_url.trim());
    if Url::parse(&website_url).is_err() {
        return Err(ApiError::Validation {
            error: "Invalid URL",
            message: "websiteUrl must be a valid URL".to_string(),
        });
    }

    Ok((website_url, question.to_string()))
}

/// POST /tasks - create a task and queue it for processing
pub async fn create_task_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let (website_url, question) = validate_submission(&request)?;

    let task = state
        .tasks
        .create(&website_url, &question)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to create task");
            ApiError::Internal {
                error: "Failed to create task",
                message: e.to_string(),
            }
        })?;

    let job = ProcessTaskJob {
        task_id: task.id,
        website_url: task.website_url.clone(),
        question: task.question.clone(),
    };

    enqueue_command(state.queue.as_ref(), &job)
        .await
        .map_err(|e| {
            error!(task_id = %task.id, error = %e, "failed to enqueue task job");
            ApiError::Internal {
                error: "Failed to create task",
                message: e.to_string(),
            }
        })?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /tasks - all tasks, newest first
pub async fn list_tasks_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.tasks.list().await.map_err(|e| {
        error!(error = %e, "failed to fetch tasks");
        ApiError::Internal {
            error: "Failed to fetch tasks",
            message: e.to_string(),
        }
    })?;

    Ok(Json(tasks))
}

/// GET /tasks/:id - one task
pub async fn get_task_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = state.tasks.get(id).await.map_err(|e| {
        error!(task_id = %id, error = %e, "failed to fetch task");
        ApiError::Internal {
            error: "Failed to fetch task",
            message: e.to_string(),
        }
    })?;

    match task {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::NotFound {
            error: "Task not found",
        }),
    }
}
