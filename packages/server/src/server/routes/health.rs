use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    database: DatabaseHealth,
    connection_pool: ConnectionPoolHealth,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
pub struct ConnectionPoolHealth {
    size: u32,
    idle_connections: usize,
}

/// Health check endpoint
///
/// Checks database connectivity and connection pool utilization.
/// Returns 200 OK when healthy, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let db_health = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        sqlx::query("SELECT 1").execute(&state.db_pool),
    )
    .await
    {
        Ok(Ok(_)) => DatabaseHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => DatabaseHealth {
            status: "error".to_string(),
            error: Some(format!("Query failed: {}", e)),
        },
        Err(_) => DatabaseHealth {
            status: "error".to_string(),
            error: Some("Query timeout (>5s)".to_string()),
        },
    };

    let pool_health = ConnectionPoolHealth {
        size: state.db_pool.size(),
        idle_connections: state.db_pool.num_idle(),
    };

    let is_healthy = db_health.status == "ok";

    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            database: db_health,
            connection_pool: pool_health,
        }),
    )
}
