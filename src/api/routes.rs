use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::middleware::request_logging;
use crate::scheduler::{SchedulerStatus, StatusHandle};
use crate::snapshot::{Snapshot, SnapshotStore};

/// Shared application state. Read-only views of what the scheduler writes.
#[derive(Clone)]
pub struct AppState {
    pub store: SnapshotStore,
    pub status: StatusHandle,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/data", get(get_latest_data))
        .route("/api/status", get(get_status))
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ===== Route Handlers =====

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Latest published snapshot, 503 until the first one exists
async fn get_latest_data(State(state): State<AppState>) -> Result<Json<Snapshot>, ApiError> {
    state
        .store
        .latest()
        .map(|snapshot: Arc<Snapshot>| Json((*snapshot).clone()))
        .ok_or_else(|| ApiError::Unavailable("No data available yet".to_string()))
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        snapshot_available: state.store.is_available(),
        scheduler: state.status.snapshot(),
    })
}

// ===== Response Types =====

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct StatusResponse {
    snapshot_available: bool,
    scheduler: SchedulerStatus,
}

// ===== Error Handling =====

#[derive(Debug)]
enum ApiError {
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_maps_to_503() {
        let response = ApiError::Unavailable("No data available yet".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
