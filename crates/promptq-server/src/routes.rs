//! HTTP routes over the dispatcher.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use promptq_core::app::DispatchError;
use promptq_core::queue::QueueError;
use promptq_core::{Admission, Dispatcher, StatusReport};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type AppState = Arc<Dispatcher>;

pub fn router(dispatcher: AppState) -> Router {
    Router::new()
        .route("/api/tasks", get(task_status).post(submit_tasks))
        .route("/health", get(health))
        .with_state(dispatcher)
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub prompts: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Comma-delimited task ids.
    pub task_ids: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Dispatch(DispatchError::Queue(QueueError::Full { .. } | QueueError::Closed)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn submit_tasks(
    State(dispatcher): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<Admission>, ApiError> {
    let admission = dispatcher.submit(request.prompts).await?;
    Ok(Json(admission))
}

async fn task_status(
    State(dispatcher): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Json<StatusReport> {
    Json(dispatcher.status_csv(&query.task_ids).await)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    workers: usize,
    pending: usize,
}

async fn health(State(dispatcher): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        workers: dispatcher.worker_count(),
        pending: dispatcher.pending().await,
    })
}
