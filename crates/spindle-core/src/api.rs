//! HTTP surface (axum).
//!
//! | method | path                | handler       |
//! |--------|---------------------|---------------|
//! | POST   | `/task`             | create_task   |
//! | GET    | `/task/{id}`        | get_task      |
//! | DELETE | `/task/{id}`        | cancel_task   |
//! | POST   | `/task/{id}/update` | update_task   |
//! | GET    | `/health`           | health        |

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::app::{TaskService, WorkerPool};
use crate::domain::{BrokerError, Progress, ServiceError, StoreError, TaskId, TaskRecord, TaskStatus};

/// Shared state for the task routes.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<TaskService>,
    pub pool: Arc<WorkerPool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedTask {
    pub id: TaskId,
}

/// Body of `POST /task/{id}/update`. `process` may be a string or a number.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTask {
    pub status: TaskStatus,
    pub process: Progress,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub in_flight: usize,
    pub capacity: usize,
}

/// Error response: `{"error": "..."}` with a status code per failure kind.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(err) => match err {
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Conflict { .. } | ServiceError::InvalidUpdate { .. } => {
                    StatusCode::CONFLICT
                }
                ServiceError::Store(StoreError::Transport(_))
                | ServiceError::Broker(BrokerError::Transport(_)) => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::Store(_) | ServiceError::Broker(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Service(err) => err.to_string(),
        };
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %message, "request failed");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// POST /task
async fn create_task(State(state): State<ApiState>) -> Result<Json<CreatedTask>, ApiError> {
    let record = state.service.create().await?;
    Ok(Json(CreatedTask { id: record.id }))
}

/// GET /task/{id}
async fn get_task(
    State(state): State<ApiState>,
    Path(id): Path<TaskId>,
) -> Result<Json<TaskRecord>, ApiError> {
    match state.service.query(&id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ServiceError::NotFound(id).into()),
    }
}

/// DELETE /task/{id}
async fn cancel_task(
    State(state): State<ApiState>,
    Path(id): Path<TaskId>,
) -> Result<Json<TaskRecord>, ApiError> {
    Ok(Json(state.service.cancel(&id).await?))
}

/// POST /task/{id}/update
async fn update_task(
    State(state): State<ApiState>,
    Path(id): Path<TaskId>,
    body: Result<Json<UpdateTask>, JsonRejection>,
) -> Result<Json<TaskRecord>, ApiError> {
    let Json(update) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let record = state
        .service
        .update(&id, update.status, update.process)
        .await?;
    Ok(Json(record))
}

/// GET /health
async fn health(State(state): State<ApiState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        in_flight: state.pool.in_flight(),
        capacity: state.pool.capacity(),
    })
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/task", post(create_task))
        .route("/task/{id}", get(get_task).delete(cancel_task))
        .route("/task/{id}/update", post(update_task))
        .route("/health", get(health))
        .with_state(state)
}
