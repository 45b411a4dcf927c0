//! REST surface under `/api/v1`.
//!
//! Handlers only translate between HTTP and `TaskOrchestrator`; every error
//! leaves as `{ "error_code": <status>, "description": ... }`.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use linkpack_core::domain::{ServiceError, Task, TaskId};
use linkpack_core::{RuntimeStatus, TaskOrchestrator};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;

type AppState = Arc<TaskOrchestrator>;

/// Every route, with `request_timeout` bounding each request (408 on expiry).
pub fn router(orchestrator: AppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/task", post(create_task))
        .route("/tasks", get(list_tasks))
        .route("/task/:id", get(get_task).post(add_links))
        .route("/task/:id/result", get(get_result))
        .route("/status", get(status))
        .with_state(orchestrator);

    with_middleware(Router::new().nest("/api/v1", api), request_timeout)
}

fn with_middleware(app: Router, request_timeout: Duration) -> Router {
    app.layer(TimeoutLayer::new(request_timeout))
        .layer(CatchPanicLayer::custom(panic_response))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedTask {
    pub id: TaskId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkRequest {
    pub link: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error_code: u16,
    pub description: String,
}

#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    /// Path segment that is not a task id.
    MalformedId(String),
    /// Request body that could not be decoded.
    BadRequest(String),
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl ApiError {
    fn status_and_description(&self) -> (StatusCode, String) {
        match self {
            ApiError::Service(ServiceError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::Service(ServiceError::TaskNotFound(_)) | ApiError::MalformedId(_) => {
                (StatusCode::NOT_FOUND, "task not found".into())
            }
            ApiError::Service(ServiceError::ServiceBusy) => {
                (StatusCode::TOO_MANY_REQUESTS, "service is busy".into())
            }
            ApiError::Service(err @ ServiceError::ResultNotReady(_)) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            ApiError::Service(err @ ServiceError::ResultUnavailable(_)) => {
                (StatusCode::GONE, err.to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, description) = self.status_and_description();
        match &self {
            ApiError::Internal(detail) => tracing::error!(error = %detail, "request failed"),
            other => tracing::debug!(error = ?other, status = status.as_u16(), "request rejected"),
        }

        let body = ErrorBody {
            error_code: status.as_u16(),
            description,
        };
        (status, Json(body)).into_response()
    }
}

fn parse_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::MalformedId(raw.to_string()))
}

pub async fn create_task(
    State(orchestrator): State<AppState>,
) -> Result<(StatusCode, Json<CreatedTask>), ApiError> {
    let id = orchestrator.new_task().await?;
    Ok((StatusCode::CREATED, Json(CreatedTask { id })))
}

pub async fn list_tasks(State(orchestrator): State<AppState>) -> Json<Vec<Task>> {
    Json(orchestrator.get_all_tasks().await)
}

pub async fn get_task(
    State(orchestrator): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(orchestrator.get_task(id).await?))
}

pub async fn add_links(
    State(orchestrator): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Vec<LinkRequest>>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let id = parse_id(&id)?;
    let Json(links) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let urls = links.into_iter().map(|l| l.link).collect();
    let task = orchestrator.add_links_to_task(id, urls).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_result(
    State(orchestrator): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let location = orchestrator.get_task_result(id).await?;

    let file = tokio::fs::File::open(&location.path).await.map_err(|err| {
        ApiError::Internal(format!(
            "failed to open archive {}: {err}",
            location.path.display()
        ))
    })?;
    let length = file.metadata().await.map(|m| m.len()).ok();

    let disposition = format!("attachment; filename=\"{}\"", location.file_name);
    let mut response = (
        [
            (header::CONTENT_TYPE, "application/zip".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response();
    if let Some(length) = length {
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    Ok(response)
}

pub async fn status(State(orchestrator): State<AppState>) -> Json<RuntimeStatus> {
    Json(orchestrator.status().await)
}
