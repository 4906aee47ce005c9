//! HTTP handlers
//!
//! Every handler answers with the same JSON envelope. Failures carry the
//! error chain in `error`; the status code follows the error kind.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use envpack_core::{ChartMetadata, ScaleAction};
use envpack_kube::ReleaseError;
use serde::{Deserialize, Serialize};

use super::AppState;

/// Response wrapper for consistent API format
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<String>>,
}

impl ApiResponse {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
            data: None,
        }
    }

    fn with_data(mut self, data: Vec<String>) -> Self {
        self.data = Some(data);
        self
    }

    fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: Some(error.into()),
            data: None,
        }
    }
}

fn respond(status: StatusCode, body: ApiResponse) -> Response {
    (status, Json(body)).into_response()
}

/// Status code for a release error kind
pub fn status_for(err: &ReleaseError) -> StatusCode {
    match err.kind() {
        "not_found" => StatusCode::NOT_FOUND,
        "already_exists" | "busy" => StatusCode::CONFLICT,
        "invalid_name" => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn release_failure(message: &str, err: ReleaseError) -> Response {
    let status = status_for(&err);
    tracing::warn!(kind = err.kind(), error = %err.report(), "{}", message);
    respond(status, ApiResponse::failure(message, err.report()))
}

fn invalid_payload(err: serde_json::Error) -> Response {
    respond(
        StatusCode::BAD_REQUEST,
        ApiResponse::failure("Invalid request payload", err.to_string()),
    )
}

fn missing_fields() -> Response {
    respond(
        StatusCode::BAD_REQUEST,
        ApiResponse::message("Missing required fields in request"),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub chart_metadata: ChartMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub action: Option<ScaleAction>,
}

/// POST /create-env
pub async fn create_env(State(state): State<AppState>, body: Bytes) -> Response {
    let request: CreateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return invalid_payload(e),
    };
    let metadata = request.chart_metadata;
    if metadata.name.is_empty() {
        return missing_fields();
    }

    match state.manager.provision(&metadata).await {
        Ok(provisioned) => respond(
            StatusCode::CREATED,
            ApiResponse::message(format!(
                "Environment {} created and installed from {}",
                metadata.name,
                provisioned.chart.path.display()
            )),
        ),
        Err(e @ ReleaseError::BackendInstallFailed { .. }) => {
            release_failure("Failed to install environment", e)
        }
        Err(e) => release_failure("Failed to create environment", e),
    }
}

/// POST /update-env/{name}
pub async fn update_env(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    if name.is_empty() {
        return missing_fields();
    }

    match state.manager.chart_exists(&name) {
        Ok(true) => {}
        Ok(false) => {
            return respond(
                StatusCode::BAD_REQUEST,
                ApiResponse::message(
                    "Environment does not exist, use create-env for a brand new environment",
                ),
            );
        }
        Err(e) => return release_failure("Failed to update environment", e),
    }

    let request: UpdateRequest = if body.iter().all(u8::is_ascii_whitespace) {
        UpdateRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => return invalid_payload(e),
        }
    };

    let result = match request.action {
        Some(action) => state.manager.set_scale(&name, action).await,
        None => state.manager.upgrade(&name).await,
    };

    match result {
        Ok(release) => respond(
            StatusCode::OK,
            ApiResponse::message(format!(
                "Environment {} successfully updated to revision {}",
                name, release.revision
            )),
        ),
        Err(e @ (ReleaseError::ValuesReadFailed { .. } | ReleaseError::ValuesWriteFailed { .. })) => {
            release_failure("Updating values.yaml failed", e)
        }
        Err(e) => release_failure("Failed to update environment", e),
    }
}

/// POST /delete-env/{name}
pub async fn delete_env(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    if name.is_empty() {
        return missing_fields();
    }

    match state.manager.uninstall(&name).await {
        Ok(response) => respond(
            StatusCode::OK,
            ApiResponse::message(format!("Environment {} deleted: {}", name, response.info)),
        ),
        Err(e) => release_failure("Failed to delete environment", e),
    }
}

/// GET /list
pub async fn list_envs(State(state): State<AppState>) -> Response {
    match state.manager.list().await {
        Ok(releases) if releases.is_empty() => respond(
            StatusCode::OK,
            ApiResponse::message("No envpack related environments"),
        ),
        Ok(releases) => respond(
            StatusCode::OK,
            ApiResponse::message("Listing envpack related environments")
                .with_data(releases.into_iter().map(|r| r.name).collect()),
        ),
        Err(e) => release_failure("Failed to list environments", e),
    }
}

/// GET /health-check
pub async fn health_check() -> Response {
    respond(StatusCode::OK, ApiResponse::message("API is healthy"))
}
