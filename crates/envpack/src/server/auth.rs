//! API key middleware
//!
//! Each mutating route has its own key, sent in the `X-API-Key` header.
//! Listing and the health check are open. Any other path is rejected.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use envpack_kube::ApiKeys;

use super::handlers::ApiResponse;

pub const API_KEY_HEADER: &str = "x-api-key";

/// What a path requires before it reaches a handler
#[derive(Debug, PartialEq, Eq)]
pub enum Access<'a> {
    Open,
    Key(&'a str),
    Deny,
}

/// Resolve the access rule for a request path
pub fn access_for<'a>(path: &str, keys: &'a ApiKeys) -> Access<'a> {
    match path {
        "/list" | "/health-check" => Access::Open,
        "/create-env" => Access::Key(&keys.create),
        p if p.starts_with("/update-env/") => Access::Key(&keys.update),
        p if p.starts_with("/delete-env/") => Access::Key(&keys.delete),
        _ => Access::Deny,
    }
}

pub async fn require_api_key(
    State(keys): State<Arc<ApiKeys>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    let authorized = match access_for(path, &keys) {
        Access::Open => true,
        Access::Key(expected) => req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|provided| provided == expected),
        Access::Deny => false,
    };

    if !authorized {
        tracing::warn!(method = %req.method(), path = %path, "rejected unauthorized request");
        return unauthorized();
    }

    next.run(req).await
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse {
            message: "Unauthorized".to_string(),
            error: None,
            data: None,
        }),
    )
        .into_response()
}
