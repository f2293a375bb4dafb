use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use constant_time_eq::constant_time_eq;

use crate::error::ErrorResponse;
use crate::AppState;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Middleware that requires a valid API key for the notification endpoints
///
/// If `api_key` is not configured, all requests are allowed.
/// If configured, the `X-API-Key` header must match it.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.config.api_key.as_deref() else {
        return next.run(request).await;
    };

    let provided_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided_key {
        Some(key) if key_matches(key, expected) => next.run(request).await,
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Invalid API key");
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::with_code(
                    "Invalid API key",
                    "INVALID_API_KEY",
                )),
            )
                .into_response()
        }
        None => {
            tracing::warn!(path = %request.uri().path(), "Missing API key");
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::with_code(
                    "API key required. Provide X-API-Key header.",
                    "MISSING_API_KEY",
                )),
            )
                .into_response()
        }
    }
}

/// Compare keys without short-circuiting on the first differing byte
fn key_matches(provided: &str, expected: &str) -> bool {
    constant_time_eq(provided.as_bytes(), expected.as_bytes())
}
