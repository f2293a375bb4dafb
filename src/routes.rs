use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    BoxError, Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::health::health;
use crate::middleware::require_api_key;
use crate::notifications::handlers as notification_handlers;
use crate::openapi::swagger_ui;
use crate::AppState;

/// Handle request timeout errors
async fn handle_timeout_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {}", err),
        )
    }
}

/// Build the push notification routes (protected by API key auth)
fn notification_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            get(notification_handlers::create_push_registration_id),
        )
        .route(
            "/unregister/{registration_id}",
            delete(notification_handlers::unregister_from_notifications),
        )
        .route(
            "/enable/{id}",
            put(notification_handlers::register_for_push_notifications),
        )
        .route("/send", post(notification_handlers::send_notification))
        .route(
            "/devices",
            get(notification_handlers::get_registered_devices),
        )
        .layer(middleware::from_fn_with_state(state, require_api_key))
}

/// Build the complete application router
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .nest("/api/notifications", notification_routes(state.clone()))
        .merge(swagger_ui())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .timeout(timeout),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
