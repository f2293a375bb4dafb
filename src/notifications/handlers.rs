use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ErrorResponse;
use crate::extractors::JsonBody;
use crate::hub::{HubError, HubResponse, RegistrationDescription};
use crate::AppState;

use super::models::{DeviceRegistration, Notification};

/// Prefix of the 400 body when the hub rejects a registration or send
pub const HUB_FAILURE_PREFIX: &str = "An error occurred while sending push notification: ";

/// 200 with an empty body, or 400 carrying the hub's error messages
fn hub_response<T>(result: HubResponse<T>) -> Response {
    match result.formatted_error_messages() {
        None => StatusCode::OK.into_response(),
        Some(errors) => {
            tracing::warn!(
                count = result.error_messages().len(),
                errors = %errors,
                "Notification hub rejected request"
            );
            (
                StatusCode::BAD_REQUEST,
                Json(format!("{}{}", HUB_FAILURE_PREFIX, errors)),
            )
                .into_response()
        }
    }
}

/// GET /register - Get a new registration id
#[utoipa::path(
    get,
    path = "/api/notifications/register",
    tag = "notifications",
    responses(
        (status = 200, description = "Registration id minted by the hub", body = String),
        (status = 502, description = "Hub unreachable or refused credentials", body = ErrorResponse),
        (status = 504, description = "Hub timed out", body = ErrorResponse)
    )
)]
pub async fn create_push_registration_id(
    State(state): State<AppState>,
) -> Result<Json<String>, HubError> {
    let registration_id = state.hub.create_registration_id().await?;
    tracing::info!(registration_id = %registration_id, "Created push registration id");
    Ok(Json(registration_id))
}

/// DELETE /unregister/{registrationId} - Stop receiving push notifications
#[utoipa::path(
    delete,
    path = "/api/notifications/unregister/{registration_id}",
    tag = "notifications",
    params(("registration_id" = String, Path, description = "Registration id to delete")),
    responses(
        (status = 200, description = "Registration deleted"),
        (status = 404, description = "Hub does not know the registration", body = ErrorResponse),
        (status = 502, description = "Hub unreachable or refused credentials", body = ErrorResponse)
    )
)]
pub async fn unregister_from_notifications(
    State(state): State<AppState>,
    Path(registration_id): Path<String>,
) -> Result<StatusCode, HubError> {
    state.hub.delete_registration(&registration_id).await?;
    tracing::info!(registration_id = %registration_id, "Unregistered device");
    Ok(StatusCode::OK)
}

/// PUT /enable/{id} - Register a device to receive push notifications
#[utoipa::path(
    put,
    path = "/api/notifications/enable/{id}",
    tag = "notifications",
    params(("id" = String, Path, description = "Registration id from GET /register")),
    request_body = DeviceRegistration,
    responses(
        (status = 200, description = "Device registered"),
        (status = 400, description = "Hub rejected the registration", body = String),
        (status = 422, description = "Malformed body or unknown platform", body = ErrorResponse),
        (status = 502, description = "Hub unreachable or refused credentials", body = ErrorResponse)
    )
)]
pub async fn register_for_push_notifications(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(device): JsonBody<DeviceRegistration>,
) -> Result<Response, HubError> {
    let platform = device.platform;
    let result = state
        .hub
        .register_for_push_notifications(&id, device)
        .await?;

    if result.completed_with_success() {
        tracing::info!(registration_id = %id, platform = %platform, "Registered device");
    }
    Ok(hub_response(result))
}

/// POST /send - Send a push notification
#[utoipa::path(
    post,
    path = "/api/notifications/send",
    tag = "notifications",
    request_body = Notification,
    responses(
        (status = 200, description = "Hub accepted the notification"),
        (status = 400, description = "Hub rejected the notification", body = String),
        (status = 422, description = "Malformed body or unknown platform", body = ErrorResponse),
        (status = 502, description = "Hub unreachable or refused credentials", body = ErrorResponse)
    )
)]
pub async fn send_notification(
    State(state): State<AppState>,
    JsonBody(notification): JsonBody<Notification>,
) -> Result<Response, HubError> {
    let platform = notification.platform;
    let result = state.hub.send_notification(notification).await?;

    if let HubResponse::Completed(outcome) = &result {
        tracing::info!(
            platform = %platform,
            state = ?outcome.state,
            tracking_id = ?outcome.tracking_id,
            "Sent push notification"
        );
    }
    Ok(hub_response(result))
}

/// GET /devices - List registrations known to the hub
#[utoipa::path(
    get,
    path = "/api/notifications/devices",
    tag = "notifications",
    responses(
        (status = 200, description = "Registrations", body = Vec<RegistrationDescription>),
        (status = 502, description = "Hub unreachable or refused credentials", body = ErrorResponse)
    )
)]
pub async fn get_registered_devices(
    State(state): State<AppState>,
) -> Result<Json<Vec<RegistrationDescription>>, HubError> {
    let registrations = state.hub.get_registered_devices().await?;
    Ok(Json(registrations))
}
