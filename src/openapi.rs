use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ErrorResponse;
use crate::health::{self, HealthResponse};
use crate::hub::RegistrationDescription;
use crate::notifications::handlers;
use crate::notifications::{DeviceRegistration, MobilePlatform, Notification};

/// OpenAPI documentation for the notification hub API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Notification Hub API",
        version = "1.0.0",
        description = "Registers devices with an Azure notification hub and sends push notifications through it.",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    paths(
        health::health,
        handlers::create_push_registration_id,
        handlers::unregister_from_notifications,
        handlers::register_for_push_notifications,
        handlers::send_notification,
        handlers::get_registered_devices,
    ),
    tags(
        (name = "notifications", description = "Device registration and push notification sends"),
        (name = "health", description = "Liveness")
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            MobilePlatform,
            DeviceRegistration,
            Notification,
            RegistrationDescription,
        )
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
