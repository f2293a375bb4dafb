use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ErrorResponse;

/// JSON body extractor whose rejections use the API's error format.
///
/// Payloads that fail to deserialize (e.g. an unknown platform name) are
/// answered here, before any handler runs.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = JsonBodyRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(JsonBodyRejection(rejection)),
        }
    }
}

/// Rejection for malformed request bodies
#[derive(Debug)]
pub struct JsonBodyRejection(pub JsonRejection);

impl IntoResponse for JsonBodyRejection {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let code = if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
            "UNSUPPORTED_MEDIA_TYPE"
        } else {
            "INVALID_REQUEST_BODY"
        };

        tracing::warn!(status = %status, error = %self.0.body_text(), "Rejected request body");

        (
            status,
            Json(ErrorResponse::with_code(self.0.body_text(), code)),
        )
            .into_response()
    }
}
