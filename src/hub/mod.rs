pub mod atom;
mod client;
pub mod connection;
pub mod models;
mod proxy;

#[cfg(test)]
pub mod fake;

pub use client::NotificationHubClient;
pub use models::{HubResponse, RegistrationDescription};
pub use proxy::NotificationHubProxy;

use async_trait::async_trait;
use axum::http::StatusCode;
use thiserror::Error;

use crate::error::HttpError;
use models::{NativeNotification, NativeRegistration, NotificationOutcome};

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Notification hub request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Notification hub refused credentials ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Registration not found: {0}")]
    NotFound(String),

    #[error("Registration is gone: {0}")]
    Gone(String),

    #[error("Notification hub rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid notification hub response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    InvalidArgument(String),
}

impl HttpError for HubError {
    fn status_code(&self) -> StatusCode {
        match self {
            HubError::Transport(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            HubError::NotFound(_) => StatusCode::NOT_FOUND,
            HubError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            HubError::Transport(_)
            | HubError::Unauthorized { .. }
            | HubError::Gone(_)
            | HubError::Rejected { .. }
            | HubError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_code(&self) -> Option<&'static str> {
        Some(match self {
            HubError::Transport(e) if e.is_timeout() => "HUB_TIMEOUT",
            HubError::Transport(_) => "HUB_UNREACHABLE",
            HubError::Unauthorized { .. } => "HUB_UNAUTHORIZED",
            HubError::NotFound(_) => "REGISTRATION_NOT_FOUND",
            HubError::Gone(_) => "REGISTRATION_GONE",
            HubError::Rejected { .. } => "HUB_REJECTED",
            HubError::InvalidResponse(_) => "HUB_INVALID_RESPONSE",
            HubError::InvalidArgument(_) => "INVALID_ARGUMENT",
        })
    }
}

crate::impl_into_response!(HubError);

/// Operations the notification hub exposes to this API
#[async_trait]
pub trait HubClient: Send + Sync {
    /// Mint a fresh registration id
    async fn create_registration_id(&self) -> Result<String, HubError>;

    /// Create the registration, or overwrite it if the id already exists
    async fn create_or_update_registration(
        &self,
        registration: &NativeRegistration,
    ) -> Result<(), HubError>;

    async fn delete_registration(&self, registration_id: &str) -> Result<(), HubError>;

    async fn send_notification(
        &self,
        notification: &NativeNotification,
    ) -> Result<NotificationOutcome, HubError>;

    /// First page of registrations, at most `top` entries
    async fn get_registrations(&self, top: u32)
        -> Result<Vec<RegistrationDescription>, HubError>;
}
