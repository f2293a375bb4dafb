use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::notifications::MobilePlatform;

/// Result of a hub operation that can be rejected without faulting
#[derive(Debug, Clone, PartialEq)]
pub enum HubResponse<T = ()> {
    Completed(T),
    Failed(Vec<String>),
}

impl<T> HubResponse<T> {
    pub fn failed(message: impl Into<String>) -> Self {
        HubResponse::Failed(vec![message.into()])
    }

    pub fn completed_with_success(&self) -> bool {
        matches!(self, HubResponse::Completed(_))
    }

    pub fn error_messages(&self) -> &[String] {
        match self {
            HubResponse::Completed(_) => &[],
            HubResponse::Failed(messages) => messages,
        }
    }

    /// Error messages one per line, `None` on success
    pub fn formatted_error_messages(&self) -> Option<String> {
        match self {
            HubResponse::Completed(_) => None,
            HubResponse::Failed(messages) => Some(messages.join("\n")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcomeState {
    /// Accepted by the hub for asynchronous delivery
    Enqueued,
    /// Test send with per-device results available
    DetailedStateAvailable,
    /// The hub dropped the notification
    Abandoned,
    Unknown,
}

/// What the hub reported after accepting a send
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationOutcome {
    pub state: NotificationOutcomeState,
    pub notification_id: Option<String>,
    pub tracking_id: Option<String>,
    /// Devices reached, only known for test sends
    pub success: u32,
    /// Devices that failed, only known for test sends
    pub failure: u32,
}

impl NotificationOutcome {
    pub fn with_state(state: NotificationOutcomeState) -> Self {
        Self {
            state,
            notification_id: None,
            tracking_id: None,
            success: 0,
            failure: 0,
        }
    }

    pub fn is_delivered_to_hub(&self) -> bool {
        !matches!(
            self.state,
            NotificationOutcomeState::Abandoned | NotificationOutcomeState::Unknown
        )
    }
}

/// A registration record as stored by the hub
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDescription {
    pub registration_id: String,

    /// `None` for platforms this API does not register (e.g. Baidu, ADM)
    pub platform: Option<MobilePlatform>,

    /// Hub element name, e.g. `AppleRegistrationDescription`
    pub description_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,

    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<DateTime<Utc>>,
}

/// Registration to create or overwrite on the hub
#[derive(Debug, Clone, PartialEq)]
pub struct NativeRegistration {
    pub registration_id: String,
    pub platform: MobilePlatform,
    pub handle: String,
    pub tags: BTreeSet<String>,
}

/// Native payload to fan out to matching registrations
#[derive(Debug, Clone, PartialEq)]
pub struct NativeNotification {
    pub platform: MobilePlatform,
    pub payload: String,
    pub tag_expression: Option<String>,
}
