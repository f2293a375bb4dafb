use std::collections::BTreeSet;
use std::sync::Arc;

use super::models::{
    HubResponse, NativeNotification, NativeRegistration, NotificationOutcome,
    RegistrationDescription,
};
use super::{HubClient, HubError};
use crate::notifications::{DeviceRegistration, Notification};

/// Hub limit on tags OR-ed together in one send
pub const MAX_OR_TAGS: usize = 20;

const REGISTRATION_GONE_MESSAGE: &str =
    "Registration failed because of HttpStatusCode.Gone. PLEASE REGISTER AGAIN.";
const NOT_SENT_MESSAGE: &str = "Notification was not sent due to issue. Please send again.";

/// Adapter between the HTTP API and the notification hub
pub struct NotificationHubProxy {
    client: Arc<dyn HubClient>,
    list_page_size: u32,
}

impl NotificationHubProxy {
    pub fn new(client: Arc<dyn HubClient>, list_page_size: u32) -> Self {
        Self {
            client,
            list_page_size,
        }
    }

    pub async fn create_registration_id(&self) -> Result<String, HubError> {
        self.client.create_registration_id().await
    }

    pub async fn delete_registration(&self, registration_id: &str) -> Result<(), HubError> {
        self.client.delete_registration(registration_id).await
    }

    /// Bind the device to `registration_id`, replacing any previous binding.
    ///
    /// Rejections by the hub come back as `HubResponse::Failed`; transport and
    /// credential failures are returned as errors.
    pub async fn register_for_push_notifications(
        &self,
        registration_id: &str,
        device: DeviceRegistration,
    ) -> Result<HubResponse, HubError> {
        let registration = NativeRegistration {
            registration_id: registration_id.to_string(),
            platform: device.platform,
            handle: device.handle,
            tags: device.tags.into_iter().collect::<BTreeSet<_>>(),
        };

        match self.client.create_or_update_registration(&registration).await {
            Ok(()) => Ok(HubResponse::Completed(())),
            Err(HubError::Gone(_)) => Ok(HubResponse::failed(REGISTRATION_GONE_MESSAGE)),
            Err(HubError::NotFound(id)) => Ok(HubResponse::failed(format!(
                "Registration {} does not exist",
                id
            ))),
            Err(HubError::Rejected { message, .. }) | Err(HubError::InvalidArgument(message)) => {
                Ok(HubResponse::failed(message))
            }
            Err(e) => Err(e),
        }
    }

    /// Submit a notification for fan-out. Success means the hub accepted it,
    /// not that any device received it.
    pub async fn send_notification(
        &self,
        notification: Notification,
    ) -> Result<HubResponse<NotificationOutcome>, HubError> {
        let tag_expression = match tag_expression(&notification) {
            Ok(expression) => expression,
            Err(message) => return Ok(HubResponse::failed(message)),
        };

        let native = NativeNotification {
            platform: notification.platform,
            payload: notification.content,
            tag_expression,
        };

        match self.client.send_notification(&native).await {
            Ok(outcome) if outcome.is_delivered_to_hub() => Ok(HubResponse::Completed(outcome)),
            Ok(outcome) => {
                tracing::warn!(state = ?outcome.state, "Notification hub did not accept send");
                Ok(HubResponse::failed(NOT_SENT_MESSAGE))
            }
            Err(HubError::Rejected { status, message }) => Ok(HubResponse::Failed(vec![
                format!("Notification hub returned status {}", status),
                message,
            ])),
            Err(HubError::InvalidArgument(message)) => Ok(HubResponse::failed(message)),
            Err(e) => Err(e),
        }
    }

    pub async fn get_registered_devices(&self) -> Result<Vec<RegistrationDescription>, HubError> {
        self.client.get_registrations(self.list_page_size).await
    }
}

/// Target expression for a send: explicit expression, or the tags OR-ed together
fn tag_expression(notification: &Notification) -> Result<Option<String>, String> {
    match (&notification.tag_expression, notification.tags.is_empty()) {
        (Some(_), false) => Err("Specify either tags or tagExpression, not both".to_string()),
        (Some(expression), true) if expression.trim().is_empty() => {
            Err("tagExpression must not be empty".to_string())
        }
        (Some(expression), true) => Ok(Some(expression.clone())),
        (None, true) => Ok(None),
        (None, false) => {
            let tags: BTreeSet<&str> = notification.tags.iter().map(String::as_str).collect();
            if tags.len() > MAX_OR_TAGS {
                return Err(format!(
                    "A notification can target at most {} tags, got {}",
                    MAX_OR_TAGS,
                    tags.len()
                ));
            }
            Ok(Some(tags.into_iter().collect::<Vec<_>>().join(" || ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::fake::FakeHubClient;
    use crate::hub::models::NotificationOutcomeState;
    use crate::notifications::MobilePlatform;

    fn proxy(fake: &Arc<FakeHubClient>) -> NotificationHubProxy {
        NotificationHubProxy::new(fake.clone(), 50)
    }

    fn device(tags: &[&str]) -> DeviceRegistration {
        DeviceRegistration {
            platform: MobilePlatform::Apns,
            handle: "token".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn notification(tags: &[&str], expression: Option<&str>) -> Notification {
        Notification {
            platform: MobilePlatform::Gcm,
            content: r#"{"data":{"msg":"hi"}}"#.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            tag_expression: expression.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_register_dedupes_tags() {
        let fake = Arc::new(FakeHubClient::default());
        let response = proxy(&fake)
            .register_for_push_notifications("reg-1", device(&["b", "a", "b"]))
            .await
            .unwrap();

        assert!(response.completed_with_success());
        let upserts = fake.upserts();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].registration_id, "reg-1");
        assert_eq!(
            upserts[0].tags.iter().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[tokio::test]
    async fn test_register_gone_asks_to_register_again() {
        let fake = Arc::new(FakeHubClient::default());
        fake.fail_next(HubError::Gone("reg-1".to_string()));

        let response = proxy(&fake)
            .register_for_push_notifications("reg-1", device(&[]))
            .await
            .unwrap();

        assert_eq!(
            response.formatted_error_messages().as_deref(),
            Some(REGISTRATION_GONE_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_register_credential_failure_propagates() {
        let fake = Arc::new(FakeHubClient::default());
        fake.fail_next(HubError::Unauthorized {
            status: 401,
            message: "expired token".to_string(),
        });

        let result = proxy(&fake)
            .register_for_push_notifications("reg-1", device(&[]))
            .await;

        assert!(matches!(result, Err(HubError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_send_ors_tags() {
        let fake = Arc::new(FakeHubClient::default());
        let response = proxy(&fake)
            .send_notification(notification(&["sports", "news"], None))
            .await
            .unwrap();

        assert!(response.completed_with_success());
        assert_eq!(
            fake.sends()[0].tag_expression.as_deref(),
            Some("news || sports")
        );
    }

    #[tokio::test]
    async fn test_send_passes_expression_verbatim() {
        let fake = Arc::new(FakeHubClient::default());
        proxy(&fake)
            .send_notification(notification(&[], Some("(a && b) || !c")))
            .await
            .unwrap();

        assert_eq!(
            fake.sends()[0].tag_expression.as_deref(),
            Some("(a && b) || !c")
        );
    }

    #[tokio::test]
    async fn test_send_with_too_many_tags_fails_locally() {
        let fake = Arc::new(FakeHubClient::default());
        let tags: Vec<String> = (0..=MAX_OR_TAGS).map(|i| format!("t{}", i)).collect();
        let tags: Vec<&str> = tags.iter().map(String::as_str).collect();

        let response = proxy(&fake)
            .send_notification(notification(&tags, None))
            .await
            .unwrap();

        assert!(!response.completed_with_success());
        assert!(fake.sends().is_empty());
    }

    #[tokio::test]
    async fn test_send_with_tags_and_expression_fails_locally() {
        let fake = Arc::new(FakeHubClient::default());
        let response = proxy(&fake)
            .send_notification(notification(&["a"], Some("b")))
            .await
            .unwrap();

        assert_eq!(
            response.error_messages(),
            &["Specify either tags or tagExpression, not both".to_string()]
        );
        assert!(fake.sends().is_empty());
    }

    #[tokio::test]
    async fn test_send_abandoned_outcome_is_a_failure() {
        let fake = Arc::new(FakeHubClient::default());
        fake.set_outcome(NotificationOutcomeState::Abandoned);

        let response = proxy(&fake)
            .send_notification(notification(&[], None))
            .await
            .unwrap();

        assert_eq!(
            response.formatted_error_messages().as_deref(),
            Some(NOT_SENT_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_send_rejection_keeps_hub_message() {
        let fake = Arc::new(FakeHubClient::default());
        fake.fail_next(HubError::Rejected {
            status: 400,
            message: "The payload is not valid JSON".to_string(),
        });

        let response = proxy(&fake)
            .send_notification(notification(&[], None))
            .await
            .unwrap();

        assert_eq!(
            response.formatted_error_messages().as_deref(),
            Some("Notification hub returned status 400\nThe payload is not valid JSON")
        );
    }

    #[tokio::test]
    async fn test_delete_forwards_id_verbatim() {
        let fake = Arc::new(FakeHubClient::default());
        proxy(&fake)
            .delete_registration("unknown id/with slash")
            .await
            .unwrap();

        assert_eq!(fake.deletes(), vec!["unknown id/with slash".to_string()]);
    }

    #[tokio::test]
    async fn test_list_uses_page_size() {
        let fake = Arc::new(FakeHubClient::default());
        proxy(&fake).get_registered_devices().await.unwrap();
        assert_eq!(fake.list_calls(), vec![50]);
    }
}
