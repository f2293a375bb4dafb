use async_trait::async_trait;
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE, IF_MATCH, LOCATION},
    Client, RequestBuilder, Response, StatusCode, Url,
};

use super::atom;
use super::connection::{ConnectionString, ConnectionStringError, SasTokenProvider};
use super::models::{
    NativeNotification, NativeRegistration, NotificationOutcome, NotificationOutcomeState,
    RegistrationDescription,
};
use super::{HubClient, HubError};
use crate::config::NotificationHubConfig;
use crate::notifications::MobilePlatform;

const ATOM_ENTRY_CONTENT_TYPE: &str = "application/atom+xml;type=entry;charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";
const XML_CONTENT_TYPE: &str = "application/xml;charset=utf-8";

/// REST client for a single Azure notification hub
pub struct NotificationHubClient {
    client: Client,
    hub_url: String,
    api_version: String,
    signer: SasTokenProvider,
    test_send: bool,
}

impl NotificationHubClient {
    pub fn new(
        client: Client,
        config: &NotificationHubConfig,
    ) -> Result<Self, ConnectionStringError> {
        let connection: ConnectionString = config.connection_string.parse()?;

        Ok(Self {
            client,
            hub_url: connection.hub_url(&config.hub_name),
            api_version: config.api_version.clone(),
            signer: connection.signer()?,
            test_send: config.enable_test_send,
        })
    }

    /// Absolute URL of a hub resource, with the api-version appended
    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.hub_url,
            path,
            urlencoding::encode(&self.api_version)
        )
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(AUTHORIZATION, self.signer.token(&self.hub_url))
    }

    /// Map a non-success status to the matching HubError.
    ///
    /// 404 and 410 only refer to a registration when `registration_id` is set.
    /// On hub-level calls they mean the hub itself is missing or misconfigured.
    async fn check(
        response: Response,
        registration_id: Option<&str>,
    ) -> Result<Response, HubError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = atom::parse_error_detail(&body)
            .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
        tracing::debug!(
            status = %status,
            registration_id = ?registration_id,
            message = %message,
            "Notification hub error"
        );

        Err(match (status, registration_id) {
            (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => HubError::Unauthorized {
                status: status.as_u16(),
                message,
            },
            (StatusCode::NOT_FOUND, Some(id)) => HubError::NotFound(id.to_string()),
            (StatusCode::GONE, Some(id)) => HubError::Gone(id.to_string()),
            _ => HubError::Rejected {
                status: status.as_u16(),
                message,
            },
        })
    }

    fn registration_path(registration_id: &str) -> String {
        format!("registrations/{}", urlencoding::encode(registration_id))
    }
}

/// Last path segment of a `Location` header, e.g. `.../registrationIDs/<id>?api-version=...`
fn id_from_location(location: &str) -> Option<String> {
    let url = Url::parse(location).ok()?;
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    urlencoding::decode(segment).ok().map(|s| s.into_owned())
}

fn header_string(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl HubClient for NotificationHubClient {
    async fn create_registration_id(&self) -> Result<String, HubError> {
        let response = self
            .authorized(self.client.post(self.endpoint("registrationIDs/")))
            .body("")
            .send()
            .await?;
        let response = Self::check(response, None).await?;

        let location = header_string(&response, LOCATION.as_str()).ok_or_else(|| {
            HubError::InvalidResponse("registration id response without Location".to_string())
        })?;
        let registration_id = id_from_location(&location).ok_or_else(|| {
            HubError::InvalidResponse(format!("unexpected Location header: {}", location))
        })?;

        tracing::debug!(registration_id = %registration_id, "Created registration id");
        Ok(registration_id)
    }

    async fn create_or_update_registration(
        &self,
        registration: &NativeRegistration,
    ) -> Result<(), HubError> {
        if registration.handle.trim().is_empty() {
            return Err(HubError::InvalidArgument(
                "Device handle must not be empty".to_string(),
            ));
        }

        let path = Self::registration_path(&registration.registration_id);
        let response = self
            .authorized(self.client.put(self.endpoint(&path)))
            .header(CONTENT_TYPE, ATOM_ENTRY_CONTENT_TYPE)
            .body(atom::registration_entry(registration))
            .send()
            .await?;
        Self::check(response, Some(&registration.registration_id)).await?;

        tracing::debug!(
            registration_id = %registration.registration_id,
            platform = %registration.platform,
            tags = registration.tags.len(),
            "Upserted registration"
        );
        Ok(())
    }

    async fn delete_registration(&self, registration_id: &str) -> Result<(), HubError> {
        let path = Self::registration_path(registration_id);
        let response = self
            .authorized(self.client.delete(self.endpoint(&path)))
            .header(IF_MATCH, "*")
            .send()
            .await?;
        Self::check(response, Some(registration_id)).await?;

        tracing::debug!(registration_id, "Deleted registration");
        Ok(())
    }

    async fn send_notification(
        &self,
        notification: &NativeNotification,
    ) -> Result<NotificationOutcome, HubError> {
        if notification.payload.is_empty() {
            return Err(HubError::InvalidArgument(
                "Notification content must not be empty".to_string(),
            ));
        }

        let mut url = self.endpoint("messages/");
        if self.test_send {
            url.push_str("&test");
        }

        let mut request = self.authorized(self.client.post(url));
        request = match notification.platform {
            MobilePlatform::Apns => request
                .header("ServiceBusNotification-Format", "apple")
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE),
            MobilePlatform::Gcm => request
                .header("ServiceBusNotification-Format", "gcm")
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE),
            MobilePlatform::Wns => {
                let wns_type = atom::wns_type(&notification.payload);
                let content_type = if wns_type == "wns/raw" {
                    "application/octet-stream"
                } else {
                    XML_CONTENT_TYPE
                };
                request
                    .header("ServiceBusNotification-Format", "windows")
                    .header("X-WNS-Type", wns_type)
                    .header(CONTENT_TYPE, content_type)
            }
            MobilePlatform::Mpns => {
                let (target, class) = atom::mpns_headers(&notification.payload);
                let request = request
                    .header("ServiceBusNotification-Format", "windowsphone")
                    .header("X-NotificationClass", class)
                    .header(CONTENT_TYPE, XML_CONTENT_TYPE);
                match target {
                    Some(target) => request.header("X-WindowsPhone-Target", target),
                    None => request,
                }
            }
        };
        if let Some(tags) = notification.tag_expression.as_deref() {
            request = request.header("ServiceBusNotification-Tags", tags);
        }

        let response = request
            .body(notification.payload.clone())
            .send()
            .await?;
        let response = Self::check(response, None).await?;

        let status = response.status();
        let notification_id =
            header_string(&response, LOCATION.as_str()).and_then(|l| id_from_location(&l));
        let tracking_id = header_string(&response, "TrackingId");

        let mut outcome = if self.test_send {
            let body = response.text().await?;
            let (success, failure) = atom::parse_outcome_counts(&body)
                .map_err(|e| HubError::InvalidResponse(e.to_string()))?;
            let state = if success == 0 && failure > 0 {
                NotificationOutcomeState::Abandoned
            } else {
                NotificationOutcomeState::DetailedStateAvailable
            };
            NotificationOutcome {
                success,
                failure,
                ..NotificationOutcome::with_state(state)
            }
        } else if status == StatusCode::CREATED {
            NotificationOutcome::with_state(NotificationOutcomeState::Enqueued)
        } else {
            NotificationOutcome::with_state(NotificationOutcomeState::Unknown)
        };
        outcome.notification_id = notification_id;
        outcome.tracking_id = tracking_id;

        tracing::debug!(
            platform = %notification.platform,
            state = ?outcome.state,
            tracking_id = ?outcome.tracking_id,
            "Notification submitted"
        );
        Ok(outcome)
    }

    async fn get_registrations(
        &self,
        top: u32,
    ) -> Result<Vec<RegistrationDescription>, HubError> {
        let url = format!("{}&$top={}", self.endpoint("registrations/"), top);
        let response = self.authorized(self.client.get(url)).send().await?;
        let response = Self::check(response, None).await?;

        let body = response.text().await?;
        let registrations = atom::parse_registration_feed(&body)
            .map_err(|e| HubError::InvalidResponse(e.to_string()))?;

        tracing::debug!(count = registrations.len(), "Fetched registrations");
        Ok(registrations)
    }
}
