use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Push notification service a device is registered with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MobilePlatform {
    /// Windows Push Notification Services
    Wns,
    /// Microsoft Push Notification Service (Windows Phone)
    Mpns,
    /// Apple Push Notification service
    Apns,
    /// Google Cloud Messaging / Firebase
    Gcm,
}

impl MobilePlatform {
    pub fn as_str(self) -> &'static str {
        match self {
            MobilePlatform::Wns => "wns",
            MobilePlatform::Mpns => "mpns",
            MobilePlatform::Apns => "apns",
            MobilePlatform::Gcm => "gcm",
        }
    }
}

impl fmt::Display for MobilePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `PUT /enable/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    pub platform: MobilePlatform,

    /// Device push token (APNs device token, GCM registration id or WNS/MPNS channel URI)
    pub handle: String,

    /// Labels used to target sends at this device
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Body of `POST /send`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Selects the native payload format
    pub platform: MobilePlatform,

    /// Native payload: JSON for apns/gcm, XML for wns/mpns
    pub content: String,

    /// Deliver to devices carrying any of these tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Full tag expression, e.g. `(sports && !news) || weather`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_expression: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_PLATFORMS: [MobilePlatform; 4] = [
        MobilePlatform::Wns,
        MobilePlatform::Mpns,
        MobilePlatform::Apns,
        MobilePlatform::Gcm,
    ];

    #[test]
    fn test_platform_round_trip_keeps_name() {
        for platform in ALL_PLATFORMS {
            let registration = DeviceRegistration {
                platform,
                handle: "token".to_string(),
                tags: vec!["news".to_string()],
            };

            let json = serde_json::to_value(&registration).unwrap();
            assert_eq!(json["platform"], platform.as_str());

            let back: DeviceRegistration = serde_json::from_value(json).unwrap();
            assert_eq!(back, registration);
        }
    }

    #[test]
    fn test_unknown_platform_is_rejected() {
        let result = serde_json::from_str::<DeviceRegistration>(
            r#"{"platform":"blackberry","handle":"abc","tags":[]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_numeric_platform_is_rejected() {
        let result =
            serde_json::from_str::<DeviceRegistration>(r#"{"platform":2,"handle":"abc"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_tags_default_to_empty() {
        let registration: DeviceRegistration =
            serde_json::from_str(r#"{"platform":"apns","handle":"abc"}"#).unwrap();
        assert!(registration.tags.is_empty());
    }

    #[test]
    fn test_notification_accepts_tag_expression() {
        let notification: Notification = serde_json::from_str(
            r#"{"platform":"gcm","content":"{}","tagExpression":"a && b"}"#,
        )
        .unwrap();
        assert_eq!(notification.tag_expression.as_deref(), Some("a && b"));
        assert!(notification.tags.is_empty());
    }
}
