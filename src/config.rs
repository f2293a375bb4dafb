use config::{Case, Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// API key for the notification endpoints (if not set, no auth required)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Upper bound on handling a single request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Notification hub connection settings
    pub notification_hub: NotificationHubConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationHubConfig {
    /// `Endpoint=sb://...;SharedAccessKeyName=...;SharedAccessKey=...`
    pub connection_string: String,

    /// Hub name inside the namespace
    pub hub_name: String,

    /// REST api-version query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Number of registrations requested when listing devices
    #[serde(default = "default_list_page_size")]
    pub list_page_size: u32,

    /// Send through the hub's debug path, which reports per-device outcomes.
    /// The hub throttles these sends, so leave it off in production.
    #[serde(default)]
    pub enable_test_send: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_api_version() -> String {
    "2015-01".to_string()
}

fn default_list_page_size() -> u32 {
    100
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            .set_default("host", default_host())?
            .set_default("port", default_port())?
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config.local").required(false))
            // NHUB_NOTIFICATION_HUB__HUB_NAME -> notification_hub.hub_name
            .add_source(
                Environment::with_prefix("NHUB")
                    .prefix_separator("_")
                    .separator("__")
                    .convert_case(Case::Snake)
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
