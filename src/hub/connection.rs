use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as base64_engine, Engine};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of a generated shared access signature
pub const SAS_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Error, Debug, PartialEq)]
pub enum ConnectionStringError {
    #[error("Connection string is missing {0}")]
    MissingField(&'static str),

    #[error("Connection string segment is not key=value: {0}")]
    MalformedSegment(String),

    #[error("Connection string endpoint is not a valid URL: {0}")]
    InvalidEndpoint(String),

    #[error("Shared access key cannot be used for signing")]
    InvalidKey,
}

/// Parsed `Endpoint=sb://...;SharedAccessKeyName=...;SharedAccessKey=...`
#[derive(Clone)]
pub struct ConnectionString {
    /// Namespace endpoint, always `https://` with a trailing slash
    pub endpoint: Url,
    pub key_name: String,
    key: String,
}

impl ConnectionString {
    /// Base URL of a hub inside this namespace, without trailing slash
    pub fn hub_url(&self, hub_name: &str) -> String {
        format!(
            "{}{}",
            self.endpoint.as_str(),
            urlencoding::encode(hub_name.trim_matches('/'))
        )
    }

    pub fn signer(&self) -> Result<SasTokenProvider, ConnectionStringError> {
        SasTokenProvider::new(&self.key_name, &self.key)
    }
}

// The access key never ends up in logs.
impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("endpoint", &self.endpoint.as_str())
            .field("key_name", &self.key_name)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl FromStr for ConnectionString {
    type Err = ConnectionStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut endpoint = None;
        let mut key_name = None;
        let mut key = None;

        for segment in s.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            // Keys are base64 and may contain '=' themselves
            let (name, value) = segment
                .split_once('=')
                .ok_or_else(|| ConnectionStringError::MalformedSegment(segment.to_string()))?;

            match name.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim().to_string()),
                "sharedaccesskeyname" => key_name = Some(value.trim().to_string()),
                "sharedaccesskey" => key = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let endpoint = endpoint.ok_or(ConnectionStringError::MissingField("Endpoint"))?;
        let key_name = key_name
            .filter(|k| !k.is_empty())
            .ok_or(ConnectionStringError::MissingField("SharedAccessKeyName"))?;
        let key = key
            .filter(|k| !k.is_empty())
            .ok_or(ConnectionStringError::MissingField("SharedAccessKey"))?;

        Ok(Self {
            endpoint: parse_endpoint(&endpoint)?,
            key_name,
            key,
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConnectionStringError> {
    let https = match raw.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("sb") => format!("https://{}", rest),
        Some(_) => raw.to_string(),
        None => return Err(ConnectionStringError::InvalidEndpoint(raw.to_string())),
    };

    let mut url =
        Url::parse(&https).map_err(|_| ConnectionStringError::InvalidEndpoint(raw.to_string()))?;
    if url.host_str().is_none() {
        return Err(ConnectionStringError::InvalidEndpoint(raw.to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Generates `SharedAccessSignature` authorization headers
#[derive(Clone)]
pub struct SasTokenProvider {
    key_name: String,
    mac: HmacSha256,
}

impl SasTokenProvider {
    pub fn new(key_name: &str, key: &str) -> Result<Self, ConnectionStringError> {
        let mac = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|_| ConnectionStringError::InvalidKey)?;
        Ok(Self {
            key_name: key_name.to_string(),
            mac,
        })
    }

    /// Token for `resource_uri` valid for the next hour
    pub fn token(&self, resource_uri: &str) -> String {
        let expiry = chrono::Utc::now().timestamp() + SAS_TOKEN_TTL_SECS;
        self.token_with_expiry(resource_uri, expiry)
    }

    pub fn token_with_expiry(&self, resource_uri: &str, expiry: i64) -> String {
        let encoded_uri = urlencoding::encode(&resource_uri.to_lowercase()).into_owned();
        let string_to_sign = format!("{}\n{}", encoded_uri, expiry);

        let mut mac = self.mac.clone();
        mac.update(string_to_sign.as_bytes());
        let signature = base64_engine.encode(mac.finalize().into_bytes());

        format!(
            "SharedAccessSignature sr={}&sig={}&se={}&skn={}",
            encoded_uri,
            urlencoding::encode(&signature),
            expiry,
            self.key_name
        )
    }
}
