//! Atom/XML wire format of the hub's registration and message endpoints.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use super::models::{NativeRegistration, RegistrationDescription};
use crate::notifications::MobilePlatform;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const SERVICEBUS_NS: &str = "http://schemas.microsoft.com/netservices/2010/10/servicebus/connect";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

#[derive(Error, Debug)]
pub enum AtomError {
    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("{0} without RegistrationId")]
    MissingRegistrationId(String),

    #[error("Invalid {element} value: {value}")]
    InvalidNumber { element: &'static str, value: String },
}

/// Element wrapping a native registration for `platform`
pub fn description_element(platform: MobilePlatform) -> &'static str {
    match platform {
        MobilePlatform::Wns => "WindowsRegistrationDescription",
        MobilePlatform::Mpns => "MpnsRegistrationDescription",
        MobilePlatform::Apns => "AppleRegistrationDescription",
        MobilePlatform::Gcm => "GcmRegistrationDescription",
    }
}

/// Element carrying the device handle for `platform`
pub fn handle_element(platform: MobilePlatform) -> &'static str {
    match platform {
        MobilePlatform::Wns | MobilePlatform::Mpns => "ChannelUri",
        MobilePlatform::Apns => "DeviceToken",
        MobilePlatform::Gcm => "GcmRegistrationId",
    }
}

fn platform_of(description_type: &str) -> Option<MobilePlatform> {
    let prefix = description_type
        .strip_suffix("TemplateRegistrationDescription")
        .or_else(|| description_type.strip_suffix("RegistrationDescription"))?;
    match prefix {
        "Windows" => Some(MobilePlatform::Wns),
        "Mpns" => Some(MobilePlatform::Mpns),
        "Apple" => Some(MobilePlatform::Apns),
        "Gcm" => Some(MobilePlatform::Gcm),
        _ => None,
    }
}

fn is_handle_element(name: &str) -> bool {
    matches!(
        name,
        "ChannelUri"
            | "DeviceToken"
            | "GcmRegistrationId"
            | "FcmV1RegistrationId"
            | "AdmRegistrationId"
            | "BaiduChannelId"
    )
}

/// Atom entry body for `PUT /registrations/{id}`
pub fn registration_entry(registration: &NativeRegistration) -> String {
    let element = description_element(registration.platform);

    let mut body = String::with_capacity(512);
    body.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    body.push_str(&format!(r#"<entry xmlns="{}">"#, ATOM_NS));
    body.push_str(r#"<content type="application/xml">"#);
    body.push_str(&format!(
        r#"<{} xmlns:i="{}" xmlns="{}">"#,
        element, XSI_NS, SERVICEBUS_NS
    ));
    if !registration.tags.is_empty() {
        let tags = registration
            .tags
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        body.push_str(&format!("<Tags>{}</Tags>", escape(tags.as_str())));
    }
    let handle = handle_element(registration.platform);
    body.push_str(&format!(
        "<{0}>{1}</{0}>",
        handle,
        escape(registration.handle.as_str())
    ));
    body.push_str(&format!("</{}>", element));
    body.push_str("</content></entry>");
    body
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

#[derive(Default)]
struct PartialDescription {
    description_type: String,
    registration_id: Option<String>,
    handle: Option<String>,
    tags: Vec<String>,
    etag: Option<String>,
    expiration_time: Option<String>,
}

impl PartialDescription {
    fn set(&mut self, field: &str, value: String) {
        match field {
            "RegistrationId" => self.registration_id = Some(value),
            "ETag" => self.etag = Some(value),
            "ExpirationTime" => self.expiration_time = Some(value),
            "Tags" => {
                self.tags = value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            name if is_handle_element(name) => self.handle = Some(value),
            _ => {}
        }
    }

    fn finish(self) -> Result<RegistrationDescription, AtomError> {
        let registration_id = self
            .registration_id
            .ok_or_else(|| AtomError::MissingRegistrationId(self.description_type.clone()))?;

        // Unparseable expiry is dropped rather than failing the whole listing
        let expiration_time = self.expiration_time.and_then(|raw| {
            chrono::DateTime::parse_from_rfc3339(&raw)
                .map(|t| t.with_timezone(&chrono::Utc))
                .ok()
        });

        Ok(RegistrationDescription {
            registration_id,
            platform: platform_of(&self.description_type),
            description_type: self.description_type,
            handle: self.handle,
            tags: self.tags,
            etag: self.etag,
            expiration_time,
        })
    }
}

/// Registrations in an Atom feed returned by `GET /registrations/`
pub fn parse_registration_feed(xml: &str) -> Result<Vec<RegistrationDescription>, AtomError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut registrations = Vec::new();
    let mut current: Option<PartialDescription> = None;
    let mut field: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = local_name(&start);
                if current.is_some() {
                    field = Some(name);
                } else if name.ends_with("RegistrationDescription") {
                    current = Some(PartialDescription {
                        description_type: name,
                        ..Default::default()
                    });
                }
            }
            Event::Text(text) => {
                if let (Some(description), Some(name)) = (current.as_mut(), field.as_deref()) {
                    description.set(name, text.unescape()?.into_owned());
                }
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.local_name().as_ref()).into_owned();
                let closes_description = current
                    .as_ref()
                    .is_some_and(|d| d.description_type == name);
                if closes_description {
                    if let Some(description) = current.take() {
                        registrations.push(description.finish()?);
                    }
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(registrations)
}

/// Success and failure counts of a test send's `NotificationOutcome`
pub fn parse_outcome_counts(xml: &str) -> Result<(u32, u32), AtomError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut field: Option<String> = None;
    let mut success = 0;
    let mut failure = 0;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                depth += 1;
                field = (depth == 2).then(|| local_name(&start));
            }
            Event::Text(text) => {
                let element = match field.as_deref() {
                    Some("Success") => "Success",
                    Some("Failure") => "Failure",
                    _ => continue,
                };
                let value = text.unescape()?;
                let count = value.trim().parse().map_err(|_| AtomError::InvalidNumber {
                    element,
                    value: value.to_string(),
                })?;
                if element == "Success" {
                    success = count;
                } else {
                    failure = count;
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((success, failure))
}

/// `X-WNS-Type` for a Windows payload, taken from its root element
pub fn wns_type(payload: &str) -> &'static str {
    let mut reader = Reader::from_str(payload);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) | Ok(Event::Empty(start)) => {
                return match local_name(&start).as_str() {
                    "toast" => "wns/toast",
                    "tile" => "wns/tile",
                    "badge" => "wns/badge",
                    _ => "wns/raw",
                };
            }
            Ok(Event::Decl(_)) | Ok(Event::Comment(_)) | Ok(Event::PI(_)) | Ok(Event::DocType(_)) => {}
            _ => return "wns/raw",
        }
    }
}

/// `Detail` text of a hub error body, e.g.
/// `<Error><Code>400</Code><Detail>Invalid tag</Detail></Error>`
pub fn parse_error_detail(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_detail = false;
    loop {
        match reader.read_event().ok()? {
            Event::Start(start) => in_detail = local_name(&start) == "Detail",
            Event::Text(text) if in_detail => {
                return text.unescape().ok().map(|detail| detail.into_owned());
            }
            Event::End(_) => in_detail = false,
            Event::Eof => return None,
            _ => {}
        }
    }
}

/// `X-WindowsPhone-Target` and `X-NotificationClass` for an MPNS payload
pub fn mpns_headers(payload: &str) -> (Option<&'static str>, &'static str) {
    let mut reader = Reader::from_str(payload);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) | Ok(Event::Empty(start)) => {
                match local_name(&start).as_str() {
                    "Toast" => return (Some("toast"), "2"),
                    "Tile" => return (Some("token"), "1"),
                    "Notification" => {}
                    _ => return (None, "3"),
                }
            }
            Ok(Event::Eof) | Err(_) | Ok(Event::Text(_)) => return (None, "3"),
            _ => {}
        }
    }
}
