//! CloudEvents over HTTP.
//!
//! # Responsibilities
//! - Read event attributes in binary mode (`ce-*` headers) or structured mode
//!   (`application/cloudevents+json` body)
//! - Write an event back out in binary mode
//!
//! # Design Decisions
//! - Malformed events are still events: missing attributes fall back to defaults
//!   so every delivery is counted

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use crate::breaker::ObservedEvent;

pub const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";
const UNKNOWN: &str = "unknown";
const DEFAULT_SPEC_VERSION: &str = "1.0";

/// A received CloudEvent, reduced to the attributes the receiver uses.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudEvent {
    pub id: String,
    pub source: String,
    pub ty: String,
    pub specversion: String,
    pub subject: Option<String>,
    pub datacontenttype: Option<String>,
    pub data: Bytes,
}

impl CloudEvent {
    /// Decode an event from an HTTP request. Never fails.
    pub fn from_http(headers: &HeaderMap, body: Bytes) -> Self {
        let content_type = header_str(headers, header::CONTENT_TYPE.as_str());
        if content_type.is_some_and(|ct| ct.starts_with(STRUCTURED_CONTENT_TYPE)) {
            match serde_json::from_slice::<Value>(&body) {
                Ok(Value::Object(map)) => return Self::from_structured(&map),
                _ => tracing::debug!("Structured event body is not a JSON object, treating as binary"),
            }
        }
        Self::from_binary(headers, body)
    }

    fn from_binary(headers: &HeaderMap, body: Bytes) -> Self {
        let attr = |name: &str| header_str(headers, name).map(str::to_string);
        Self {
            id: attr("ce-id").unwrap_or_else(generated_id),
            source: attr("ce-source").unwrap_or_else(|| UNKNOWN.to_string()),
            ty: attr("ce-type").unwrap_or_else(|| UNKNOWN.to_string()),
            specversion: attr("ce-specversion").unwrap_or_else(|| DEFAULT_SPEC_VERSION.to_string()),
            subject: attr("ce-subject"),
            datacontenttype: header_str(headers, header::CONTENT_TYPE.as_str()).map(str::to_string),
            data: body,
        }
    }

    fn from_structured(map: &serde_json::Map<String, Value>) -> Self {
        let attr = |name: &str| map.get(name).and_then(Value::as_str).map(str::to_string);
        let data = match map.get("data") {
            None | Some(Value::Null) => Bytes::new(),
            Some(Value::String(s)) => Bytes::from(s.clone()),
            Some(other) => Bytes::from(other.to_string()),
        };
        Self {
            id: attr("id").unwrap_or_else(generated_id),
            source: attr("source").unwrap_or_else(|| UNKNOWN.to_string()),
            ty: attr("type").unwrap_or_else(|| UNKNOWN.to_string()),
            specversion: attr("specversion").unwrap_or_else(|| DEFAULT_SPEC_VERSION.to_string()),
            subject: attr("subject"),
            datacontenttype: attr("datacontenttype"),
            data,
        }
    }

    /// Echo the event back in binary content mode.
    pub fn into_binary_response(self) -> Response {
        let mut headers = HeaderMap::new();
        let mut set = |name: &'static str, value: &str| {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        };
        set("ce-id", &self.id);
        set("ce-source", &self.source);
        set("ce-type", &self.ty);
        set("ce-specversion", &self.specversion);
        if let Some(subject) = &self.subject {
            set("ce-subject", subject);
        }
        if let Some(content_type) = &self.datacontenttype {
            set("content-type", content_type);
        }

        (StatusCode::OK, headers, self.data).into_response()
    }
}

impl From<&CloudEvent> for ObservedEvent {
    fn from(event: &CloudEvent) -> Self {
        ObservedEvent::new(event.id.clone(), event.source.clone())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn generated_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
