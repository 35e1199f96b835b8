//! Shape validation for structured channel payloads.
//!
//! Three fixed shapes cross the boundary: the websocket-forward payload, the
//! telemetry payload, and the clipboard payload. Anything else is rejected
//! with a stable error string that callers and tests rely on verbatim.

use serde_json::Value;
use thiserror::Error;

/// Why a payload failed shape validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Payload root (or a required sub-object) is null, an array, or another
    /// non-object.
    #[error("{context} must be a plain object")]
    NotAnObject {
        /// Which payload (or field) was malformed.
        context: &'static str,
    },
    /// A required string field is absent, not a string, or empty.
    #[error("{context} requires a non-empty string '{field}'")]
    InvalidString {
        /// Which payload was malformed.
        context: &'static str,
        /// The offending field.
        field: &'static str,
    },
    /// Telemetry `data` is neither a number nor a plain object.
    #[error("telemetry payload 'data' must be a number or a plain object")]
    InvalidTelemetryData,
}

/// Validated websocket-forward payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsocketPayload {
    /// The raw CDP command string to forward.
    pub message: String,
}

/// Validated telemetry payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryPayload {
    /// Telemetry event kind.
    pub event: String,
    /// Metric name.
    pub name: String,
    /// Metric value.
    pub data: TelemetryData,
}

/// The two admissible telemetry data shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryData {
    /// A single numeric measurement.
    Number(f64),
    /// A property bag.
    Properties(serde_json::Map<String, Value>),
}

/// Validated clipboard payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    /// Text to place on the clipboard.
    pub message: String,
}

fn require_string(
    obj: &serde_json::Map<String, Value>,
    context: &'static str,
    field: &'static str,
) -> Result<String, PayloadError> {
    match obj.get(field).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s.to_owned()),
        _ => Err(PayloadError::InvalidString { context, field }),
    }
}

fn require_object<'v>(
    value: &'v Value,
    context: &'static str,
) -> Result<&'v serde_json::Map<String, Value>, PayloadError> {
    value
        .as_object()
        .ok_or(PayloadError::NotAnObject { context })
}

/// Validate a `websocket` event payload: `{ "message": "<non-empty>" }`.
pub fn validate_websocket_payload(value: &Value) -> Result<WebsocketPayload, PayloadError> {
    let obj = require_object(value, "websocket payload")?;
    let message = require_string(obj, "websocket payload", "message")?;
    Ok(WebsocketPayload { message })
}

/// Validate a `telemetry` event payload:
/// `{ "event": "...", "name": "...", "data": <number|object> }`.
pub fn validate_telemetry_payload(value: &Value) -> Result<TelemetryPayload, PayloadError> {
    let obj = require_object(value, "telemetry payload")?;
    let event = require_string(obj, "telemetry payload", "event")?;
    let name = require_string(obj, "telemetry payload", "name")?;
    let data = match obj.get("data") {
        Some(Value::Number(n)) => TelemetryData::Number(n.as_f64().unwrap_or(0.0)),
        Some(Value::Object(map)) => TelemetryData::Properties(map.clone()),
        _ => return Err(PayloadError::InvalidTelemetryData),
    };
    Ok(TelemetryPayload { event, name, data })
}

/// Validate a `writeToClipboard` payload:
/// `{ "data": { "message": "<non-empty>" } }`.
pub fn validate_clipboard_payload(value: &Value) -> Result<ClipboardPayload, PayloadError> {
    let obj = require_object(value, "clipboard payload")?;
    let data = obj
        .get("data")
        .ok_or(PayloadError::NotAnObject {
            context: "clipboard payload 'data'",
        })
        .and_then(|v| require_object(v, "clipboard payload 'data'"))?;
    let message = require_string(data, "clipboard payload 'data'", "message")?;
    Ok(ClipboardPayload { message })
}
