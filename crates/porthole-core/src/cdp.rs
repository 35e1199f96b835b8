//! CDP wire frames.
//!
//! Minimal JSON-RPC-shaped types: commands out, responses and events in.
//! Domain payloads stay as raw [`serde_json::Value`]; the gateway forwards
//! them, it does not interpret them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command id assigned by a relay, strictly increasing per relay instance.
pub type CommandId = u64;

/// A CDP command sent to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpCommand {
    /// Relay-assigned command id. Never trusted from the panel side.
    pub id: CommandId,
    /// Fully qualified method, e.g. `Page.navigate`.
    pub method: String,
    /// Method parameters, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A response to a command.
#[derive(Debug, Clone, Deserialize)]
pub struct CdpResponse {
    /// Id of the command this answers.
    pub id: CommandId,
    /// Result payload on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error payload on failure.
    #[serde(default)]
    pub error: Option<CdpProtocolError>,
}

/// Protocol-level error inside a [`CdpResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpProtocolError {
    /// JSON-RPC error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional extra data.
    #[serde(default)]
    pub data: Option<Value>,
}

/// An unsolicited event from the browser (no command id).
#[derive(Debug, Clone, Deserialize)]
pub struct CdpEvent {
    /// Event method, e.g. `Page.frameNavigated`.
    pub method: String,
    /// Event parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

/// Any inbound frame: a response or an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CdpMessage {
    /// Response to a previously sent command.
    Response(CdpResponse),
    /// Unsolicited protocol event.
    Event(CdpEvent),
}
