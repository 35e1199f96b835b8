//! Channel dispatch for one panel.
//!
//! One `PanelSession` per connected panel: decodes channel frames, routes
//! CDP passthrough to the panel's relay, and dispatches the non-CDP events
//! (telemetry, clipboard) to the collaborator seams. Everything a panel does
//! wrong ends in a `parseError` frame, never a dropped connection.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use porthole_channel::{
    ChannelEvent, decode, validate_clipboard_payload, validate_telemetry_payload,
};
use porthole_core::constants::CLIPBOARD_READ_EXPRESSION;
use porthole_relay::{ConnectionRelay, RelayNotification};

use crate::connection::PanelConnection;
use crate::traits::{ClipboardAccess, TelemetrySink};

/// One panel's dispatch state: its connection, its relay, and the seams.
pub struct PanelSession {
    conn: Arc<PanelConnection>,
    relay: ConnectionRelay,
    telemetry: Arc<dyn TelemetrySink>,
    clipboard: Arc<dyn ClipboardAccess>,
}

impl PanelSession {
    /// Bind a connection to a relay and the collaborator seams.
    pub fn new(
        conn: Arc<PanelConnection>,
        relay: ConnectionRelay,
        telemetry: Arc<dyn TelemetrySink>,
        clipboard: Arc<dyn ClipboardAccess>,
    ) -> Self {
        Self {
            conn,
            relay,
            telemetry,
            clipboard,
        }
    }

    /// Handle one raw channel frame from the panel.
    pub async fn handle_frame(&self, raw: &str) {
        let decoded = match decode(raw) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(panel = %self.conn.id, error = %err, "undecodable channel frame");
                self.report_parse_error(&err.to_string());
                return;
            }
        };
        let args = decoded.args.unwrap_or(Value::Null);
        match decoded.event {
            ChannelEvent::Ready => self.relay.handle_ready().await,
            ChannelEvent::Websocket => self.relay.handle_websocket(args).await,
            ChannelEvent::Telemetry => self.handle_telemetry(&args).await,
            ChannelEvent::WriteToClipboard => self.handle_write_to_clipboard(&args).await,
            ChannelEvent::ReadClipboard => self.request_selection_read().await,
            other => {
                // Gateway-to-panel event names are not valid panel traffic.
                debug!(panel = %self.conn.id, event = other.as_str(), "event flows the wrong way");
                self.report_parse_error(&format!("'{}' is not a panel event", other.as_str()));
            }
        }
    }

    async fn handle_telemetry(&self, args: &Value) {
        match validate_telemetry_payload(args) {
            Ok(payload) => self.telemetry.record(payload).await,
            Err(err) => {
                warn!(panel = %self.conn.id, error = %err, "invalid telemetry payload");
                self.report_parse_error(&err.to_string());
            }
        }
    }

    async fn handle_write_to_clipboard(&self, args: &Value) {
        match validate_clipboard_payload(args) {
            Ok(payload) => {
                if !self.clipboard.write_text(&payload.message).await {
                    debug!(panel = %self.conn.id, "clipboard write not performed");
                }
            }
            Err(err) => {
                warn!(panel = %self.conn.id, error = %err, "invalid clipboard payload");
                self.report_parse_error(&err.to_string());
            }
        }
    }

    /// Read the page selection via the one permitted `Runtime.evaluate`
    /// expression. Rides the same validate/gate/stamp path as any panel
    /// command, so the gate stays the single choke point.
    async fn request_selection_read(&self) {
        let command = json!({
            "id": 0,
            "method": "Runtime.evaluate",
            "params": { "expression": CLIPBOARD_READ_EXPRESSION },
        });
        self.relay
            .handle_websocket(json!({ "message": command.to_string() }))
            .await;
    }

    /// Encode one relay notification onto the channel wire.
    pub fn forward_notification(&self, notification: &RelayNotification) {
        if let Some(frame) = encode_notification(notification) {
            if !self.conn.send(Arc::new(frame)) {
                debug!(panel = %self.conn.id, drops = self.conn.drop_count(), "panel frame dropped");
            }
        }
    }

    /// Tear the relay down. The panel connection itself is closed by the
    /// socket loop that owns it.
    pub async fn dispose(&self) {
        self.relay.dispose().await;
    }

    fn report_parse_error(&self, reason: &str) {
        let _ = self
            .conn
            .send_event(ChannelEvent::ParseError, Some(&json!({ "reason": reason })));
    }
}

/// Map a relay notification to its channel wire frame.
pub fn encode_notification(notification: &RelayNotification) -> Option<String> {
    use porthole_channel::encode;
    match notification {
        RelayNotification::Open => encode(ChannelEvent::Open, None),
        RelayNotification::Message(raw) => {
            encode(ChannelEvent::Message, Some(&json!({ "message": raw })))
        }
        RelayNotification::Navigation(url) => {
            encode(ChannelEvent::Navigation, Some(&json!({ "url": url })))
        }
        RelayNotification::ParseError(reason) => {
            encode(ChannelEvent::ParseError, Some(&json!({ "reason": reason })))
        }
        RelayNotification::Closed { reason } => {
            encode(ChannelEvent::Close, Some(&json!({ "reason": reason })))
        }
        RelayNotification::SocketError { reason } => {
            encode(ChannelEvent::Error, Some(&json!({ "reason": reason })))
        }
    }
}
