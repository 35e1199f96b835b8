//! Collaborator seams for the channel's non-CDP events.

use async_trait::async_trait;
use tracing::{debug, info};

use porthole_channel::{TelemetryData, TelemetryPayload};

/// Receives validated telemetry payloads from panels.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Record one telemetry payload.
    async fn record(&self, payload: TelemetryPayload);
}

/// Default sink: structured log lines, nothing else.
pub struct LogTelemetrySink;

#[async_trait]
impl TelemetrySink for LogTelemetrySink {
    async fn record(&self, payload: TelemetryPayload) {
        match payload.data {
            TelemetryData::Number(value) => {
                info!(event = %payload.event, name = %payload.name, value, "panel telemetry");
            }
            TelemetryData::Properties(props) => {
                info!(
                    event = %payload.event,
                    name = %payload.name,
                    properties = %serde_json::Value::Object(props),
                    "panel telemetry"
                );
            }
        }
    }
}

/// Writes panel-provided text to the host clipboard.
#[async_trait]
pub trait ClipboardAccess: Send + Sync {
    /// Write `text` to the clipboard. Returns `false` if unsupported.
    async fn write_text(&self, text: &str) -> bool;
}

/// Default access: no clipboard on a headless gateway.
pub struct NoClipboard;

#[async_trait]
impl ClipboardAccess for NoClipboard {
    async fn write_text(&self, text: &str) -> bool {
        debug!(len = text.len(), "clipboard write requested but no clipboard is wired");
        false
    }
}
