//! Fixed CDP command allow-list.
//!
//! The panel is script-capable and untrusted; a CDP socket is
//! remote-code-execution-equivalent control of the browser. Only the methods
//! below may cross, and `Runtime.evaluate` only with the single compiled-in
//! clipboard-selection expression. The set is fixed at build time and is
//! deliberately not reachable from settings.

use serde_json::Value;
use tracing::debug;

use porthole_core::constants::CLIPBOARD_READ_EXPRESSION;

/// Methods permitted to cross from panel to browser, grouped by concern.
const ALLOWED_METHODS: &[&str] = &[
    // Input dispatch
    "Input.dispatchKeyEvent",
    "Input.dispatchMouseEvent",
    "Input.dispatchTouchEvent",
    "Input.emulateTouchFromMouseEvent",
    // Page navigation, history, reload, screencast
    "Page.enable",
    "Page.navigate",
    "Page.reload",
    "Page.getNavigationHistory",
    "Page.navigateToHistoryEntry",
    "Page.startScreencast",
    "Page.stopScreencast",
    "Page.screencastFrameAck",
    // Narrow emulation overrides
    "Emulation.setDeviceMetricsOverride",
    "Emulation.clearDeviceMetricsOverride",
    "Emulation.setTouchEmulationEnabled",
    "Emulation.setEmitTouchEventsForMouse",
    "Emulation.setUserAgentOverride",
    // Gated further by the exact-expression check
    "Runtime.evaluate",
];

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRejection {
    /// The raw message is not valid JSON.
    NotJson,
    /// Parsed JSON has no string `method`.
    MissingMethod,
    /// `method` is outside the allow-list.
    MethodNotAllowed(String),
    /// `Runtime.evaluate` with anything but the permitted expression.
    ForbiddenExpression,
}

impl std::fmt::Display for GateRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotJson => f.write_str("command is not valid JSON"),
            Self::MissingMethod => f.write_str("command has no method"),
            Self::MethodNotAllowed(method) => {
                write!(f, "method '{method}' is not on the allow-list")
            }
            Self::ForbiddenExpression => {
                f.write_str("Runtime.evaluate expression is not permitted")
            }
        }
    }
}

/// Outcome of gating one raw command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    /// The command may be written to the socket.
    Allowed,
    /// The command must be dropped.
    Rejected(GateRejection),
}

/// Gate a raw CDP command string.
pub fn check_command(raw: &str) -> GateVerdict {
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return GateVerdict::Rejected(GateRejection::NotJson);
    };
    let Some(method) = value.get("method").and_then(Value::as_str) else {
        return GateVerdict::Rejected(GateRejection::MissingMethod);
    };
    if !ALLOWED_METHODS.contains(&method) {
        debug!(method, "CDP method outside allow-list");
        return GateVerdict::Rejected(GateRejection::MethodNotAllowed(method.to_owned()));
    }
    if method == "Runtime.evaluate" {
        // Second, independent gate: a method-level allow-list is not enough
        // for an arbitrary-code-execution primitive. Byte-for-byte equality
        // with the one permitted expression, nothing looser.
        let expression = value
            .get("params")
            .and_then(|p| p.get("expression"))
            .and_then(Value::as_str);
        if expression != Some(CLIPBOARD_READ_EXPRESSION) {
            debug!("Runtime.evaluate with non-permitted expression");
            return GateVerdict::Rejected(GateRejection::ForbiddenExpression);
        }
    }
    GateVerdict::Allowed
}

/// Boolean form of [`check_command`].
pub fn is_allowed(raw: &str) -> bool {
    matches!(check_command(raw), GateVerdict::Allowed)
}
