//! Constants shared across the gateway.

/// Upper bound on a single panel channel message, in bytes.
pub const MAX_CHANNEL_MESSAGE_BYTES: usize = 10 * 1024 * 1024;

/// The one `Runtime.evaluate` expression the command gate permits.
///
/// Reads the current page selection so the panel can copy it. Any other
/// expression is rejected regardless of the method allow-list, because
/// `Runtime.evaluate` is an arbitrary-code-execution primitive.
pub const CLIPBOARD_READ_EXPRESSION: &str = "window.getSelection().toString()";

/// Default CDP debugging port when none is configured.
pub const DEFAULT_CDP_PORT: u16 = 9222;
