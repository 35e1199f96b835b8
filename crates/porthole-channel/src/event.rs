//! The closed channel event vocabulary.

/// Every event name that may appear on the panel channel, in either
/// direction. The set is fixed at build time; an unknown name is a protocol
/// violation, not an extension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelEvent {
    /// Panel is ready; (re)establish the CDP connection.
    Ready,
    /// Panel wants a CDP command forwarded to the browser.
    Websocket,
    /// Panel-emitted telemetry record.
    Telemetry,
    /// Panel asks the host to write its clipboard.
    WriteToClipboard,
    /// Panel asks the host to read its clipboard.
    ReadClipboard,
    /// Gateway → panel: the CDP socket opened.
    Open,
    /// Gateway → panel: verbatim CDP traffic.
    Message,
    /// Gateway → panel: the inspected page navigated.
    Navigation,
    /// Gateway → panel: a panel message was dropped as malformed.
    ParseError,
    /// Gateway → panel: the CDP socket closed.
    Close,
    /// Gateway → panel: the CDP socket errored.
    Error,
}

impl ChannelEvent {
    /// Wire name of this event.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Websocket => "websocket",
            Self::Telemetry => "telemetry",
            Self::WriteToClipboard => "writeToClipboard",
            Self::ReadClipboard => "readClipboard",
            Self::Open => "open",
            Self::Message => "message",
            Self::Navigation => "navigation",
            Self::ParseError => "parseError",
            Self::Close => "close",
            Self::Error => "error",
        }
    }

    /// Parse a wire name. Returns `None` for anything outside the vocabulary.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ready" => Some(Self::Ready),
            "websocket" => Some(Self::Websocket),
            "telemetry" => Some(Self::Telemetry),
            "writeToClipboard" => Some(Self::WriteToClipboard),
            "readClipboard" => Some(Self::ReadClipboard),
            "open" => Some(Self::Open),
            "message" => Some(Self::Message),
            "navigation" => Some(Self::Navigation),
            "parseError" => Some(Self::ParseError),
            "close" => Some(Self::Close),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// All vocabulary members, for exhaustive tests.
    pub const ALL: [Self; 11] = [
        Self::Ready,
        Self::Websocket,
        Self::Telemetry,
        Self::WriteToClipboard,
        Self::ReadClipboard,
        Self::Open,
        Self::Message,
        Self::Navigation,
        Self::ParseError,
        Self::Close,
        Self::Error,
    ];
}

impl std::fmt::Display for ChannelEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
