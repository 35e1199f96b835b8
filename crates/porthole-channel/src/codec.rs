//! Wire codec for `"<event>:<json-or-empty>"` channel messages.

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use porthole_core::constants::MAX_CHANNEL_MESSAGE_BYTES;

use crate::event::ChannelEvent;

/// Why a channel message was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// Message exceeds the 10 MiB bound.
    #[error("channel message of {len} bytes exceeds the {max} byte limit")]
    TooLarge {
        /// Actual message length.
        len: usize,
        /// The enforced bound.
        max: usize,
    },
    /// No `:` separator between event name and args.
    #[error("channel message has no ':' separator")]
    MissingSeparator,
    /// Event name is outside the fixed vocabulary.
    #[error("unknown channel event '{name}'")]
    UnknownEvent {
        /// The offending name (truncated for logging).
        name: String,
    },
    /// Non-empty args failed to parse as JSON.
    #[error("channel args for '{event}' are not valid JSON")]
    InvalidArgs {
        /// The event whose args were malformed.
        event: ChannelEvent,
    },
}

/// A successfully decoded channel message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    /// The event name.
    pub event: ChannelEvent,
    /// Parsed args, `None` when the args segment was empty.
    pub args: Option<Value>,
}

/// Decode one wire message.
///
/// Pure: returns the decoded message or a diagnostic rejection, never
/// panics, never logs.
pub fn decode(message: &str) -> Result<DecodedMessage, ChannelError> {
    if message.len() > MAX_CHANNEL_MESSAGE_BYTES {
        return Err(ChannelError::TooLarge {
            len: message.len(),
            max: MAX_CHANNEL_MESSAGE_BYTES,
        });
    }
    let Some((name, args)) = message.split_once(':') else {
        return Err(ChannelError::MissingSeparator);
    };
    let Some(event) = ChannelEvent::parse(name) else {
        // Byte 64 may fall inside a multibyte character; truncate by chars.
        let name = name.chars().take(64).collect();
        return Err(ChannelError::UnknownEvent { name });
    };
    if args.is_empty() {
        return Ok(DecodedMessage { event, args: None });
    }
    match serde_json::from_str(args) {
        Ok(value) => Ok(DecodedMessage {
            event,
            args: Some(value),
        }),
        Err(_) => Err(ChannelError::InvalidArgs { event }),
    }
}

/// Encode an event and args into wire form.
///
/// Returns `None` (after logging) if the args cannot be serialized. The
/// vocabulary is enforced by the `ChannelEvent` type itself, so encoding
/// cannot produce an unknown event name.
pub fn encode(event: ChannelEvent, args: Option<&Value>) -> Option<String> {
    match args {
        None => Some(format!("{}:", event.as_str())),
        Some(value) => match serde_json::to_string(value) {
            Ok(json) => Some(format!("{}:{json}", event.as_str())),
            Err(e) => {
                warn!(event = %event, error = %e, "failed to encode channel args");
                None
            }
        },
    }
}
