//! # porthole-channel
//!
//! The line protocol spoken between a panel and the gateway: messages are
//! UTF-8 strings of the form `"<event>:<json-or-empty>"` over a closed event
//! vocabulary. This crate owns decoding/encoding of that wire form and the
//! shape validation of the structured payloads that ride on it.
//!
//! Everything here is pure: no sockets, no state, just values in and
//! `Result`s out.

#![deny(unsafe_code)]

pub mod codec;
pub mod event;
pub mod payloads;

pub use codec::{ChannelError, DecodedMessage, decode, encode};
pub use event::ChannelEvent;
pub use payloads::{
    ClipboardPayload, PayloadError, TelemetryData, TelemetryPayload, WebsocketPayload,
    validate_clipboard_payload, validate_telemetry_payload, validate_websocket_payload,
};
