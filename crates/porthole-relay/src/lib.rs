//! # porthole-relay
//!
//! One relay per panel: owns exactly one logical connection to one CDP
//! target, validates and gates everything the panel asks to forward,
//! buffers outbound commands while the socket is connecting, and re-emits
//! inbound traffic as a typed notification stream.
//!
//! The relay is an explicit state machine (`Idle → Connecting → Open →
//! Closed`, with reopen on demand) driven by a single input queue, so no
//! behavior depends on event-emitter ordering.

#![deny(unsafe_code)]

pub mod notifications;
pub mod relay;

pub use notifications::RelayNotification;
pub use relay::ConnectionRelay;
