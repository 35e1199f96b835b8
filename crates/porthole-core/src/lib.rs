//! # porthole-core
//!
//! Shared wire types for the porthole gateway: the JSON-RPC-shaped CDP
//! frames that cross the browser socket, the target descriptors reported by
//! the CDP HTTP discovery endpoint, and the handful of constants every other
//! crate agrees on.

#![deny(unsafe_code)]

pub mod cdp;
pub mod constants;
pub mod target;

pub use cdp::{CdpCommand, CdpEvent, CdpMessage, CdpProtocolError, CdpResponse};
pub use target::DiscoveredTarget;
