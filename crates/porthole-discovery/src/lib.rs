//! # porthole-discovery
//!
//! Queries a CDP HTTP discovery endpoint (`/json/list`, `/json`), matches
//! requested URLs/titles against discovered targets, and rewrites target
//! socket addresses to the address actually used to reach the endpoint.
//!
//! The rewrite matters: a discovery endpoint reached through port-forwarding
//! reports its own local address inside `webSocketDebuggerUrl`, which is
//! frequently unreachable from this side of the forward.

#![deny(unsafe_code)]

pub mod address;
pub mod client;
pub mod matching;

pub use address::CdpAddress;
pub use client::{DiscoveryClient, DiscoveryError};
pub use matching::{match_targets, rewrite_address};
