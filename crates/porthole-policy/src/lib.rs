//! # porthole-policy
//!
//! The security boundary of the gateway: a fixed CDP command allow-list
//! (with a second, independent gate on `Runtime.evaluate`), plus the
//! hostname, user-data-directory, and navigation-URL guards applied before
//! any connection or launch happens.
//!
//! Nothing in this crate is configurable at runtime. The allow-list and
//! guard rules are compiled in; they are the last line of defense against a
//! compromised panel.

#![deny(unsafe_code)]

pub mod allowlist;
pub mod guards;

pub use allowlist::{GateRejection, GateVerdict, check_command, is_allowed};
pub use guards::{
    HostGuardError, PathGuardError, RemoteHostConfirmer, UrlGuardError, authorize_host,
    is_trusted_host, validate_navigation_url, validate_user_data_dir,
};
