//! # porthole-session
//!
//! Browser lifecycle above the relay: finding an executable, launching with
//! a DevTools endpoint, attaching to a target by URL with a bounded retry
//! loop, and sharing at most one launched browser across every panel.
//!
//! All boundary guards (remote hostname, profile path, navigation scheme)
//! are applied here, before any process is spawned or socket dialed.

#![deny(unsafe_code)]

pub mod browser;
pub mod error;
pub mod launch;
pub mod orchestrator;

pub use browser::find_browser;
pub use error::SessionError;
pub use launch::LaunchedBrowser;
pub use orchestrator::{AttachOutcome, SessionOrchestrator, attach_to_target};
