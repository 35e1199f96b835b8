//! # porthole-settings
//!
//! Gateway configuration: compiled defaults, deep-merged user overrides from
//! `~/.porthole/settings.json`, and strict environment variable overrides on
//! top.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{ConnectionSettings, LaunchSettings, PortholeSettings, ServerSettings};
