//! # Configuration Modules
//!
//! Library-level configuration of a feed session. The binary layers its own
//! file/env/CLI resolution on top and hands the result over as a
//! [`SessionConfig`].

/// Endpoints, reconnect delay and capacity policy of a session.
pub mod session_config;

pub use session_config::{derive_ws_url, SessionConfig, DEFAULT_BASE_URL, DEFAULT_SNAPSHOT_PATH, PUSH_PATH};
