//! # Data Ingestors Module
//!
//! The push side of the feed. Everything that arrives after the initial
//! snapshot comes through here.
//!
//! ## Contained Modules:
//! - **`messages`**: decoding of the `{type, payload}` push envelope into
//!   feed events.
//! - **`transport`**: the reconnect state machine and the generic live
//!   transport that applies events to the feed store.
//! - **`ord_wss`**: the `tokio-tungstenite` connector used against a real
//!   host (feature `ingestors`).

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Push envelope decoding.
pub mod messages;
/// Reconnect state machine and live transport driver.
pub mod transport;
/// WebSocket connector.
#[cfg(feature = "ingestors")]
pub mod ord_wss;

// --- Public API Re-exports ---
pub use messages::{parse_message, FeedEvent};
pub use transport::{
    Connection, ConnectionState, Connector, LiveTransport, ReconnectMachine, TransportAction, TransportStats,
    DEFAULT_RECONNECT_DELAY,
};
#[cfg(feature = "ingestors")]
pub use ord_wss::{WssConnection, WssConnector};
