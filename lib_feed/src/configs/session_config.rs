//! Session configuration: where to pull from, where to push from, how long to
//! wait between reconnects, and which capacity policy the store uses.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::core::feed_store::CapacityPolicy;
use crate::error::TransportError;
use crate::ingestors::transport::DEFAULT_RECONNECT_DELAY;

/// Host serving both the snapshot and the push endpoint.
pub const DEFAULT_BASE_URL: &str = "https://ordmempool.space/";
/// Snapshot endpoint, relative to the base URL.
pub const DEFAULT_SNAPSHOT_PATH: &str = "api/latest-images";
/// Well-known push path on the same host.
pub const PUSH_PATH: &str = "/ws";
/// Timeout of the single snapshot request.
pub const DEFAULT_SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Base URL of the host, e.g. `https://ordmempool.space/`.
    pub base_url: String,
    /// Snapshot path joined onto `base_url`.
    pub snapshot_path: String,
    /// Explicit push endpoint. Derived from `base_url` when `None`.
    pub ws_url: Option<String>,
    /// Fixed delay between a connection loss and the next attempt.
    pub reconnect_delay: Duration,
    pub snapshot_timeout: Duration,
    pub policy: CapacityPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            snapshot_path: DEFAULT_SNAPSHOT_PATH.to_string(),
            ws_url: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            snapshot_timeout: DEFAULT_SNAPSHOT_TIMEOUT,
            policy: CapacityPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// The push endpoint: `ws_url` if set, otherwise derived from the host.
    ///
    /// # Errors
    /// `TransportError::Url` when the URL cannot be parsed or has a scheme
    /// other than http(s)/ws(s).
    pub fn push_url(&self) -> Result<Url, TransportError> {
        match &self.ws_url {
            Some(explicit) => Url::parse(explicit).map_err(|e| TransportError::Url(format!("{}: {}", explicit, e))),
            None => {
                let base = Url::parse(&self.base_url).map_err(|e| TransportError::Url(format!("{}: {}", self.base_url, e)))?;
                derive_ws_url(&base)
            }
        }
    }
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionConfig
    Base url: {},
    Snapshot path: {},
    Push url: {},
    Reconnect delay: {} ms,
    Policy: {:?}",
            self.base_url,
            self.snapshot_path,
            self.ws_url.as_deref().unwrap_or("(derived)"),
            self.reconnect_delay.as_millis(),
            self.policy
        )
    }
}

/// Maps `http(s)://host[:port]/anything` to `ws(s)://host[:port]/ws`.
pub fn derive_ws_url(base: &Url) -> Result<Url, TransportError> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(TransportError::Url(format!("unsupported scheme '{}' in {}", other, base))),
    };

    let mut url = base
        .join(PUSH_PATH)
        .map_err(|e| TransportError::Url(format!("{}: {}", base, e)))?;
    url.set_scheme(scheme)
        .map_err(|_| TransportError::Url(format!("cannot switch {} to {}", base, scheme)))?;
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
