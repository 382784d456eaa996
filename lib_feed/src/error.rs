//! # Feed Error Taxonomy
//!
//! Every failure the feed client can observe falls into one of four families.
//! None of them is fatal to a running session:
//!
//! - [`DecodeError`] discards a single record and never the batch around it.
//! - [`LoadError`] ends the snapshot pull; the session keeps going with an
//!   empty store and relies on the push transport.
//! - [`TransportError`] always leads to the fixed-delay reconnect loop.
//! - [`ProtocolViolation`] is logged and the offending message ignored.

use thiserror::Error;

/// A raw record payload could not be turned into a `Record`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed record: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Malformed(e.to_string())
    }
}

/// The one-shot snapshot pull failed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("snapshot request failed: {0}")]
    Request(String),

    #[error("snapshot endpoint answered with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed snapshot payload: {0}")]
    Malformed(String),

    #[error("invalid snapshot url: {0}")]
    Url(#[from] url::ParseError),
}

/// The push connection failed, could not be opened, or was closed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection attempt failed: {0}")]
    Connect(String),

    #[error("read error on open connection: {0}")]
    Read(String),

    #[error("connection closed")]
    Closed,

    #[error("invalid push endpoint: {0}")]
    Url(String),
}

/// An inbound push message did not follow the `{type, payload}` protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("unknown message type '{0}'")]
    UnknownTag(String),

    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Umbrella error for callers that do not care about the family.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
