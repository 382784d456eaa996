//! # lib_feed
//!
//! Client-side live feed for inscription images seen in the Bitcoin mempool.
//! A one-shot snapshot pull and a reconnecting push transport are reconciled
//! into a single ordered, deduplicated and optionally bounded view that a
//! projection sink renders.
//!
//! The core (records, store, transport state machine, session) is always
//! built. The concrete network clients and the console renderer sit behind
//! the `retrieve`, `ingestors` and `projection` features, all on by default.

pub mod configs;
pub mod core;
pub mod error;
pub mod ingestors;
#[cfg(feature = "projection")]
pub mod projection;
pub mod retrieve;

// Re-export the everyday API
pub use configs::SessionConfig;
pub use crate::core::{
    CapacityPolicy, FeedSession, FeedStore, MergeOrigin, MergeResult, NullSink, ProjectionSink, Record, RecordKey,
    RecordStatus,
};
pub use error::{DecodeError, FeedError, LoadError, ProtocolViolation, TransportError};
