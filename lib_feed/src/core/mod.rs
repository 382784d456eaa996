//! # Core Engine Module
//!
//! The feed reconciliation engine: the data model, the store and its merge
//! and eviction policy, the rendering seam, and the session that ties the
//! pull and push sides to one store.
//!
//! ## Core Components:
//!
//! - **`record`**: the immutable `Record` (status aside), its dedup key and
//!   the lenient decoding of the shared wire shape.
//! - **`feed_store`**: the ordered, deduplicated collection with the
//!   bounded-resort and unbounded-append policies.
//! - **`sink`**: the `ProjectionSink` trait rendering layers implement.
//! - **`session`**: `FeedSession`, owner of the store for the life of the
//!   session.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Records, keys, wire shape and decoding.
pub mod record;
/// The bounded/unbounded ordered deduplicated store.
pub mod feed_store;
/// Read-only rendering seam.
pub mod sink;
/// Session orchestration.
pub mod session;

// --- Public API Re-exports ---
pub use feed_store::{CapacityPolicy, FeedStore, MergeOrigin, MergeResult};
pub use record::{decode_batch, decode_record, RawRecord, RawRecordData, Record, RecordKey, RecordStatus};
pub use session::FeedSession;
pub use sink::{NullSink, ProjectionSink};
