//! # Data Retrieval Module
//!
//! The pull side of the feed: a one-shot snapshot of the latest records.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: a small JSON `ApiClient` built on `reqwest` with a base
//!   URL, request timeout and non-throwing status handling (feature
//!   `retrieve`).
//! - **`snapshot`**: the snapshot payload, the `SnapshotSource` seam and the
//!   `SnapshotLoader` that merges the pull into the feed store.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Generic HTTP API client for JSON endpoints.
#[cfg(feature = "retrieve")]
pub mod ky_http;
/// One-shot snapshot pull.
pub mod snapshot;

// --- Public API Re-exports ---
pub use snapshot::{apply_snapshot, SnapshotLoader, SnapshotOutcome, SnapshotPayload, SnapshotSource};
#[cfg(feature = "retrieve")]
pub use snapshot::HttpSnapshotSource;
#[cfg(feature = "retrieve")]
pub use ky_http::{ApiClient, ApiResponse};
