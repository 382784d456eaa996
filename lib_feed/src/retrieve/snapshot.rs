//! # Snapshot Loader
//!
//! The one-shot pull that seeds the feed at startup. The endpoint answers with
//!
//! ```json
//! { "size": 1234, "result": [ RawRecord, ... ] }
//! ```
//!
//! where `size` is the aggregate pending-pool count, independent of how many
//! records `result` holds. The loader is consumed by [`SnapshotLoader::load`],
//! so a session cannot pull twice, and a failure is reported rather than
//! retried.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::feed_store::{FeedStore, MergeOrigin};
use crate::core::record::decode_batch;
use crate::core::sink::ProjectionSink;
use crate::error::LoadError;

/// Wire shape of the snapshot response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotPayload {
    /// Aggregate pending-pool size.
    pub size: u64,
    /// Raw records, decoded one by one so a bad item only drops itself.
    pub result: Vec<Value>,
}

/// Anything that can produce the snapshot payload.
#[allow(async_fn_in_trait)]
pub trait SnapshotSource {
    async fn fetch(&self) -> Result<SnapshotPayload, LoadError>;
}

/// Summary of a completed snapshot load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotOutcome {
    pub aggregate_size: u64,
    pub inserted: usize,
    pub discarded: usize,
}

pub struct SnapshotLoader<S> {
    source: S,
}

impl<S: SnapshotSource> SnapshotLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Pulls the snapshot, merges it into `store` and renders the result.
    ///
    /// # Errors
    /// Whatever the source reports. The store and sink are left untouched.
    pub async fn load<P>(self, store: &mut FeedStore, sink: &mut P) -> Result<SnapshotOutcome, LoadError>
    where
        P: ProjectionSink + ?Sized,
    {
        let payload = self.fetch().await?;
        Ok(apply_snapshot(payload, store, sink))
    }

    /// Only the network half of [`load`](Self::load); nothing is touched
    /// until the payload is handed to [`apply_snapshot`].
    pub async fn fetch(self) -> Result<SnapshotPayload, LoadError> {
        log::info!("Loading initial snapshot...");
        self.source.fetch().await
    }
}

/// Merges a fetched snapshot into `store` and renders the resulting view
/// together with the aggregate pool size.
pub fn apply_snapshot<P>(payload: SnapshotPayload, store: &mut FeedStore, sink: &mut P) -> SnapshotOutcome
where
    P: ProjectionSink + ?Sized,
{
    let total = payload.result.len();
    let records = decode_batch(payload.result);
    let discarded = total - records.len();
    let merged = store.merge(records, MergeOrigin::Snapshot);

    sink.on_initial_render(store.snapshot_view(), payload.size);

    log::info!(
        "Snapshot loaded: {} records inserted, {} discarded, pool size {}",
        merged.inserted.len(),
        discarded,
        payload.size
    );

    SnapshotOutcome {
        aggregate_size: payload.size,
        inserted: merged.inserted.len(),
        discarded,
    }
}

#[cfg(feature = "retrieve")]
pub use http_source::HttpSnapshotSource;

#[cfg(feature = "retrieve")]
mod http_source {
    use std::time::Duration;

    use super::{SnapshotPayload, SnapshotSource};
    use crate::error::LoadError;
    use crate::retrieve::ky_http::ApiClient;

    /// Pulls the snapshot from the server's latest-images endpoint.
    #[derive(Debug, Clone)]
    pub struct HttpSnapshotSource {
        client: ApiClient,
        path: String,
    }

    impl HttpSnapshotSource {
        pub fn new(base_url: &str, path: impl Into<String>, timeout: Duration) -> Result<Self, LoadError> {
            Ok(Self {
                client: ApiClient::new(base_url, timeout)?,
                path: path.into(),
            })
        }
    }

    impl SnapshotSource for HttpSnapshotSource {
        async fn fetch(&self) -> Result<SnapshotPayload, LoadError> {
            let response = self.client.get::<SnapshotPayload>(&self.path).await?;
            if !response.success {
                return Err(LoadError::Status {
                    status: response.status,
                    body: response.error_body.unwrap_or_default(),
                });
            }
            response
                .data
                .ok_or_else(|| LoadError::Malformed("empty snapshot body".to_string()))
        }
    }
}
