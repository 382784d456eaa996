//! # Feed Session
//!
//! Owns the one [`FeedStore`] of a session and the projection sink, and lends
//! the store to the live transport, which also hands it to the snapshot
//! result once the pull completes. Nothing holds on to it between events.
//!
//! Lifecycle: the snapshot pull and the push transport start together. The
//! first connection attempt does not wait for the pull; the pulled records
//! are merged whenever they arrive, between two push events. A failed pull is
//! logged and the session carries on with whatever the push delivers.
//! Teardown is a cancelled [`CancellationToken`].

use tokio_util::sync::CancellationToken;

use crate::core::feed_store::{CapacityPolicy, FeedStore};
use crate::core::sink::ProjectionSink;
use crate::ingestors::transport::{Connector, LiveTransport};
use crate::error::LoadError;
use crate::retrieve::snapshot::{apply_snapshot, SnapshotLoader, SnapshotOutcome, SnapshotPayload, SnapshotSource};

pub struct FeedSession<S, C: Connector, P> {
    store: FeedStore,
    sink: P,
    loader: Option<SnapshotLoader<S>>,
    transport: LiveTransport<C>,
    aggregate_size: Option<u64>,
}

impl<S, C, P> FeedSession<S, C, P>
where
    S: SnapshotSource,
    C: Connector,
    P: ProjectionSink,
{
    /// Creates a session with an empty store.
    pub fn new(policy: CapacityPolicy, source: S, transport: LiveTransport<C>, sink: P) -> Self {
        Self {
            store: FeedStore::new(policy),
            sink,
            loader: Some(SnapshotLoader::new(source)),
            transport,
            aggregate_size: None,
        }
    }

    /// Performs the snapshot pull if it has not happened yet.
    ///
    /// Returns `None` when the pull already ran or failed; failures are
    /// logged, never retried.
    pub async fn load_snapshot(&mut self) -> Option<SnapshotOutcome> {
        let loader = self.loader.take()?;
        let fetched = loader.fetch().await;
        let outcome = settle_snapshot(fetched, &mut self.store, &mut self.sink)?;
        self.aggregate_size = Some(outcome.aggregate_size);
        Some(outcome)
    }

    /// Follows the push transport until `shutdown` is cancelled, pulling the
    /// snapshot alongside it if that has not happened yet.
    pub async fn run(&mut self, shutdown: &CancellationToken) {
        let Self {
            store,
            sink,
            loader,
            transport,
            aggregate_size,
        } = self;

        match loader.take() {
            Some(loader) => {
                let on_snapshot = |fetched: Result<SnapshotPayload, LoadError>, store: &mut FeedStore, sink: &mut P| {
                    if let Some(outcome) = settle_snapshot(fetched, store, sink) {
                        *aggregate_size = Some(outcome.aggregate_size);
                    }
                };
                transport
                    .run_alongside(store, sink, shutdown, loader.fetch(), on_snapshot)
                    .await;
            }
            None => transport.run(store, sink, shutdown).await,
        }
    }

    pub fn store(&self) -> &FeedStore {
        &self.store
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn transport(&self) -> &LiveTransport<C> {
        &self.transport
    }

    /// Pool size reported by the snapshot, if it succeeded.
    pub fn aggregate_size(&self) -> Option<u64> {
        self.aggregate_size
    }

    pub fn into_parts(self) -> (FeedStore, P) {
        (self.store, self.sink)
    }
}

fn settle_snapshot<P: ProjectionSink>(
    fetched: Result<SnapshotPayload, LoadError>,
    store: &mut FeedStore,
    sink: &mut P,
) -> Option<SnapshotOutcome> {
    match fetched {
        Ok(payload) => Some(apply_snapshot(payload, store, sink)),
        Err(e) => {
            log::error!("Snapshot load failed, continuing with live updates only: {}", e);
            None
        }
    }
}

#[cfg(all(feature = "retrieve", feature = "ingestors"))]
mod connect {
    use super::FeedSession;
    use crate::configs::SessionConfig;
    use crate::core::sink::ProjectionSink;
    use crate::error::FeedError;
    use crate::ingestors::ord_wss::WssConnector;
    use crate::ingestors::transport::LiveTransport;
    use crate::retrieve::snapshot::HttpSnapshotSource;

    impl<P: ProjectionSink> FeedSession<HttpSnapshotSource, WssConnector, P> {
        /// Builds a session against a real host from `config`.
        ///
        /// # Errors
        /// `FeedError::Load` / `FeedError::Transport` when the configured
        /// URLs are invalid. Nothing is contacted yet.
        pub fn from_config(config: &SessionConfig, sink: P) -> Result<Self, FeedError> {
            let source = HttpSnapshotSource::new(&config.base_url, config.snapshot_path.clone(), config.snapshot_timeout)?;
            let transport = LiveTransport::new(WssConnector, config.push_url()?, config.reconnect_delay);
            Ok(FeedSession::new(config.policy, source, transport, sink))
        }
    }
}
