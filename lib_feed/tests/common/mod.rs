//! Shared fixtures: a recording sink and a scripted connector that replays
//! connection outcomes without touching the network.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use lib_feed::ingestors::{Connection, Connector};
use lib_feed::retrieve::{SnapshotPayload, SnapshotSource};
use lib_feed::{LoadError, ProjectionSink, Record, RecordKey, TransportError};
use serde_json::{json, Value};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub initial: Option<(Vec<Record>, u64)>,
    pub added: Vec<Vec<Record>>,
    pub status: Vec<RecordKey>,
}

impl ProjectionSink for RecordingSink {
    fn on_initial_render(&mut self, records: &[Record], aggregate_size: u64) {
        self.initial = Some((records.to_vec(), aggregate_size));
    }

    fn on_records_added(&mut self, records: &[Record]) {
        self.added.push(records.to_vec());
    }

    fn on_status_changed(&mut self, key: &RecordKey) {
        self.status.push(key.clone());
    }
}

/// One scripted connection attempt.
pub enum Step {
    /// The handshake fails.
    Refuse,
    /// The handshake succeeds, these frames arrive, then the server closes.
    Deliver(Vec<String>),
}

/// Replays `Step`s in order. Once the script runs out it cancels `shutdown`
/// and never completes, which ends the transport's run loop.
pub struct ScriptedConnector {
    script: VecDeque<Step>,
    pub attempts: Rc<RefCell<Vec<Instant>>>,
    shutdown: CancellationToken,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Step>, shutdown: CancellationToken) -> Self {
        Self {
            script: script.into(),
            attempts: Rc::new(RefCell::new(Vec::new())),
            shutdown,
        }
    }
}

pub struct ScriptedConnection {
    frames: VecDeque<String>,
}

impl Connection for ScriptedConnection {
    async fn recv(&mut self) -> Result<String, TransportError> {
        self.frames.pop_front().ok_or(TransportError::Closed)
    }
}

impl Connector for ScriptedConnector {
    type Conn = ScriptedConnection;

    async fn connect(&mut self, _url: &Url) -> Result<ScriptedConnection, TransportError> {
        self.attempts.borrow_mut().push(Instant::now());
        match self.script.pop_front() {
            Some(Step::Refuse) => Err(TransportError::Connect("connection refused".into())),
            Some(Step::Deliver(frames)) => Ok(ScriptedConnection { frames: frames.into() }),
            None => {
                self.shutdown.cancel();
                std::future::pending().await
            }
        }
    }
}

/// Snapshot source answering with a fixed payload or failing.
pub struct FixedSnapshot(pub Option<SnapshotPayload>);

impl SnapshotSource for FixedSnapshot {
    async fn fetch(&self) -> Result<SnapshotPayload, LoadError> {
        self.0
            .clone()
            .ok_or_else(|| LoadError::Request("connection refused".into()))
    }
}

/// Like `FixedSnapshot`, but answers only after `delay`.
pub struct DelayedSnapshot {
    pub delay: Duration,
    pub payload: Option<SnapshotPayload>,
}

impl SnapshotSource for DelayedSnapshot {
    async fn fetch(&self) -> Result<SnapshotPayload, LoadError> {
        tokio::time::sleep(self.delay).await;
        self.payload
            .clone()
            .ok_or_else(|| LoadError::Request("request timed out".into()))
    }
}

pub fn raw(tx_id: &str, creation_time: i64) -> Value {
    json!({
        "tx_id": tx_id,
        "image": format!("{}.png", tx_id),
        "creation_time": creation_time,
        "data": { "tx_id": tx_id, "fee_rate": 10.5, "content_type": "image/png", "content_length": 512 }
    })
}

pub fn new_tx(records: &[Value]) -> String {
    json!({ "type": "new_tx", "payload": records }).to_string()
}

pub fn tx_deleted(tx_id: &str) -> String {
    json!({ "type": "tx_deleted", "payload": tx_id }).to_string()
}

pub fn push_url() -> Url {
    Url::parse("ws://feed.test/ws").unwrap()
}

pub fn tx_ids(records: &[Record]) -> Vec<String> {
    records.iter().filter_map(|r| r.tx_id().map(str::to_string)).collect()
}
