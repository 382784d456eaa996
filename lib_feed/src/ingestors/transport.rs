//! # Live Transport
//!
//! A reconnecting push client. The connection lifecycle is an explicit state
//! machine ([`ReconnectMachine`]) and the network sits behind the
//! [`Connector`] / [`Connection`] traits, so the reconnect contract can be
//! exercised without sockets.
//!
//! ```text
//!   Idle --start--> Connecting --handshake_succeeded--> Open
//!                      ^   |                              |
//!        delay_elapsed |   +------connection_lost------+  |
//!                      |                               v  v
//!                      +-------------------------- Closed
//! ```
//!
//! A failed handshake, a read error and a server close are all the same
//! `connection_lost` transition. Every loss schedules exactly one reconnect
//! after the fixed delay: no backoff, no jitter, no retry cap.
//!
//! While `Open`, frames are applied to the feed store in receipt order and
//! each one runs to completion before the next is read. The store survives
//! reconnects; only the connection object is replaced.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::core::feed_store::{FeedStore, MergeOrigin};
use crate::core::record::{decode_batch, RecordStatus};
use crate::core::sink::ProjectionSink;
use crate::error::TransportError;
use crate::ingestors::messages::{parse_message, FeedEvent};

/// Delay between a connection loss and the next attempt, unless configured.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Lifecycle state of the push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not started yet.
    Idle,
    /// A handshake is in flight.
    Connecting,
    /// Frames are being delivered.
    Open,
    /// Lost; a reconnect is scheduled.
    Closed,
}

/// What the driver has to do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    /// Issue a connection attempt now.
    Connect,
    /// Wait this long, then report `delay_elapsed`.
    ScheduleReconnect(Duration),
    /// Nothing; the event did not apply to the current state.
    None,
}

/// Pure reconnect state machine.
#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    state: ConnectionState,
    reconnect_delay: Duration,
    attempts: u64,
}

impl ReconnectMachine {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Idle,
            reconnect_delay,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// Number of connection attempts issued so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// `Idle -> Connecting`.
    pub fn start(&mut self) -> TransportAction {
        match self.state {
            ConnectionState::Idle => self.begin_attempt(),
            _ => TransportAction::None,
        }
    }

    /// `Connecting -> Open`.
    pub fn handshake_succeeded(&mut self) -> TransportAction {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Open;
        }
        TransportAction::None
    }

    /// `Connecting | Open -> Closed`, for errors and closes alike.
    ///
    /// A second loss report for the same connection (an error followed by a
    /// close) finds the machine already `Closed` and schedules nothing.
    pub fn connection_lost(&mut self) -> TransportAction {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => {
                self.state = ConnectionState::Closed;
                TransportAction::ScheduleReconnect(self.reconnect_delay)
            }
            _ => TransportAction::None,
        }
    }

    /// `Closed -> Connecting`.
    pub fn delay_elapsed(&mut self) -> TransportAction {
        match self.state {
            ConnectionState::Closed => self.begin_attempt(),
            _ => TransportAction::None,
        }
    }

    fn begin_attempt(&mut self) -> TransportAction {
        self.state = ConnectionState::Connecting;
        self.attempts += 1;
        TransportAction::Connect
    }
}

/// One open push connection.
#[allow(async_fn_in_trait)]
pub trait Connection {
    /// Waits for the next text frame.
    ///
    /// Control frames are handled internally. A close, end of stream or read
    /// error is returned as `Err` and ends this connection instance.
    async fn recv(&mut self) -> Result<String, TransportError>;
}

/// Opens push connections.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Conn: Connection;

    /// Performs the handshake with `url`.
    async fn connect(&mut self, url: &Url) -> Result<Self::Conn, TransportError>;
}

/// Counters over the lifetime of a transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Text frames received across all connections.
    pub messages: u64,
    /// Frames ignored as protocol violations.
    pub violations: u64,
    /// Records newly inserted into the store.
    pub records_added: u64,
    /// Status events that confirmed a record still held by the store.
    pub confirmations: u64,
}

/// Drives a [`ReconnectMachine`] over a [`Connector`] and applies inbound
/// events to a feed store.
pub struct LiveTransport<C: Connector> {
    connector: C,
    url: Url,
    machine: ReconnectMachine,
    connection: Option<C::Conn>,
    stats: TransportStats,
}

impl<C: Connector> LiveTransport<C> {
    pub fn new(connector: C, url: Url, reconnect_delay: Duration) -> Self {
        Self {
            connector,
            url,
            machine: ReconnectMachine::new(reconnect_delay),
            connection: None,
            stats: TransportStats::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.machine.state()
    }

    pub fn attempts(&self) -> u64 {
        self.machine.attempts()
    }

    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Runs until `shutdown` is cancelled, reconnecting forever.
    ///
    /// Pending handshakes, reads and reconnect timers are abandoned as soon
    /// as the token fires.
    pub async fn run<P>(&mut self, store: &mut FeedStore, sink: &mut P, shutdown: &CancellationToken)
    where
        P: ProjectionSink + ?Sized,
    {
        self.run_alongside(store, sink, shutdown, std::future::pending::<()>(), |_, _, _| {})
            .await;
    }

    /// Like [`run`](Self::run), but also drives `side` on the same task.
    ///
    /// The first connection attempt does not wait for `side`. When `side`
    /// completes, `on_side` gets its output together with the store and the
    /// sink, between two transport events, so the store keeps one writer.
    /// An in-flight handshake, read or timer is not interrupted by it.
    pub async fn run_alongside<P, F, H>(
        &mut self,
        store: &mut FeedStore,
        sink: &mut P,
        shutdown: &CancellationToken,
        side: F,
        on_side: H,
    ) where
        P: ProjectionSink + ?Sized,
        F: Future,
        H: FnOnce(F::Output, &mut FeedStore, &mut P),
    {
        tokio::pin!(side);
        let mut side = Side {
            future: side,
            handler: Some(on_side),
        };

        loop {
            match self.machine.state() {
                ConnectionState::Idle => {
                    self.machine.start();
                }
                ConnectionState::Connecting => {
                    log::info!("Connecting to push endpoint {} (attempt {})", self.url, self.machine.attempts());
                    let connect = self.connector.connect(&self.url);
                    let Some(attempt) = side.drive(connect, store, sink, shutdown).await else {
                        break;
                    };
                    match attempt {
                        Ok(connection) => {
                            self.connection = Some(connection);
                            self.machine.handshake_succeeded();
                            log::info!("Push connection open.");
                        }
                        Err(e) => {
                            log::error!("Push connection failed: {}", e);
                            self.lose_connection();
                        }
                    }
                }
                ConnectionState::Open => {
                    let Some(connection) = self.connection.as_mut() else {
                        self.lose_connection();
                        continue;
                    };
                    let Some(frame) = side.drive(connection.recv(), store, sink, shutdown).await else {
                        break;
                    };
                    match frame {
                        Ok(text) => self.apply_frame(&text, store, sink),
                        Err(TransportError::Closed) => {
                            log::warn!("Push connection closed by remote host.");
                            self.lose_connection();
                        }
                        Err(e) => {
                            log::error!("Push connection error: {}", e);
                            self.lose_connection();
                        }
                    }
                }
                ConnectionState::Closed => {
                    let delay = self.machine.reconnect_delay();
                    if side.drive(tokio::time::sleep(delay), store, sink, shutdown).await.is_none() {
                        break;
                    }
                    self.machine.delay_elapsed();
                }
            }
        }

        self.connection = None;
        log::info!("Live transport stopped after {} connection attempts.", self.machine.attempts());
    }

    fn lose_connection(&mut self) {
        self.connection = None;
        if let TransportAction::ScheduleReconnect(delay) = self.machine.connection_lost() {
            log::info!(
                "Reconnecting in {} ms (attempt {} next)...",
                delay.as_millis(),
                self.machine.attempts() + 1
            );
        }
    }

    /// Applies one text frame to the store and forwards the delta.
    fn apply_frame<P>(&mut self, text: &str, store: &mut FeedStore, sink: &mut P)
    where
        P: ProjectionSink + ?Sized,
    {
        self.stats.messages += 1;
        log::trace!("Push frame: {}", text);

        match parse_message(text) {
            Ok(FeedEvent::NewRecords(items)) => {
                let merged = store.merge(decode_batch(items), MergeOrigin::Live);
                if !merged.inserted.is_empty() {
                    self.stats.records_added += merged.inserted.len() as u64;
                    sink.on_records_added(&merged.inserted);
                }
            }
            Ok(FeedEvent::StatusChanged(key)) => {
                if store.mark_status(&key, RecordStatus::Confirmed) {
                    self.stats.confirmations += 1;
                } else {
                    log::debug!("Status update for {} did not change the store.", key);
                }
                sink.on_status_changed(&key);
            }
            Err(violation) => {
                self.stats.violations += 1;
                log::warn!("Ignoring push message: {}", violation);
            }
        }
    }
}

/// A one-shot future serviced while the transport waits on its own work.
struct Side<'a, F: Future, H> {
    future: Pin<&'a mut F>,
    handler: Option<H>,
}

impl<F: Future, H> Side<'_, F, H> {
    /// Awaits `op` to completion, running the side future meanwhile.
    /// Returns `None` if `shutdown` fires first.
    async fn drive<O, P>(
        &mut self,
        op: O,
        store: &mut FeedStore,
        sink: &mut P,
        shutdown: &CancellationToken,
    ) -> Option<O::Output>
    where
        O: Future,
        P: ProjectionSink + ?Sized,
        H: FnOnce(F::Output, &mut FeedStore, &mut P),
    {
        tokio::pin!(op);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return None,
                output = self.future.as_mut(), if self.handler.is_some() => {
                    if let Some(handler) = self.handler.take() {
                        handler(output, store, sink);
                    }
                }
                out = &mut op => return Some(out),
            }
        }
    }
}
