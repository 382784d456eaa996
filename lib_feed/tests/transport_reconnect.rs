//! Reconnect and event-application behavior of the live transport, driven by
//! a scripted connector on paused tokio time.

mod common;

use std::time::Duration;

use common::*;
use lib_feed::ingestors::{ConnectionState, LiveTransport};
use lib_feed::{CapacityPolicy, FeedSession, FeedStore, MergeOrigin, Record, RecordKey, RecordStatus};
use lib_feed::retrieve::SnapshotPayload;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const DELAY: Duration = Duration::from_millis(5000);

fn transport(script: Vec<Step>, shutdown: &CancellationToken) -> LiveTransport<ScriptedConnector> {
    LiveTransport::new(ScriptedConnector::new(script, shutdown.clone()), push_url(), DELAY)
}

#[tokio::test(start_paused = true)]
async fn reconnects_after_exactly_the_configured_delay() {
    let shutdown = CancellationToken::new();
    let mut live = transport(
        vec![
            Step::Deliver(vec![]),
            Step::Refuse,
            Step::Refuse,
            Step::Deliver(vec![]),
        ],
        &shutdown,
    );
    let attempts = live.connector().attempts.clone();

    let started = Instant::now();
    let mut store = FeedStore::default();
    let mut sink = RecordingSink::default();
    live.run(&mut store, &mut sink, &shutdown).await;

    let attempts = attempts.borrow();
    // Four scripted outcomes plus the attempt that found the script empty.
    assert_eq!(attempts.len(), 5);
    assert_eq!(live.attempts(), 5);
    assert_eq!(attempts[0] - started, Duration::ZERO);
    for pair in attempts.windows(2) {
        assert_eq!((pair[1] - pair[0]).as_millis(), DELAY.as_millis());
    }
}

#[tokio::test(start_paused = true)]
async fn keeps_retrying_a_refusing_host() {
    let shutdown = CancellationToken::new();
    let script = (0..50).map(|_| Step::Refuse).collect();
    let mut live = transport(script, &shutdown);

    let started = Instant::now();
    live.run(&mut FeedStore::default(), &mut RecordingSink::default(), &shutdown).await;

    assert_eq!(live.attempts(), 51);
    assert_eq!(started.elapsed().as_millis(), 50 * DELAY.as_millis());
    assert_eq!(live.state(), ConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn confirmation_survives_a_reconnect() {
    let shutdown = CancellationToken::new();
    let mut live = transport(
        vec![
            Step::Deliver(vec![new_tx(&[raw("x", 100)])]),
            Step::Deliver(vec![tx_deleted("x")]),
        ],
        &shutdown,
    );
    let mut store = FeedStore::default();
    let mut sink = RecordingSink::default();

    live.run(&mut store, &mut sink, &shutdown).await;

    let x = store.get(&RecordKey::tx("x")).expect("x is held");
    assert_eq!(x.status(), RecordStatus::Confirmed);
    assert_eq!(sink.added.len(), 1);
    assert_eq!(tx_ids(&sink.added[0]), vec!["x"]);
    assert_eq!(sink.status, vec![RecordKey::tx("x")]);
    assert_eq!(live.stats().confirmations, 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_tags_do_not_close_the_connection() {
    let shutdown = CancellationToken::new();
    let mut live = transport(
        vec![Step::Deliver(vec![
            r#"{"type":"hello","payload":"world"}"#.to_string(),
            "garbage".to_string(),
            new_tx(&[raw("y", 1)]),
        ])],
        &shutdown,
    );
    let mut store = FeedStore::default();

    live.run(&mut store, &mut RecordingSink::default(), &shutdown).await;

    assert!(store.contains(&RecordKey::tx("y")));
    let stats = live.stats();
    assert_eq!(stats.messages, 3);
    assert_eq!(stats.violations, 2);
    // One connection for all three frames, one more after the close.
    assert_eq!(live.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn status_before_record_is_benign() {
    let shutdown = CancellationToken::new();
    let mut live = transport(
        vec![Step::Deliver(vec![tx_deleted("z"), new_tx(&[raw("z", 7)])])],
        &shutdown,
    );
    let mut store = FeedStore::default();
    let mut sink = RecordingSink::default();

    live.run(&mut store, &mut sink, &shutdown).await;

    assert_eq!(sink.status, vec![RecordKey::tx("z")]);
    assert_eq!(store.get(&RecordKey::tx("z")).unwrap().status(), RecordStatus::Pending);
    assert_eq!(live.stats().confirmations, 0);
}

#[tokio::test(start_paused = true)]
async fn confirmation_for_evicted_record_is_dropped_but_forwarded() {
    let shutdown = CancellationToken::new();
    let mut live = transport(
        vec![Step::Deliver(vec![
            new_tx(&[raw("a", 100)]),
            new_tx(&[raw("b", 200)]),
            tx_deleted("a"),
        ])],
        &shutdown,
    );
    let mut store = FeedStore::new(CapacityPolicy::BoundedResort { capacity: 1 });
    let mut sink = RecordingSink::default();

    live.run(&mut store, &mut sink, &shutdown).await;

    assert_eq!(tx_ids(store.snapshot_view()), vec!["b"]);
    assert_eq!(sink.status, vec![RecordKey::tx("a")]);
    assert_eq!(live.stats().confirmations, 0);
}

#[tokio::test(start_paused = true)]
async fn redelivered_batches_are_not_rendered_twice() {
    let shutdown = CancellationToken::new();
    let batch = new_tx(&[raw("a", 1), raw("b", 2)]);
    let mut live = transport(
        vec![
            Step::Deliver(vec![batch.clone()]),
            Step::Deliver(vec![batch, new_tx(&[raw("c", 3)])]),
        ],
        &shutdown,
    );
    let mut store = FeedStore::default();
    let mut sink = RecordingSink::default();

    live.run(&mut store, &mut sink, &shutdown).await;

    assert_eq!(sink.added.len(), 2);
    assert_eq!(tx_ids(&sink.added[0]), vec!["b", "a"]);
    assert_eq!(tx_ids(&sink.added[1]), vec!["c"]);
    assert_eq!(tx_ids(store.snapshot_view()), vec!["c", "b", "a"]);
}

#[tokio::test(start_paused = true)]
async fn unbounded_policy_prepends_live_records() {
    let shutdown = CancellationToken::new();
    let mut live = transport(vec![Step::Deliver(vec![new_tx(&[raw("late", 5)])])], &shutdown);
    let mut store = FeedStore::new(CapacityPolicy::UnboundedAppend);
    store.merge(
        vec![Record::new("old.png", 50).with_tx_id("old")],
        MergeOrigin::Snapshot,
    );

    live.run(&mut store, &mut RecordingSink::default(), &shutdown).await;

    assert_eq!(tx_ids(store.snapshot_view()), vec!["late", "old"]);
}

#[tokio::test(start_paused = true)]
async fn session_survives_failed_snapshot() {
    let shutdown = CancellationToken::new();
    let live = transport(vec![Step::Deliver(vec![new_tx(&[raw("p", 9)])])], &shutdown);
    let mut session = FeedSession::new(CapacityPolicy::default(), FixedSnapshot(None), live, RecordingSink::default());

    session.run(&shutdown).await;

    assert!(session.sink().initial.is_none());
    assert_eq!(session.aggregate_size(), None);
    assert_eq!(tx_ids(session.store().snapshot_view()), vec!["p"]);
}

#[tokio::test(start_paused = true)]
async fn session_pulls_once_then_follows_pushes() {
    let shutdown = CancellationToken::new();
    let payload = SnapshotPayload {
        size: 77,
        result: vec![raw("a", 100), raw("b", 200)],
    };
    let live = transport(
        vec![Step::Deliver(vec![new_tx(&[raw("c", 300), raw("a", 100)]), tx_deleted("b")])],
        &shutdown,
    );
    let mut session = FeedSession::new(
        CapacityPolicy::default(),
        FixedSnapshot(Some(payload)),
        live,
        RecordingSink::default(),
    );

    session.run(&shutdown).await;
    // The loader is spent; a second call does nothing.
    assert!(session.load_snapshot().await.is_none());

    let (initial, size) = session.sink().initial.clone().unwrap();
    assert_eq!(size, 77);
    assert_eq!(tx_ids(&initial), vec!["b", "a"]);
    assert_eq!(session.aggregate_size(), Some(77));
    assert_eq!(tx_ids(&session.sink().added[0]), vec!["c"]);

    let (store, _) = session.into_parts();
    assert_eq!(tx_ids(store.snapshot_view()), vec!["c", "b", "a"]);
    assert_eq!(store.get(&RecordKey::tx("b")).unwrap().status(), RecordStatus::Confirmed);
}

#[tokio::test(start_paused = true)]
async fn first_connect_does_not_wait_for_snapshot() {
    let shutdown = CancellationToken::new();
    let live = transport(
        vec![
            Step::Deliver(vec![new_tx(&[raw("c", 300)])]),
            Step::Refuse,
            Step::Refuse,
            Step::Deliver(vec![]),
        ],
        &shutdown,
    );
    let attempts = live.connector().attempts.clone();
    let snapshot = DelayedSnapshot {
        delay: Duration::from_secs(12),
        payload: Some(SnapshotPayload {
            size: 42,
            result: vec![raw("a", 100), raw("b", 200)],
        }),
    };
    let mut session = FeedSession::new(CapacityPolicy::default(), snapshot, live, RecordingSink::default());

    let started = Instant::now();
    session.run(&shutdown).await;

    let attempts = attempts.borrow();
    assert_eq!(attempts[0] - started, Duration::ZERO);
    // The pending pull does not disturb the reconnect timer.
    for pair in attempts.windows(2) {
        assert_eq!((pair[1] - pair[0]).as_millis(), DELAY.as_millis());
    }

    // The live record arrived first and is part of the pulled view.
    assert_eq!(tx_ids(&session.sink().added[0]), vec!["c"]);
    let (initial, size) = session.sink().initial.clone().unwrap();
    assert_eq!(size, 42);
    assert_eq!(tx_ids(&initial), vec!["c", "b", "a"]);
    assert_eq!(session.aggregate_size(), Some(42));
}

#[tokio::test(start_paused = true)]
async fn slow_failing_snapshot_leaves_the_push_running() {
    let shutdown = CancellationToken::new();
    let live = transport(
        vec![
            Step::Refuse,
            Step::Deliver(vec![new_tx(&[raw("p", 9)])]),
        ],
        &shutdown,
    );
    let attempts = live.connector().attempts.clone();
    let snapshot = DelayedSnapshot {
        delay: Duration::from_secs(2),
        payload: None,
    };
    let mut session = FeedSession::new(CapacityPolicy::default(), snapshot, live, RecordingSink::default());

    let started = Instant::now();
    session.run(&shutdown).await;

    assert_eq!(attempts.borrow().len(), 3);
    assert_eq!(started.elapsed().as_millis(), 2 * DELAY.as_millis());
    assert!(session.sink().initial.is_none());
    assert_eq!(session.aggregate_size(), None);
    assert_eq!(tx_ids(session.store().snapshot_view()), vec!["p"]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_the_reconnect_timer() {
    let shutdown = CancellationToken::new();
    let mut live = transport(vec![Step::Refuse, Step::Refuse], &shutdown);
    let stopper = shutdown.clone();
    let mut store = FeedStore::default();
    let mut sink = RecordingSink::default();

    let started = Instant::now();
    tokio::join!(
        live.run(&mut store, &mut sink, &shutdown),
        async move {
            tokio::time::sleep(Duration::from_millis(1000)).await;
            stopper.cancel();
        }
    );

    assert_eq!(started.elapsed().as_millis(), 1000);
    assert_eq!(live.attempts(), 1);
    assert_eq!(live.state(), ConnectionState::Closed);
}
