//! # Projection Sink
//!
//! The rendering side of the feed. A sink only ever sees borrowed, read-only
//! views of the store, so it cannot mutate what it displays.

use crate::core::record::{Record, RecordKey};

/// Consumer of feed contents and deltas.
pub trait ProjectionSink {
    /// Called once after the snapshot pull with the full ordered view and the
    /// aggregate pending-pool size reported by the server.
    fn on_initial_render(&mut self, records: &[Record], aggregate_size: u64);

    /// Called with records newly inserted by a push event, newest first.
    fn on_records_added(&mut self, records: &[Record]);

    /// Called for every status event, whether or not the store still holds
    /// the record.
    fn on_status_changed(&mut self, key: &RecordKey);
}

/// A sink that renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProjectionSink for NullSink {
    fn on_initial_render(&mut self, _records: &[Record], _aggregate_size: u64) {}
    fn on_records_added(&mut self, _records: &[Record]) {}
    fn on_status_changed(&mut self, _key: &RecordKey) {}
}

impl<T: ProjectionSink + ?Sized> ProjectionSink for &mut T {
    fn on_initial_render(&mut self, records: &[Record], aggregate_size: u64) {
        (**self).on_initial_render(records, aggregate_size)
    }

    fn on_records_added(&mut self, records: &[Record]) {
        (**self).on_records_added(records)
    }

    fn on_status_changed(&mut self, key: &RecordKey) {
        (**self).on_status_changed(key)
    }
}
