//! # Feed Store
//!
//! The single source of truth for the records a session knows about. It is an
//! ordered, deduplicated collection with one of two capacity policies:
//!
//! - **Bounded resort**: after each merge the whole window is sorted by
//!   descending `creation_time` and cut to `capacity`. This is a materialized
//!   "top N most recent" view and tolerates overlapping redeliveries.
//! - **Unbounded append**: nothing is ever evicted. Live batches are put in
//!   front of everything already held, snapshot batches are appended, each
//!   batch sorted newest first. Arrival order of push events is preserved.
//!
//! Under both policies the first write for a key wins: later copies of a known
//! key are ignored, so merging the same batch twice changes nothing the
//! second time. A bounded merge that pushes out a key it carried itself keeps
//! that key retired, so a redelivery of the batch cannot bring it back.
//!
//! The store has no interior locking. The session owns it and hands out
//! `&mut` borrows to whichever component is applying an event, so each
//! mutation runs to completion before the next one starts.

use std::collections::HashSet;

use crate::core::record::{Record, RecordKey, RecordStatus};

/// How the store bounds and orders its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityPolicy {
    /// Keep only the `capacity` newest records, always sorted newest first.
    BoundedResort {
        /// Maximum number of records retained. `0` keeps the store empty.
        capacity: usize,
    },
    /// Keep everything, preserving arrival order of live batches.
    UnboundedAppend,
}

impl Default for CapacityPolicy {
    /// Bounded to 20, the size of the server's latest-images window.
    fn default() -> Self {
        CapacityPolicy::BoundedResort { capacity: 20 }
    }
}

/// Where a batch came from. Only the unbounded policy places them differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOrigin {
    /// The one-shot snapshot pull.
    Snapshot,
    /// A push event from the live transport.
    Live,
}

/// Outcome of a [`FeedStore::merge`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeResult {
    /// Records that are new to the store and still held after eviction,
    /// newest first.
    pub inserted: Vec<Record>,
    /// Keys of previously held records that the merge pushed out of the window.
    pub evicted: Vec<RecordKey>,
    /// Incoming records skipped because their key was already known.
    pub duplicates: usize,
}

impl MergeResult {
    /// `true` when the merge left the visible contents untouched.
    pub fn is_noop(&self) -> bool {
        self.inserted.is_empty() && self.evicted.is_empty()
    }
}

/// Bounded or unbounded, ordered, deduplicated collection of records.
#[derive(Debug, Clone)]
pub struct FeedStore {
    policy: CapacityPolicy,
    records: Vec<Record>,
    keys: HashSet<RecordKey>,
    // Evicted by a merge that also delivered them.
    retired: HashSet<RecordKey>,
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new(CapacityPolicy::default())
    }
}

impl FeedStore {
    /// Creates an empty store with the given policy.
    pub fn new(policy: CapacityPolicy) -> Self {
        Self {
            policy,
            records: Vec::new(),
            keys: HashSet::new(),
            retired: HashSet::new(),
        }
    }

    pub fn policy(&self) -> CapacityPolicy {
        self.policy
    }

    /// Inserts every record whose key is not yet present.
    ///
    /// Duplicates, both against the store and within `incoming`, are skipped
    /// without touching the copy already held. Keys retired by an earlier
    /// bounded merge count as duplicates too.
    pub fn merge<I>(&mut self, incoming: I, origin: MergeOrigin) -> MergeResult
    where
        I: IntoIterator<Item = Record>,
    {
        let mut duplicates = 0;
        let mut fresh: Vec<Record> = Vec::new();
        let mut fresh_keys: HashSet<RecordKey> = HashSet::new();
        let mut carried: HashSet<RecordKey> = HashSet::new();

        for record in incoming {
            let key = record.key();
            if self.keys.contains(&key) || self.retired.contains(&key) {
                carried.insert(key);
                duplicates += 1;
                continue;
            }
            carried.insert(key.clone());
            self.keys.insert(key.clone());
            fresh_keys.insert(key);
            fresh.push(record);
        }

        if fresh.is_empty() {
            return MergeResult { duplicates, ..MergeResult::default() };
        }

        let result = match self.policy {
            CapacityPolicy::BoundedResort { capacity } => self.merge_bounded(fresh, &fresh_keys, &carried, capacity),
            CapacityPolicy::UnboundedAppend => self.merge_unbounded(fresh, origin),
        };

        log::trace!(
            "Merged {:?} batch: {} inserted, {} evicted, {} duplicates, {} held",
            origin,
            result.inserted.len(),
            result.evicted.len(),
            duplicates,
            self.records.len()
        );

        MergeResult { duplicates, ..result }
    }

    fn merge_bounded(
        &mut self,
        fresh: Vec<Record>,
        fresh_keys: &HashSet<RecordKey>,
        carried: &HashSet<RecordKey>,
        capacity: usize,
    ) -> MergeResult {
        self.records.extend(fresh);
        sort_newest_first(&mut self.records);

        let mut evicted = Vec::new();
        if self.records.len() > capacity {
            for dropped in self.records.split_off(capacity) {
                let key = dropped.key();
                self.keys.remove(&key);
                if carried.contains(&key) {
                    self.retired.insert(key.clone());
                }
                if !fresh_keys.contains(&key) {
                    evicted.push(key);
                }
            }
        }

        let inserted = self
            .records
            .iter()
            .filter(|r| fresh_keys.contains(&r.key()))
            .cloned()
            .collect();

        MergeResult { inserted, evicted, duplicates: 0 }
    }

    fn merge_unbounded(&mut self, mut fresh: Vec<Record>, origin: MergeOrigin) -> MergeResult {
        sort_newest_first(&mut fresh);
        match origin {
            MergeOrigin::Live => {
                self.records.splice(0..0, fresh.iter().cloned());
            }
            MergeOrigin::Snapshot => {
                self.records.extend(fresh.iter().cloned());
            }
        }
        MergeResult { inserted: fresh, evicted: Vec::new(), duplicates: 0 }
    }

    /// Advances the status of the record with `key`.
    ///
    /// Returns whether anything changed. Unknown keys, records that are
    /// already confirmed and any attempt to move back to `Pending` are no-ops.
    /// The record keeps its position.
    pub fn mark_status(&mut self, key: &RecordKey, status: RecordStatus) -> bool {
        if status != RecordStatus::Confirmed {
            return false;
        }
        match self.records.iter_mut().find(|r| r.has_key(key)) {
            Some(record) => record.confirm(),
            None => false,
        }
    }

    /// Current contents in canonical order.
    pub fn snapshot_view(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, key: &RecordKey) -> Option<&Record> {
        self.records.iter().find(|r| r.has_key(key))
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// Stable, so equal creation times keep their relative order.
fn sort_newest_first(records: &mut [Record]) {
    records.sort_by(|a, b| b.creation_time().cmp(&a.creation_time()));
}
