//! Concurrent store of the latest known position per target.
//!
//! # Thread Safety
//!
//! - Per-target merges go through `DashMap` entries (per-shard write locks),
//!   never a whole-store lock
//! - Scans copy the records out first and visit the copy in parallel with
//!   rayon; no shard lock is held while a visitor runs
//! - [`PositionStore::snapshot`] copies shard by shard, so producers keep
//!   writing while a snapshot is taken
//!
//! # Merge rule
//!
//! The stored value for a target is always the report with the greatest
//! timestamp ever submitted for it. A report older than the stored one is
//! discarded; a report with an equal or newer timestamp replaces it. The
//! rule is a per-key max, so any interleaving of the same set of calls ends
//! in the same state.

mod snapshot;

use std::fmt::Debug;
use std::hash::Hash;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rayon::prelude::*;

use crate::geometry::{Area, PositionTime};

pub use snapshot::Snapshot;

/// Identity of a tracked object.
///
/// Any cheap-to-clone, hashable key works: an MMSI number, a call sign
/// string, a UUID. Blanket-implemented for every qualifying type.
pub trait TargetId: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> TargetId for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// What a single [`PositionStore::update`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// First report for this target.
    Created,
    /// Replaced an older (or same-time) report.
    Replaced,
    /// Older than the stored report; discarded.
    Stale,
}

/// Latest position-time per target.
pub struct PositionStore<T: TargetId> {
    targets: DashMap<T, PositionTime>,
}

impl<T: TargetId> PositionStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            targets: DashMap::new(),
        }
    }

    /// Merge a report into the store, keeping the newest timestamp.
    pub fn update(&self, target: T, position: PositionTime) -> UpdateOutcome {
        match self.targets.entry(target) {
            Entry::Occupied(mut entry) => {
                if position.is_not_older_than(entry.get()) {
                    entry.insert(position);
                    UpdateOutcome::Replaced
                } else {
                    UpdateOutcome::Stale
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(position);
                UpdateOutcome::Created
            }
        }
    }

    /// Latest report for one target.
    pub fn get(&self, target: &T) -> Option<PositionTime> {
        self.targets.get(target).map(|entry| *entry.value())
    }

    /// Visit every stored target in parallel, in no particular order.
    ///
    /// The store does not pre-filter: the visitor receives `area` alongside
    /// each record and applies the containment test itself.
    ///
    /// Records are copied before visiting, so a visitor may call
    /// [`update`](Self::update) on this store and producers are never held
    /// up by a slow visitor. Reports merged during the scan are not visited.
    pub fn for_each_within_area<F>(&self, area: &dyn Area, visitor: F)
    where
        F: Fn(&dyn Area, &T, &PositionTime) + Send + Sync,
    {
        let records: Vec<(T, PositionTime)> = self
            .targets
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        records
            .into_par_iter()
            .for_each(|(target, position)| visitor(area, &target, &position));
    }

    /// Point-in-time copy of every record.
    pub fn snapshot(&self) -> Snapshot<T> {
        Snapshot::new(
            self.targets
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        )
    }

    /// Number of tracked targets.
    pub fn size(&self) -> usize {
        self.targets.len()
    }

    /// True when no target has been reported yet.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl<T: TargetId> Default for PositionStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
