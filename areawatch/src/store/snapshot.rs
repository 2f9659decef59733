//! Immutable point-in-time copies of the store and delta computation.

use std::collections::HashMap;

use rayon::prelude::*;

use super::TargetId;
use crate::geometry::PositionTime;

/// An immutable copy of every target's latest report at one instant.
///
/// Snapshots exist to be diffed against the next one; see
/// [`Snapshot::changes_since`].
#[derive(Debug, Clone)]
pub struct Snapshot<T: TargetId> {
    positions: HashMap<T, PositionTime>,
}

impl<T: TargetId> Snapshot<T> {
    pub(crate) fn new(positions: HashMap<T, PositionTime>) -> Self {
        Self { positions }
    }

    /// A snapshot with no targets, used before the first tick.
    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    /// Report held for `target` when the snapshot was taken.
    pub fn get(&self, target: &T) -> Option<&PositionTime> {
        self.positions.get(target)
    }

    /// Number of targets in the snapshot.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True when the snapshot holds no targets.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Every `(target, report)` pair, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, &PositionTime)> {
        self.positions.iter()
    }

    /// Targets that are new or have moved since `previous`.
    ///
    /// A target whose timestamp advanced but whose coordinate is unchanged
    /// is not included. Targets present in `previous` but missing here are
    /// ignored (records are never removed from the store).
    pub fn changes_since(&self, previous: &Snapshot<T>) -> HashMap<T, PositionTime> {
        self.positions
            .par_iter()
            .filter(|(target, current)| match previous.positions.get(*target) {
                Some(before) => !before.position_equals(current),
                None => true,
            })
            .map(|(target, current)| (target.clone(), *current))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64, time: i64) -> PositionTime {
        PositionTime::from_coords(lat, lon, time).unwrap()
    }

    fn snapshot(entries: &[(&'static str, PositionTime)]) -> Snapshot<&'static str> {
        Snapshot::new(entries.iter().cloned().collect())
    }

    #[test]
    fn test_everything_is_new_against_empty() {
        let current = snapshot(&[("A", pt(1.0, 1.0, 1)), ("B", pt(2.0, 2.0, 1))]);
        let delta = current.changes_since(&Snapshot::empty());
        assert_eq!(delta.len(), 2);
    }

    #[test]
    fn test_delta_contains_moved_and_new_only() {
        let s1 = snapshot(&[
            ("moved", pt(1.0, 1.0, 1)),
            ("refreshed", pt(2.0, 2.0, 1)),
            ("idle", pt(3.0, 3.0, 1)),
        ]);
        let s2 = snapshot(&[
            ("moved", pt(1.5, 1.0, 2)),
            ("refreshed", pt(2.0, 2.0, 2)),
            ("idle", pt(3.0, 3.0, 1)),
            ("new", pt(4.0, 4.0, 2)),
        ]);

        let delta = s2.changes_since(&s1);

        assert_eq!(delta.len(), 2);
        assert_eq!(delta.get("moved"), Some(&pt(1.5, 1.0, 2)));
        assert_eq!(delta.get("new"), Some(&pt(4.0, 4.0, 2)));
        assert!(
            !delta.contains_key("refreshed"),
            "timestamp-only refresh is not a change"
        );
        assert!(!delta.contains_key("idle"));
    }

    #[test]
    fn test_identical_snapshots_have_no_delta() {
        let s1 = snapshot(&[("A", pt(1.0, 1.0, 1))]);
        let s2 = s1.clone();
        assert!(s2.changes_since(&s1).is_empty());
    }

    #[test]
    fn test_empty_snapshot() {
        let empty: Snapshot<u64> = Snapshot::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
        assert_eq!(empty.iter().count(), 0);
    }
}
