//! The position tracker: store, subscriptions and the reconciliation tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use tracing::{debug, info};

use super::registry::{SubscriptionHandle, SubscriptionRegistry};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::geometry::{Area, PositionTime};
use crate::store::{PositionStore, Snapshot, TargetId, UpdateOutcome};
use crate::subscription::{DeliveryReport, PositionUpdateHandler, Subscription, SubscriptionId};
use crate::telemetry::{TrackerMetrics, TrackerStats};

/// Outcome of one reconciliation tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Sequence number of this tick, starting at 1.
    pub tick: u64,
    /// Targets in the snapshot taken by this tick.
    pub tracked_objects: usize,
    /// Targets that were new or had moved since the previous tick.
    pub changes: usize,
    /// Subscriptions the changes were fanned out to.
    pub subscriptions: usize,
    /// Transitions delivered across all subscriptions.
    pub delivery: DeliveryReport,
    /// Wall time spent in the tick.
    pub elapsed: Duration,
}

/// Tracks the latest position of every target and notifies subscriptions
/// when targets cross their area boundaries.
///
/// # Concurrency
///
/// - [`update`](Self::update) may be called from any number of threads and
///   never waits for a tick
/// - [`run_reconciliation_tick`](Self::run_reconciliation_tick) is
///   serialized: concurrent callers run one after another
/// - Fan-out to subscriptions runs in parallel on the worker pool
///
/// The tracker does not schedule itself. Call the tick from a timer, or use
/// [`crate::scheduler::spawn_reconciliation`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use areawatch::geometry::{Circle, CoordinateSystem, Position, PositionTime};
/// use areawatch::subscription::Transition;
/// use areawatch::tracker::PositionTracker;
///
/// let tracker: PositionTracker<&str> = PositionTracker::with_defaults();
/// let area = Circle::new(Position::new(0.0, 0.0).unwrap(), 1.0, CoordinateSystem::Planar).unwrap();
///
/// let handler = |target: &&str, _: &PositionTime, transition: Transition| {
///     println!("{} {}", target, transition);
/// };
/// let handle = tracker.subscribe_with_slack(Arc::new(area), Arc::new(handler), 0.5).unwrap();
///
/// tracker.update("V1", PositionTime::from_coords(0.0, 0.0, 1).unwrap());
/// let report = tracker.run_reconciliation_tick();
/// assert_eq!(report.delivery.entered, 1);
/// assert!(handle.subscription().is_member(&"V1"));
/// ```
pub struct PositionTracker<T: TargetId> {
    config: TrackerConfig,
    store: PositionStore<T>,
    registry: Arc<SubscriptionRegistry<T>>,
    /// Snapshot from the previous tick; written only by the tick.
    previous: RwLock<Arc<Snapshot<T>>>,
    /// Serializes ticks and holds the tick sequence number.
    tick_lock: Mutex<u64>,
    /// Dedicated worker pool, or `None` for rayon's global pool.
    pool: Option<rayon::ThreadPool>,
    metrics: Arc<TrackerMetrics>,
}

impl<T: TargetId> PositionTracker<T> {
    /// Create a tracker.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::WorkerPool`] if a dedicated worker pool was
    /// requested and could not be built.
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        let pool = match config.worker_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|index| format!("areawatch-worker-{}", index))
                    .build()?,
            ),
            None => None,
        };
        info!(
            worker_threads = ?config.worker_threads,
            default_slack = config.default_slack,
            "Position tracker created"
        );
        Ok(Self::build(config, pool))
    }

    /// Create a tracker with default configuration on the shared rayon pool.
    pub fn with_defaults() -> Self {
        Self::build(TrackerConfig::default(), None)
    }

    fn build(config: TrackerConfig, pool: Option<rayon::ThreadPool>) -> Self {
        let metrics = Arc::new(TrackerMetrics::new());
        Self {
            config,
            store: PositionStore::new(),
            registry: Arc::new(SubscriptionRegistry::new(Arc::clone(&metrics))),
            previous: RwLock::new(Arc::new(Snapshot::empty())),
            tick_lock: Mutex::new(0),
            pool,
            metrics,
        }
    }

    /// Run `op` on the tracker's worker pool.
    fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    // === Producers ===

    /// Record a position report for a target.
    ///
    /// Unknown targets are created. A report older than the stored one is
    /// discarded silently.
    pub fn update(&self, target: T, position: PositionTime) -> UpdateOutcome {
        let outcome = self.store.update(target, position);
        match outcome {
            UpdateOutcome::Created => self.metrics.target_created(),
            UpdateOutcome::Replaced => self.metrics.update_accepted(),
            UpdateOutcome::Stale => self.metrics.update_stale(),
        }
        outcome
    }

    // === Subscriptions ===

    /// Subscribe `handler` to `area` using the configured default slack.
    pub fn subscribe(
        &self,
        area: Arc<dyn Area>,
        handler: Arc<dyn PositionUpdateHandler<T>>,
    ) -> Result<SubscriptionHandle<T>, TrackerError> {
        self.subscribe_with_slack(area, handler, self.config.default_slack)
    }

    /// Subscribe `handler` to `area` with an explicit exit slack.
    ///
    /// A member is reported as exited only once it is more than `slack`
    /// outside `area`.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::InvalidSlack`] for a negative or non-finite slack
    /// - [`TrackerError::UnsupportedSlack`] for `slack > 0` on a shape
    ///   that cannot expand
    /// - [`TrackerError::DuplicateHandler`] if this handler (same `Arc`
    ///   allocation) already backs an active subscription
    pub fn subscribe_with_slack(
        &self,
        area: Arc<dyn Area>,
        handler: Arc<dyn PositionUpdateHandler<T>>,
        slack: f64,
    ) -> Result<SubscriptionHandle<T>, TrackerError> {
        let subscription = Subscription::new(self.registry.allocate_id(), area, handler, slack)?;
        let subscription = self.registry.register(subscription)?;
        Ok(SubscriptionHandle::new(
            subscription,
            Arc::downgrade(&self.registry),
        ))
    }

    /// Cancel a subscription by id. Returns `false` if it was not active.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.remove(id)
    }

    /// Look up an active subscription.
    pub fn subscription(&self, id: SubscriptionId) -> Option<Arc<Subscription<T>>> {
        self.registry.get(id)
    }

    // === Queries ===

    /// Latest report for one target.
    pub fn position_of(&self, target: &T) -> Option<PositionTime> {
        self.store.get(target)
    }

    /// Visit every tracked target in parallel; see
    /// [`PositionStore::for_each_within_area`].
    pub fn for_each_within_area<F>(&self, area: &dyn Area, visitor: F)
    where
        F: Fn(&dyn Area, &T, &PositionTime) + Send + Sync,
    {
        self.install(|| self.store.for_each_within_area(area, visitor));
    }

    /// Every target whose latest position is inside `area`.
    ///
    /// A one-shot scan, independent of subscriptions and ticks.
    pub fn targets_within(&self, area: &dyn Area) -> HashMap<T, PositionTime> {
        let result = DashMap::new();
        self.for_each_within_area(area, |area, target, position| {
            if area.contains(position.position()) {
                result.insert(target.clone(), *position);
            }
        });
        result.into_iter().collect()
    }

    pub fn number_of_subscriptions(&self) -> usize {
        self.registry.len()
    }

    pub fn number_of_tracked_objects(&self) -> usize {
        self.store.size()
    }

    /// The snapshot taken by the most recent tick.
    pub fn last_snapshot(&self) -> Arc<Snapshot<T>> {
        Arc::clone(&self.previous.read())
    }

    /// Point-in-time copy of the tracker's counters.
    pub fn stats(&self) -> TrackerStats {
        self.metrics
            .snapshot(self.number_of_tracked_objects(), self.number_of_subscriptions())
    }

    // === Reconciliation ===

    /// Run one reconciliation tick.
    ///
    /// 1. Snapshot the store.
    /// 2. Diff against the previous tick's snapshot: keep targets that are
    ///    new or whose coordinate changed.
    /// 3. Deliver the changes to every active subscription in parallel.
    /// 4. Keep the snapshot for the next tick.
    ///
    /// Producers keep updating while this runs; a report arriving mid-tick
    /// is picked up by the next one.
    pub fn run_reconciliation_tick(&self) -> TickReport {
        let mut tick = self.tick_lock.lock();
        *tick += 1;
        let started = Instant::now();

        let current = Arc::new(self.store.snapshot());
        let previous = self.last_snapshot();
        let changes = self.install(|| current.changes_since(&previous));

        let subscriptions = self.registry.active();
        let delivery = if changes.is_empty() || subscriptions.is_empty() {
            DeliveryReport::default()
        } else {
            self.install(|| {
                subscriptions
                    .par_iter()
                    .map(|subscription| subscription.update_with(&changes))
                    .reduce(DeliveryReport::default, |a, b| a + b)
            })
        };

        let tracked_objects = current.len();
        *self.previous.write() = current;

        let elapsed = started.elapsed();
        self.metrics.tick_completed(changes.len(), elapsed);
        self.metrics
            .events_delivered(delivery.entered, delivery.exited, delivery.failed);

        debug!(
            tick = *tick,
            tracked = tracked_objects,
            changes = changes.len(),
            subscriptions = subscriptions.len(),
            entered = delivery.entered,
            exited = delivery.exited,
            failed = delivery.failed,
            elapsed_us = elapsed.as_micros() as u64,
            "Reconciliation tick complete"
        );

        TickReport {
            tick: *tick,
            tracked_objects,
            changes: changes.len(),
            subscriptions: subscriptions.len(),
            delivery,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SLACK;
    use crate::geometry::{BoundingBox, Circle, CoordinateSystem, Position};
    use crate::subscription::Transition;
    use std::sync::Mutex as StdMutex;

    type Log = Arc<StdMutex<Vec<(&'static str, Transition)>>>;

    fn recorder() -> (Arc<dyn PositionUpdateHandler<&'static str>>, Log) {
        let log: Log = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let handler = move |target: &&'static str, _: &PositionTime, transition: Transition| {
            sink.lock().unwrap().push((*target, transition));
        };
        (Arc::new(handler), log)
    }

    fn unit_circle() -> Arc<dyn Area> {
        Arc::new(
            Circle::new(
                Position::new(0.0, 0.0).unwrap(),
                1.0,
                CoordinateSystem::Planar,
            )
            .unwrap(),
        )
    }

    fn pt(lat: f64, lon: f64, time: i64) -> PositionTime {
        PositionTime::from_coords(lat, lon, time).unwrap()
    }

    #[test]
    fn test_slack_scenario_enter_hold_exit() {
        let tracker = PositionTracker::with_defaults();
        let (handler, log) = recorder();
        tracker
            .subscribe_with_slack(unit_circle(), handler, 0.5)
            .unwrap();

        tracker.update("V1", pt(0.0, 0.0, 1));
        tracker.run_reconciliation_tick();
        assert_eq!(*log.lock().unwrap(), vec![("V1", Transition::Entered)]);

        // Outside radius 1, inside radius 1.5
        tracker.update("V1", pt(0.0, 1.2, 2));
        tracker.run_reconciliation_tick();
        assert_eq!(log.lock().unwrap().len(), 1);

        // Outside radius 1.5
        tracker.update("V1", pt(0.0, 1.6, 3));
        tracker.run_reconciliation_tick();
        assert_eq!(
            *log.lock().unwrap(),
            vec![("V1", Transition::Entered), ("V1", Transition::Exited)]
        );
    }

    #[test]
    fn test_stale_update_keeps_newer_position() {
        let tracker: PositionTracker<&str> = PositionTracker::with_defaults();
        tracker.update("V2", pt(1.0, 1.0, 5));
        assert_eq!(tracker.update("V2", pt(2.0, 2.0, 3)), UpdateOutcome::Stale);

        assert_eq!(tracker.position_of(&"V2"), Some(pt(1.0, 1.0, 5)));
        assert_eq!(tracker.stats().updates_stale, 1);
    }

    #[test]
    fn test_duplicate_handler_rejected_until_cancelled() {
        let tracker = PositionTracker::with_defaults();
        let (handler, _) = recorder();

        let first = tracker
            .subscribe(unit_circle(), Arc::clone(&handler))
            .unwrap();
        let second = tracker.subscribe(unit_circle(), Arc::clone(&handler));
        assert!(matches!(
            second,
            Err(TrackerError::DuplicateHandler(id)) if id == first.id()
        ));
        assert_eq!(tracker.number_of_subscriptions(), 1);

        assert!(first.cancel());
        assert!(!first.is_active());
        assert_eq!(tracker.number_of_subscriptions(), 0);

        let again = tracker.subscribe(unit_circle(), handler).unwrap();
        assert!(again.is_active());
        assert_ne!(again.id(), first.id());
    }

    #[test]
    fn test_distinct_handlers_may_share_an_area() {
        let tracker = PositionTracker::with_defaults();
        let (a, _) = recorder();
        let (b, _) = recorder();
        let area = unit_circle();

        tracker.subscribe(Arc::clone(&area), a).unwrap();
        tracker.subscribe(area, b).unwrap();
        assert_eq!(tracker.number_of_subscriptions(), 2);
    }

    #[test]
    fn test_invalid_subscriptions_leave_no_state() {
        let tracker = PositionTracker::with_defaults();
        let (handler, _) = recorder();
        let bbox: Arc<dyn Area> = Arc::new(BoundingBox::new(0.0, 1.0, 0.0, 1.0).unwrap());

        assert!(matches!(
            tracker.subscribe_with_slack(unit_circle(), Arc::clone(&handler), -1.0),
            Err(TrackerError::InvalidSlack(_))
        ));
        assert!(matches!(
            tracker.subscribe_with_slack(bbox, Arc::clone(&handler), 10.0),
            Err(TrackerError::UnsupportedSlack { .. })
        ));
        assert_eq!(tracker.number_of_subscriptions(), 0);

        // The handler was never registered, so it can still subscribe
        assert!(tracker.subscribe(unit_circle(), handler).is_ok());
    }

    #[test]
    fn test_cancelled_subscription_receives_nothing() {
        let tracker = PositionTracker::with_defaults();
        let (handler, log) = recorder();
        let handle = tracker.subscribe(unit_circle(), handler).unwrap();

        assert!(tracker.unsubscribe(handle.id()));
        assert!(!tracker.unsubscribe(handle.id()));
        assert!(!handle.cancel());

        tracker.update("V1", pt(0.0, 0.0, 1));
        let report = tracker.run_reconciliation_tick();

        assert_eq!(report.subscriptions, 0);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(tracker.stats().subscriptions_cancelled, 1);
    }

    #[test]
    fn test_timestamp_refresh_is_not_a_change() {
        let tracker = PositionTracker::with_defaults();
        let (handler, log) = recorder();
        tracker.subscribe(unit_circle(), handler).unwrap();

        tracker.update("V1", pt(0.0, 0.5, 1));
        assert_eq!(tracker.run_reconciliation_tick().changes, 1);

        tracker.update("V1", pt(0.0, 0.5, 2));
        let report = tracker.run_reconciliation_tick();
        assert_eq!(report.changes, 0);
        assert_eq!(report.tick, 2);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_late_subscriber_only_sees_later_changes() {
        let tracker = PositionTracker::with_defaults();
        tracker.update("V1", pt(0.0, 0.5, 1));
        tracker.run_reconciliation_tick();

        let (handler, log) = recorder();
        tracker.subscribe(unit_circle(), handler).unwrap();

        // V1 has not moved, so the new subscription learns nothing yet
        tracker.run_reconciliation_tick();
        assert!(log.lock().unwrap().is_empty());

        tracker.update("V1", pt(0.0, 0.6, 2));
        tracker.run_reconciliation_tick();
        assert_eq!(*log.lock().unwrap(), vec![("V1", Transition::Entered)]);
    }

    #[test]
    fn test_targets_within() {
        let tracker = PositionTracker::with_defaults();
        tracker.update("in", pt(0.0, 0.5, 1));
        tracker.update("edge", pt(1.0, 0.0, 1));
        tracker.update("out", pt(3.0, 3.0, 1));

        let inside = tracker.targets_within(unit_circle().as_ref());

        assert_eq!(inside.len(), 2);
        assert_eq!(inside.get("in"), Some(&pt(0.0, 0.5, 1)));
        assert!(inside.contains_key("edge"));
        assert!(!inside.contains_key("out"));
        assert_eq!(tracker.number_of_tracked_objects(), 3);
    }

    #[test]
    fn test_dedicated_pool() {
        let config = TrackerConfig::new().with_worker_threads(2);
        let tracker = PositionTracker::new(config).unwrap();
        let (handler, log) = recorder();
        tracker.subscribe(unit_circle(), handler).unwrap();

        for (i, id) in ["A", "B", "C"].iter().enumerate() {
            tracker.update(*id, pt(0.0, i as f64 * 0.1, 1));
        }
        let report = tracker.run_reconciliation_tick();

        assert_eq!(report.delivery.entered, 3);
        assert_eq!(log.lock().unwrap().len(), 3);
        assert_eq!(tracker.last_snapshot().len(), 3);
    }

    #[test]
    fn test_default_slack_from_config() {
        let config = TrackerConfig::new().with_default_slack(0.5);
        let tracker: PositionTracker<&'static str> = PositionTracker::new(config).unwrap();
        let (handler, _) = recorder();

        let handle = tracker.subscribe(unit_circle(), handler).unwrap();
        assert_eq!(handle.subscription().slack(), 0.5);
        assert!(tracker.subscription(handle.id()).is_some());
    }

    #[test]
    fn test_default_slack_holds_membership() {
        let tracker = PositionTracker::with_defaults();
        let (handler, log) = recorder();
        let handle = tracker.subscribe(unit_circle(), handler).unwrap();
        assert_eq!(handle.subscription().slack(), DEFAULT_SLACK);

        tracker.update("V1", pt(0.0, 0.0, 1));
        tracker.run_reconciliation_tick();
        // Well outside radius 1 but within the 100 unit exit area
        tracker.update("V1", pt(0.0, 5.0, 2));
        tracker.run_reconciliation_tick();

        assert!(handle.subscription().is_member(&"V1"));
        assert_eq!(*log.lock().unwrap(), vec![("V1", Transition::Entered)]);
    }

    #[test]
    fn test_bounding_box_needs_zero_default_slack() {
        let bbox: Arc<dyn Area> = Arc::new(BoundingBox::new(0.0, 1.0, 0.0, 1.0).unwrap());

        let tracker = PositionTracker::with_defaults();
        let (handler, _) = recorder();
        assert!(matches!(
            tracker.subscribe(Arc::clone(&bbox), handler),
            Err(TrackerError::UnsupportedSlack { .. })
        ));
        assert_eq!(tracker.number_of_subscriptions(), 0);

        let config = TrackerConfig::new().with_default_slack(0.0);
        let tracker = PositionTracker::new(config).unwrap();
        let (handler, _) = recorder();
        let handle = tracker.subscribe(bbox, handler).unwrap();
        assert_eq!(handle.subscription().slack(), 0.0);
    }

    #[test]
    fn test_stats_after_ticks() {
        let tracker = PositionTracker::with_defaults();
        let (handler, _) = recorder();
        tracker
            .subscribe_with_slack(unit_circle(), handler, 0.0)
            .unwrap();

        tracker.update("V1", pt(0.0, 0.0, 1));
        tracker.run_reconciliation_tick();
        tracker.update("V1", pt(0.0, 5.0, 2));
        tracker.run_reconciliation_tick();

        let stats = tracker.stats();
        assert_eq!(stats.ticks_completed, 2);
        assert_eq!(stats.events_entered, 1);
        assert_eq!(stats.events_exited, 1);
        assert_eq!(stats.targets_created, 1);
        assert_eq!(stats.updates_accepted, 1);
        assert_eq!(stats.active_subscriptions, 1);
    }
}
