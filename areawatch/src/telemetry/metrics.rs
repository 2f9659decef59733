//! Lock-free atomic metrics collection.

use super::TrackerStats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free counters for the tracker.
///
/// All operations use `Relaxed` ordering; the counters are independent
/// measurements and are only ever read together through a snapshot.
pub struct TrackerMetrics {
    /// When metrics collection started
    start_time: Instant,

    // === Update metrics ===
    /// Reports for targets seen for the first time
    targets_created: AtomicU64,
    /// Reports that replaced an existing record
    updates_accepted: AtomicU64,
    /// Reports discarded for being older than the stored one
    updates_stale: AtomicU64,

    // === Tick metrics ===
    /// Reconciliation ticks completed
    ticks_completed: AtomicU64,
    /// Targets that appeared in a delta, summed over all ticks
    changes_detected: AtomicU64,
    /// Duration of the most recent tick in microseconds
    last_tick_us: AtomicU64,
    /// Total tick time in microseconds
    tick_time_us: AtomicU64,

    // === Delivery metrics ===
    events_entered: AtomicU64,
    events_exited: AtomicU64,
    /// Handler invocations that panicked
    handler_failures: AtomicU64,

    // === Subscription metrics ===
    subscriptions_created: AtomicU64,
    subscriptions_cancelled: AtomicU64,
}

impl TrackerMetrics {
    /// Creates a new metrics instance.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            targets_created: AtomicU64::new(0),
            updates_accepted: AtomicU64::new(0),
            updates_stale: AtomicU64::new(0),
            ticks_completed: AtomicU64::new(0),
            changes_detected: AtomicU64::new(0),
            last_tick_us: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            events_entered: AtomicU64::new(0),
            events_exited: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
            subscriptions_created: AtomicU64::new(0),
            subscriptions_cancelled: AtomicU64::new(0),
        }
    }

    // === Update tracking ===

    /// Record the first report for a new target.
    pub fn target_created(&self) {
        self.targets_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a report replacing an existing record.
    pub fn update_accepted(&self) {
        self.updates_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a report discarded as stale.
    pub fn update_stale(&self) {
        self.updates_stale.fetch_add(1, Ordering::Relaxed);
    }

    // === Tick tracking ===

    /// Record a completed reconciliation tick.
    pub fn tick_completed(&self, changes: usize, elapsed: Duration) {
        let elapsed_us = elapsed.as_micros() as u64;
        self.ticks_completed.fetch_add(1, Ordering::Relaxed);
        self.changes_detected
            .fetch_add(changes as u64, Ordering::Relaxed);
        self.last_tick_us.store(elapsed_us, Ordering::Relaxed);
        self.tick_time_us.fetch_add(elapsed_us, Ordering::Relaxed);
    }

    /// Record delivered transitions from one tick.
    pub fn events_delivered(&self, entered: usize, exited: usize, failed: usize) {
        self.events_entered
            .fetch_add(entered as u64, Ordering::Relaxed);
        self.events_exited.fetch_add(exited as u64, Ordering::Relaxed);
        self.handler_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    // === Subscription tracking ===

    pub fn subscription_created(&self) {
        self.subscriptions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscription_cancelled(&self) {
        self.subscriptions_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters.
    ///
    /// `tracked_objects` and `active_subscriptions` are gauges owned by the
    /// tracker and passed in by the caller.
    pub fn snapshot(&self, tracked_objects: usize, active_subscriptions: usize) -> TrackerStats {
        let ticks_completed = self.ticks_completed.load(Ordering::Relaxed);
        let tick_time_us = self.tick_time_us.load(Ordering::Relaxed);
        let average_tick = if ticks_completed > 0 {
            Duration::from_micros(tick_time_us / ticks_completed)
        } else {
            Duration::ZERO
        };

        TrackerStats {
            uptime: self.start_time.elapsed(),
            tracked_objects,
            active_subscriptions,
            targets_created: self.targets_created.load(Ordering::Relaxed),
            updates_accepted: self.updates_accepted.load(Ordering::Relaxed),
            updates_stale: self.updates_stale.load(Ordering::Relaxed),
            ticks_completed,
            changes_detected: self.changes_detected.load(Ordering::Relaxed),
            last_tick: Duration::from_micros(self.last_tick_us.load(Ordering::Relaxed)),
            average_tick,
            events_entered: self.events_entered.load(Ordering::Relaxed),
            events_exited: self.events_exited.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            subscriptions_created: self.subscriptions_created.load(Ordering::Relaxed),
            subscriptions_cancelled: self.subscriptions_cancelled.load(Ordering::Relaxed),
        }
    }
}

impl Default for TrackerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let stats = TrackerMetrics::new().snapshot(0, 0);
        assert_eq!(stats.updates_accepted, 0);
        assert_eq!(stats.ticks_completed, 0);
        assert_eq!(stats.average_tick, Duration::ZERO);
    }

    #[test]
    fn test_update_counters() {
        let metrics = TrackerMetrics::new();
        metrics.target_created();
        metrics.update_accepted();
        metrics.update_accepted();
        metrics.update_stale();

        let stats = metrics.snapshot(1, 0);
        assert_eq!(stats.targets_created, 1);
        assert_eq!(stats.updates_accepted, 2);
        assert_eq!(stats.updates_stale, 1);
        assert_eq!(stats.tracked_objects, 1);
    }

    #[test]
    fn test_tick_timing() {
        let metrics = TrackerMetrics::new();
        metrics.tick_completed(5, Duration::from_micros(100));
        metrics.tick_completed(3, Duration::from_micros(300));

        let stats = metrics.snapshot(0, 0);
        assert_eq!(stats.ticks_completed, 2);
        assert_eq!(stats.changes_detected, 8);
        assert_eq!(stats.last_tick, Duration::from_micros(300));
        assert_eq!(stats.average_tick, Duration::from_micros(200));
    }

    #[test]
    fn test_delivery_and_subscription_counters() {
        let metrics = TrackerMetrics::new();
        metrics.events_delivered(3, 1, 1);
        metrics.subscription_created();
        metrics.subscription_created();
        metrics.subscription_cancelled();

        let stats = metrics.snapshot(0, 1);
        assert_eq!(stats.events_entered, 3);
        assert_eq!(stats.events_exited, 1);
        assert_eq!(stats.handler_failures, 1);
        assert_eq!(stats.subscriptions_created, 2);
        assert_eq!(stats.subscriptions_cancelled, 1);
        assert_eq!(stats.active_subscriptions, 1);
    }
}
