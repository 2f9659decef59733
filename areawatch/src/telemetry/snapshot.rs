//! Point-in-time tracker statistics.

use std::fmt;
use std::time::Duration;

/// An immutable copy of the tracker's counters, safe to display without
/// touching the tracker.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerStats {
    /// Time since the tracker was created
    pub uptime: Duration,

    // === Gauges ===
    pub tracked_objects: usize,
    pub active_subscriptions: usize,

    // === Updates ===
    pub targets_created: u64,
    pub updates_accepted: u64,
    pub updates_stale: u64,

    // === Ticks ===
    pub ticks_completed: u64,
    pub changes_detected: u64,
    pub last_tick: Duration,
    pub average_tick: Duration,

    // === Delivery ===
    pub events_entered: u64,
    pub events_exited: u64,
    pub handler_failures: u64,

    // === Subscriptions ===
    pub subscriptions_created: u64,
    pub subscriptions_cancelled: u64,
}

impl TrackerStats {
    /// Every report received, including discarded stale ones.
    pub fn total_updates(&self) -> u64 {
        self.targets_created + self.updates_accepted + self.updates_stale
    }

    /// Fraction of reports discarded as stale (0.0 - 1.0).
    pub fn stale_rate(&self) -> f64 {
        let total = self.total_updates();
        if total == 0 {
            0.0
        } else {
            self.updates_stale as f64 / total as f64
        }
    }

    /// Returns uptime in human-readable format.
    pub fn uptime_human(&self) -> String {
        format_duration(self.uptime)
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}.{:01}s", secs, duration.subsec_millis() / 100)
    }
}

impl fmt::Display for TrackerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tracker Statistics (uptime: {})", self.uptime_human())?;
        writeln!(f, "─────────────────────────────────────────")?;
        writeln!(f)?;

        writeln!(f, "Targets:")?;
        writeln!(f, "  Tracked: {}", self.tracked_objects)?;
        writeln!(
            f,
            "  Reports: {} ({} stale, {:.1}%)",
            self.total_updates(),
            self.updates_stale,
            self.stale_rate() * 100.0
        )?;
        writeln!(f)?;

        writeln!(f, "Reconciliation:")?;
        writeln!(f, "  Ticks: {}", self.ticks_completed)?;
        writeln!(f, "  Changes: {}", self.changes_detected)?;
        writeln!(
            f,
            "  Tick time: last {:?}, avg {:?}",
            self.last_tick, self.average_tick
        )?;
        writeln!(f)?;

        writeln!(f, "Subscriptions:")?;
        writeln!(f, "  Active: {}", self.active_subscriptions)?;
        writeln!(
            f,
            "  Events: {} entered, {} exited",
            self.events_entered, self.events_exited
        )?;
        write!(f, "  Handler failures: {}", self.handler_failures)
    }
}
