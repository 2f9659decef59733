//! Runtime configuration for the position tracker.

use std::time::Duration;

/// Default reconciliation interval used by the bundled scheduler.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(2);

/// Default boundary slack for [`crate::tracker::PositionTracker::subscribe`].
///
/// 100 metres of exit hysteresis. Shapes that cannot be expanded, such as
/// [`crate::geometry::BoundingBox`], need a default of zero or an explicit
/// zero slack.
pub const DEFAULT_SLACK: f64 = 100.0;

/// Configuration for a [`crate::tracker::PositionTracker`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Slack applied when a subscription is created without one.
    ///
    /// Units follow the watched shape (metres for geodesic circles).
    pub default_slack: f64,

    /// Size of a dedicated worker pool for scans and fan-out.
    ///
    /// `None` shares rayon's global pool.
    pub worker_threads: Option<usize>,

    /// Interval between reconciliation ticks when driven by
    /// [`crate::scheduler::spawn_reconciliation`].
    pub tick_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_slack: DEFAULT_SLACK,
            worker_threads: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl TrackerConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default slack.
    pub fn with_default_slack(mut self, slack: f64) -> Self {
        self.default_slack = slack;
        self
    }

    /// Use a dedicated worker pool with this many threads.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Set the reconciliation tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}
