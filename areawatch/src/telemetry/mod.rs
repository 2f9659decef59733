//! Tracker telemetry for monitoring and management tooling.
//!
//! Uses lock-free atomic counters so producers and ticks can record
//! without contention.
//!
//! # Architecture
//!
//! ```text
//! update() / tick ─────► TrackerMetrics ─────► TrackerStats ─────► Views
//!                        (atomic counters)     (point-in-time copy)   (CLI, etc.)
//! ```

mod metrics;
mod snapshot;

pub use metrics::TrackerMetrics;
pub use snapshot::TrackerStats;
