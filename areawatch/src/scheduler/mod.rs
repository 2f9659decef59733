//! Periodic reconciliation driven by a tokio interval.
//!
//! The tracker never schedules itself. This module is one ready-made
//! caller: a task that runs [`PositionTracker::run_reconciliation_tick`]
//! every `interval` until its [`CancellationToken`] fires.
//!
//! Ticks run on tokio's blocking pool so handler work never stalls the
//! async runtime. If a tick overruns the interval, missed ticks are skipped
//! rather than run back to back.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::TargetId;
use crate::tracker::PositionTracker;

/// Spawn the reconciliation loop on the current tokio runtime.
///
/// The first tick runs immediately. The returned handle resolves to the
/// number of ticks completed once `cancellation` is triggered.
///
/// # Panics
///
/// Panics if called outside a tokio runtime, like [`tokio::spawn`].
pub fn spawn_reconciliation<T: TargetId>(
    tracker: Arc<PositionTracker<T>>,
    interval: Duration,
    cancellation: CancellationToken,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut completed = 0u64;

        info!(interval_ms = interval.as_millis() as u64, "Reconciliation loop started");

        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    debug!("Reconciliation loop cancelled");
                    break;
                }

                _ = ticker.tick() => {
                    let tracker = Arc::clone(&tracker);
                    match tokio::task::spawn_blocking(move || tracker.run_reconciliation_tick()).await {
                        Ok(_) => completed += 1,
                        Err(e) => warn!(error = %e, "Reconciliation tick task failed"),
                    }
                }
            }
        }

        info!(ticks = completed, "Reconciliation loop stopped");
        completed
    })
}
