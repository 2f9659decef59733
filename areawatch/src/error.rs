//! Tracker error types.

use thiserror::Error;

use crate::subscription::SubscriptionId;

/// Errors returned by [`crate::tracker::PositionTracker`] operations.
///
/// All of these are raised synchronously by the call that introduced the
/// bad argument; nothing is registered when one is returned.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Slack was negative, NaN or infinite.
    #[error("Slack must be a non-negative finite distance, was {0}")]
    InvalidSlack(f64),

    /// Slack requested for a shape that cannot be expanded.
    #[error("Slack is only supported for shapes that can expand; {kind} areas cannot")]
    UnsupportedSlack { kind: &'static str },

    /// The handler already backs an active subscription.
    #[error("The handler has already been registered as subscription {0}")]
    DuplicateHandler(SubscriptionId),

    /// The dedicated worker pool could not be built.
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
