//! The tracker driver.
//!
//! [`PositionTracker`] ties together the [`PositionStore`](crate::store::PositionStore),
//! the set of active subscriptions, and the reconciliation tick that turns
//! position changes into entered/exited notifications.
//!
//! ```text
//! producers ──update()──► PositionStore
//!                              │
//!                  run_reconciliation_tick()
//!                              │ snapshot + diff
//!                              ▼
//!                  changes ──par_iter──► Subscription::update_with ──► handler
//! ```

mod position_tracker;
mod registry;

pub use position_tracker::{PositionTracker, TickReport};
pub use registry::SubscriptionHandle;
