//! AreaWatch - concurrent geofence tracking
//!
//! Keeps the latest known position of many moving targets and tells
//! subscribers when a target enters or leaves their area of interest.
//!
//! - Producers call [`PositionTracker::update`] from any thread; older
//!   reports never overwrite newer ones.
//! - A reconciliation tick diffs the store against the previous tick and
//!   fans the changes out to every subscription in parallel.
//! - Each subscription keeps its own member set and applies an exit slack,
//!   so a target hovering on the boundary does not flap in and out.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use areawatch::geometry::{Circle, Position, PositionTime};
//! use areawatch::subscription::ChannelHandler;
//! use areawatch::PositionTracker;
//!
//! let tracker: PositionTracker<&str> = PositionTracker::with_defaults();
//!
//! // 5 km around Copenhagen, reported as left only 500 m past the edge
//! let harbour = Circle::geodesic(Position::new(55.6761, 12.5683).unwrap(), 5_000.0).unwrap();
//! let (handler, mut events) = ChannelHandler::new();
//! tracker
//!     .subscribe_with_slack(Arc::new(harbour), Arc::new(handler), 500.0)
//!     .unwrap();
//!
//! tracker.update("ferry-1", PositionTime::from_coords(55.68, 12.57, 1_000).unwrap());
//! tracker.run_reconciliation_tick();
//!
//! let event = events.try_recv().unwrap();
//! assert_eq!(event.target, "ferry-1");
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod scheduler;
pub mod store;
pub mod subscription;
pub mod telemetry;
pub mod tracker;

pub use error::TrackerError;
pub use geometry::{Area, BoundingBox, Circle, Position, PositionTime};
pub use store::{TargetId, UpdateOutcome};
pub use subscription::{PositionUpdateHandler, SubscriptionId, Transition};
pub use tracker::{PositionTracker, SubscriptionHandle, TickReport};
