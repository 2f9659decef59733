//! Per-area subscriptions with enter/exit hysteresis.
//!
//! A subscription holds two areas:
//!
//! - **entry area** - a non-member must be inside it to become a member
//! - **exit area** - the entry area grown by `slack`; a member must leave
//!   it to stop being a member
//!
//! With a single boundary, a target drifting along the edge would flip
//! between entered and exited on every tick. Widening only the exit test
//! means a member has to travel `slack` past the boundary before it is
//! reported as gone.
//!
//! ```text
//!              non-member ──(in entry area)──► member   => Entered
//!              member ──(outside exit area)──► non-member => Exited
//! ```
//!
//! Membership is private to the subscription. Transitions for different
//! targets are evaluated in parallel and never depend on each other.

mod handler;

use std::collections::HashMap;
use std::fmt;
use std::ops::Add;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashSet;
use rayon::prelude::*;
use tracing::{trace, warn};

use crate::error::TrackerError;
use crate::geometry::{Area, PositionTime};
use crate::store::TargetId;

pub use handler::{AreaEvent, ChannelHandler, PositionUpdateHandler, Transition};

/// Opaque token identifying a registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Handler identity: the address of the shared handler allocation.
pub(crate) fn handler_key<T>(handler: &Arc<dyn PositionUpdateHandler<T>>) -> usize {
    Arc::as_ptr(handler) as *const () as usize
}

/// Counts from delivering one update set to one subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Entered events delivered.
    pub entered: usize,
    /// Exited events delivered.
    pub exited: usize,
    /// Handler invocations that panicked.
    pub failed: usize,
}

impl DeliveryReport {
    fn single(transition: Transition) -> Self {
        match transition {
            Transition::Entered => Self {
                entered: 1,
                ..Self::default()
            },
            Transition::Exited => Self {
                exited: 1,
                ..Self::default()
            },
        }
    }

    /// Total transitions (including failed deliveries).
    pub fn transitions(&self) -> usize {
        self.entered + self.exited
    }
}

impl Add for DeliveryReport {
    type Output = DeliveryReport;

    fn add(self, other: DeliveryReport) -> DeliveryReport {
        DeliveryReport {
            entered: self.entered + other.entered,
            exited: self.exited + other.exited,
            failed: self.failed + other.failed,
        }
    }
}

/// One area of interest, its handler, and who is currently inside.
pub struct Subscription<T: TargetId> {
    id: SubscriptionId,
    entry_area: Arc<dyn Area>,
    exit_area: Arc<dyn Area>,
    slack: f64,
    handler: Arc<dyn PositionUpdateHandler<T>>,
    members: DashSet<T>,
}

impl<T: TargetId> Subscription<T> {
    /// Build a subscription, deriving the exit area from `slack`.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::InvalidSlack`] if `slack` is negative or not finite
    /// - [`TrackerError::UnsupportedSlack`] if `slack > 0` and the area
    ///   cannot be expanded
    pub(crate) fn new(
        id: SubscriptionId,
        area: Arc<dyn Area>,
        handler: Arc<dyn PositionUpdateHandler<T>>,
        slack: f64,
    ) -> Result<Self, TrackerError> {
        if !slack.is_finite() || slack < 0.0 {
            return Err(TrackerError::InvalidSlack(slack));
        }
        let exit_area = if slack > 0.0 {
            area.expanded_by(slack)
                .ok_or(TrackerError::UnsupportedSlack { kind: area.kind() })?
        } else {
            Arc::clone(&area)
        };

        Ok(Self {
            id,
            entry_area: area,
            exit_area,
            slack,
            handler,
            members: DashSet::new(),
        })
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn slack(&self) -> f64 {
        self.slack
    }

    /// The area a target must be inside to be reported as entered.
    pub fn entry_area(&self) -> &Arc<dyn Area> {
        &self.entry_area
    }

    /// The area a member must leave to be reported as exited.
    pub fn exit_area(&self) -> &Arc<dyn Area> {
        &self.exit_area
    }

    pub(crate) fn handler_key(&self) -> usize {
        handler_key(&self.handler)
    }

    /// True if the target is currently considered inside.
    pub fn is_member(&self, target: &T) -> bool {
        self.members.contains(target)
    }

    /// Copy of the current membership set.
    pub fn members(&self) -> Vec<T> {
        self.members.iter().map(|member| member.key().clone()).collect()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Apply an update set and notify the handler of every boundary crossing.
    ///
    /// Targets are evaluated in parallel. Delivery is synchronous: this
    /// returns once the handler has been called for every transition.
    pub fn update_with(&self, updates: &HashMap<T, PositionTime>) -> DeliveryReport {
        updates
            .par_iter()
            .map(|(target, position)| self.evaluate(target, position))
            .reduce(DeliveryReport::default, |a, b| a + b)
    }

    fn evaluate(&self, target: &T, position: &PositionTime) -> DeliveryReport {
        let transition = if self.members.contains(target) {
            if self.exit_area.contains(position.position()) {
                return DeliveryReport::default();
            }
            self.members.remove(target);
            Transition::Exited
        } else {
            if !self.entry_area.contains(position.position()) {
                return DeliveryReport::default();
            }
            self.members.insert(target.clone());
            Transition::Entered
        };
        self.deliver(target, position, transition)
    }

    /// Invoke the handler, isolating a panic to this one event.
    ///
    /// The membership change stands even when the handler fails.
    fn deliver(
        &self,
        target: &T,
        position: &PositionTime,
        transition: Transition,
    ) -> DeliveryReport {
        trace!(
            subscription = %self.id,
            ?target,
            position = %position,
            %transition,
            "Area transition"
        );

        let mut report = DeliveryReport::single(transition);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.handler.on_transition(target, position, transition)
        }));
        if outcome.is_err() {
            warn!(
                subscription = %self.id,
                ?target,
                %transition,
                "Position update handler panicked; continuing delivery"
            );
            report.failed += 1;
        }
        report
    }
}

impl<T: TargetId> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("entry_area", &self.entry_area)
            .field("slack", &self.slack)
            .field("members", &self.members.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, Circle, CoordinateSystem, Position};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<(&'static str, Transition)>>>;

    fn recording_handler() -> (Arc<dyn PositionUpdateHandler<&'static str>>, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
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

    fn updates(entries: &[(&'static str, f64, f64, i64)]) -> HashMap<&'static str, PositionTime> {
        entries
            .iter()
            .map(|&(t, lat, lon, time)| (t, PositionTime::from_coords(lat, lon, time).unwrap()))
            .collect()
    }

    fn subscription(slack: f64) -> (Subscription<&'static str>, Log) {
        let (handler, log) = recording_handler();
        let sub = Subscription::new(SubscriptionId::new(1), unit_circle(), handler, slack).unwrap();
        (sub, log)
    }

    #[test]
    fn test_enter_then_exit_without_slack() {
        let (sub, log) = subscription(0.0);

        let report = sub.update_with(&updates(&[("V1", 0.0, 0.5, 1)]));
        assert_eq!(report.entered, 1);
        assert!(sub.is_member(&"V1"));

        let report = sub.update_with(&updates(&[("V1", 0.0, 1.2, 2)]));
        assert_eq!(report.exited, 1);
        assert!(!sub.is_member(&"V1"));

        assert_eq!(
            *log.lock().unwrap(),
            vec![("V1", Transition::Entered), ("V1", Transition::Exited)]
        );
    }

    #[test]
    fn test_remaining_inside_emits_nothing() {
        let (sub, log) = subscription(0.0);
        sub.update_with(&updates(&[("V1", 0.0, 0.1, 1)]));
        let report = sub.update_with(&updates(&[("V1", 0.0, 0.2, 2)]));

        assert_eq!(report, DeliveryReport::default());
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_outside_non_member_emits_nothing() {
        let (sub, log) = subscription(0.0);
        let report = sub.update_with(&updates(&[("V1", 5.0, 5.0, 1)]));

        assert_eq!(report.transitions(), 0);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(sub.member_count(), 0);
    }

    #[test]
    fn test_slack_suppresses_boundary_flicker() {
        let (sub, log) = subscription(0.5);

        sub.update_with(&updates(&[("V1", 0.0, 0.9, 1)]));
        // Oscillate between the entry boundary and the exit boundary
        for (i, lon) in [1.2, 0.95, 1.4, 0.99, 1.1].iter().enumerate() {
            sub.update_with(&updates(&[("V1", 0.0, *lon, i as i64 + 2)]));
        }
        assert_eq!(*log.lock().unwrap(), vec![("V1", Transition::Entered)]);

        sub.update_with(&updates(&[("V1", 0.0, 1.6, 10)]));
        assert_eq!(
            *log.lock().unwrap(),
            vec![("V1", Transition::Entered), ("V1", Transition::Exited)]
        );
    }

    #[test]
    fn test_entry_requires_inner_boundary() {
        let (sub, log) = subscription(0.5);
        // Inside the exit area but outside the entry area: not an entry
        sub.update_with(&updates(&[("V1", 0.0, 1.3, 1)]));
        assert!(log.lock().unwrap().is_empty());
        assert!(!sub.is_member(&"V1"));
    }

    #[test]
    fn test_targets_are_independent() {
        let (sub, _log) = subscription(0.0);
        let report = sub.update_with(&updates(&[
            ("A", 0.0, 0.1, 1),
            ("B", 0.0, 3.0, 1),
            ("C", 0.5, 0.5, 1),
        ]));

        assert_eq!(report.entered, 2);
        let mut members = sub.members();
        members.sort();
        assert_eq!(members, vec!["A", "C"]);
    }

    #[test]
    fn test_negative_slack_rejected() {
        let (handler, _) = recording_handler();
        let result = Subscription::new(SubscriptionId::new(1), unit_circle(), handler, -0.1);
        assert!(matches!(result, Err(TrackerError::InvalidSlack(_))));
    }

    #[test]
    fn test_slack_on_bounding_box_unsupported() {
        let (handler, _) = recording_handler();
        let bbox: Arc<dyn Area> = Arc::new(BoundingBox::new(0.0, 1.0, 0.0, 1.0).unwrap());

        let result = Subscription::new(SubscriptionId::new(1), Arc::clone(&bbox), handler.clone(), 1.0);
        assert!(matches!(
            result,
            Err(TrackerError::UnsupportedSlack {
                kind: "bounding box"
            })
        ));

        // Zero slack is fine for any shape
        assert!(Subscription::new(SubscriptionId::new(2), bbox, handler, 0.0).is_ok());
    }

    #[test]
    fn test_exit_area_is_expanded_entry_area() {
        let (sub, _) = subscription(0.5);
        let boundary = Position::new(0.0, 1.4).unwrap();
        assert!(!sub.entry_area().contains(&boundary));
        assert!(sub.exit_area().contains(&boundary));
        assert_eq!(sub.slack(), 0.5);
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let handler = |target: &&'static str, _: &PositionTime, _: Transition| {
            if *target == "bad" {
                panic!("handler failure");
            }
        };
        let sub = Subscription::new(
            SubscriptionId::new(1),
            unit_circle(),
            Arc::new(handler) as Arc<dyn PositionUpdateHandler<&'static str>>,
            0.0,
        )
        .unwrap();

        let report = sub.update_with(&updates(&[("bad", 0.0, 0.1, 1), ("good", 0.0, 0.2, 1)]));

        assert_eq!(report.entered, 2);
        assert_eq!(report.failed, 1);
        assert!(sub.is_member(&"bad"), "transition stands despite the panic");
        assert!(sub.is_member(&"good"));
    }

    #[test]
    fn test_subscription_id_display() {
        assert_eq!(SubscriptionId::new(42).to_string(), "sub-42");
    }

    #[test]
    fn test_delivery_report_add() {
        let a = DeliveryReport {
            entered: 1,
            exited: 2,
            failed: 0,
        };
        let b = DeliveryReport {
            entered: 3,
            exited: 0,
            failed: 1,
        };
        assert_eq!(
            a + b,
            DeliveryReport {
                entered: 4,
                exited: 2,
                failed: 1
            }
        );
        assert_eq!((a + b).transitions(), 6);
    }
}
