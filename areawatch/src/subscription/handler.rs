//! Handler callbacks and the events they receive.

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

use crate::geometry::PositionTime;
use crate::store::TargetId;

/// A boundary crossing for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// The target crossed into the entry area.
    Entered,
    /// The target left the exit area.
    Exited,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Entered => write!(f, "entered"),
            Transition::Exited => write!(f, "exited"),
        }
    }
}

/// Receives enter/exit notifications for one subscription.
///
/// Only boundary crossings are delivered; a target that stays inside
/// produces no calls. Calls for different targets may arrive concurrently
/// from several worker threads, in any order.
///
/// Implemented for any `Fn(&T, &PositionTime, Transition) + Send + Sync`.
pub trait PositionUpdateHandler<T>: Send + Sync {
    fn on_transition(&self, target: &T, position: &PositionTime, transition: Transition);
}

impl<T, F> PositionUpdateHandler<T> for F
where
    F: Fn(&T, &PositionTime, Transition) + Send + Sync,
{
    fn on_transition(&self, target: &T, position: &PositionTime, transition: Transition) {
        self(target, position, transition)
    }
}

/// An owned enter/exit notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaEvent<T> {
    pub target: T,
    pub position: PositionTime,
    pub transition: Transition,
}

/// Handler that forwards every transition into a tokio channel.
///
/// Lets async consumers `recv().await` events instead of running code on
/// the tracker's worker threads. A closed receiver is not an error; events
/// are dropped.
pub struct ChannelHandler<T> {
    tx: mpsc::UnboundedSender<AreaEvent<T>>,
}

impl<T: TargetId> ChannelHandler<T> {
    /// Create a handler and the receiving half of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AreaEvent<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl<T: TargetId> PositionUpdateHandler<T> for ChannelHandler<T> {
    fn on_transition(&self, target: &T, position: &PositionTime, transition: Transition) {
        let event = AreaEvent {
            target: target.clone(),
            position: *position,
            transition,
        };
        if self.tx.send(event).is_err() {
            trace!(?target, "Area event receiver closed, dropping event");
        }
    }
}
