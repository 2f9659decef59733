//! Active subscriptions and their cancellation handles.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::error::TrackerError;
use crate::store::TargetId;
use crate::subscription::{Subscription, SubscriptionId};
use crate::telemetry::TrackerMetrics;

/// The set of active subscriptions.
///
/// Indexed twice: by id for cancellation and fan-out, and by handler
/// identity so that one handler backs at most one live subscription.
pub(crate) struct SubscriptionRegistry<T: TargetId> {
    by_id: DashMap<SubscriptionId, Arc<Subscription<T>>>,
    by_handler: DashMap<usize, SubscriptionId>,
    next_id: AtomicU64,
    metrics: Arc<TrackerMetrics>,
}

impl<T: TargetId> SubscriptionRegistry<T> {
    pub(crate) fn new(metrics: Arc<TrackerMetrics>) -> Self {
        Self {
            by_id: DashMap::new(),
            by_handler: DashMap::new(),
            next_id: AtomicU64::new(1),
            metrics,
        }
    }

    pub(crate) fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a fully built subscription.
    ///
    /// The handler slot is claimed first, so two racing registrations of
    /// the same handler cannot both succeed.
    pub(crate) fn register(
        &self,
        subscription: Subscription<T>,
    ) -> Result<Arc<Subscription<T>>, TrackerError> {
        match self.by_handler.entry(subscription.handler_key()) {
            Entry::Occupied(existing) => Err(TrackerError::DuplicateHandler(*existing.get())),
            Entry::Vacant(slot) => {
                let id = subscription.id();
                let subscription = Arc::new(subscription);
                self.by_id.insert(id, Arc::clone(&subscription));
                slot.insert(id);
                self.metrics.subscription_created();
                debug!(subscription = %id, slack = subscription.slack(), "Subscription registered");
                Ok(subscription)
            }
        }
    }

    /// Remove a subscription. Returns `false` if it was not active.
    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        match self.by_id.remove(&id) {
            Some((_, subscription)) => {
                self.by_handler
                    .remove_if(&subscription.handler_key(), |_, owner| *owner == id);
                self.metrics.subscription_cancelled();
                debug!(subscription = %id, "Subscription cancelled");
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, id: SubscriptionId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub(crate) fn get(&self, id: SubscriptionId) -> Option<Arc<Subscription<T>>> {
        self.by_id.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Copy of the active set, taken at the start of a fan-out.
    pub(crate) fn active(&self) -> Vec<Arc<Subscription<T>>> {
        self.by_id
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }
}

/// Returned by a successful subscribe; used to inspect or cancel it.
///
/// Dropping the handle does **not** cancel the subscription.
pub struct SubscriptionHandle<T: TargetId> {
    subscription: Arc<Subscription<T>>,
    registry: Weak<SubscriptionRegistry<T>>,
}

impl<T: TargetId> SubscriptionHandle<T> {
    pub(crate) fn new(
        subscription: Arc<Subscription<T>>,
        registry: Weak<SubscriptionRegistry<T>>,
    ) -> Self {
        Self {
            subscription,
            registry,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.subscription.id()
    }

    /// The underlying subscription (areas, slack, current members).
    pub fn subscription(&self) -> &Arc<Subscription<T>> {
        &self.subscription
    }

    /// Cancel the subscription.
    ///
    /// Later ticks skip it. A tick already fanning out may still deliver
    /// to it once. Returns `false` if it was already cancelled or the
    /// tracker is gone.
    pub fn cancel(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.id()),
            None => false,
        }
    }

    /// True while the subscription is registered with a live tracker.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id()))
    }
}

impl<T: TargetId> Clone for SubscriptionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            subscription: Arc::clone(&self.subscription),
            registry: Weak::clone(&self.registry),
        }
    }
}

impl<T: TargetId> fmt::Debug for SubscriptionHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id())
            .finish()
    }
}
