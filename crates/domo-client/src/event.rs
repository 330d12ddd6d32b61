//! Feed subscriptions
//!
//! Subscriptions are explicit objects returning cancellation handles. The
//! teardown sequence of a connection cancels every handle before the client
//! stops, so no handler ever observes a stopped client.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use domo_core::{Resource, ResourceEventType, ResourceId};

/// Handler invoked for each delivered resource event.
pub type EventHandler = Arc<dyn Fn(ResourceEventType, &Arc<Resource>) + Send + Sync>;

/// A registered subscriber with its filters.
pub(crate) struct Subscriber {
    pub handler: EventHandler,
    pub id_filter: Option<ResourceId>,
    pub event_filter: Option<Vec<ResourceEventType>>,
}

impl Subscriber {
    pub fn matches(&self, event: ResourceEventType, id: &ResourceId) -> bool {
        if let Some(ref filter) = self.id_filter {
            if filter != id {
                return false;
            }
        }
        if let Some(ref events) = self.event_filter {
            if !events.contains(&event) {
                return false;
            }
        }
        true
    }
}

/// Cancellation handle for a feed subscription.
///
/// The subscription is removed when `cancel` is called or when the handle
/// is dropped, whichever comes first.
pub struct Subscription {
    id: u64,
    subscribers: Weak<DashMap<u64, Subscriber>>,
}

impl Subscription {
    pub(crate) fn new(id: u64, subscribers: &Arc<DashMap<u64, Subscriber>>) -> Self {
        Self {
            id,
            subscribers: Arc::downgrade(subscribers),
        }
    }

    /// Cancel the subscription, removing its handler from the feed.
    pub fn cancel(self) {
        self.remove();
    }

    fn remove(&self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
