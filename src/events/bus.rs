// src/events/bus.rs

use std::sync::{Arc, Mutex};

type Subscriber<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Identifies one subscription on an [`EventBus`], for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct BusInner<E> {
    next_id: u64,
    subscribers: Vec<(SubscriberId, Subscriber<E>)>,
}

/// Mutation-safe publish/subscribe bus.
///
/// `publish` delivers the event to every subscriber present at the moment of
/// the call, iterating over a snapshot of the subscriber list. A subscriber
/// may therefore subscribe or unsubscribe (itself or others) from inside a
/// callback without skipping or double-invoking anyone in the in-progress
/// delivery; subscribers added during delivery only see later publishes.
///
/// Cloning the bus yields another handle to the same subscriber set.
pub struct EventBus<E> {
    inner: Arc<Mutex<BusInner<E>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Add a subscriber and return its id.
    pub fn subscribe(&self, subscriber: impl Fn(&E) + Send + Sync + 'static) -> SubscriberId {
        let mut inner = self.inner.lock().unwrap();
        let id = SubscriberId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push((id, Arc::new(subscriber)));
        id
    }

    /// Remove a subscriber. Removing an id that is no longer present is a
    /// no-op.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.inner.lock().unwrap();
        inner.subscribers.retain(|(sid, _)| *sid != id);
    }

    /// Deliver `event` to every subscriber registered at this moment.
    pub fn publish(&self, event: &E) {
        // Snapshot before delivery: a subscriber may mutate the subscriber
        // set in response to the event, and the lock must not be held while
        // callbacks run.
        let snapshot: Vec<Subscriber<E>> = {
            let inner = self.inner.lock().unwrap();
            inner
                .subscribers
                .iter()
                .map(|(_, s)| Arc::clone(s))
                .collect()
        };

        for subscriber in snapshot {
            subscriber(event);
        }
    }

    /// Number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().subscribers.len()
    }
}
