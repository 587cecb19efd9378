//! Synchronous multicast signal.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::ecs::event::Event;

/// Key identifying one subscription on a [`Signal`]. Unsubscribing is
/// guaranteed-once: a key detaches exactly the closure it was returned for,
/// and unsubscribing twice is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberKey(u64);

/// A synchronous multicast observer list for events of type `E`.
///
/// Emission snapshots the subscriber list before invoking anything, so
/// callbacks are free to subscribe, unsubscribe, or trigger further emissions.
/// A subscriber removed by a callback during an emission still receives that
/// in-flight emission (it was part of the snapshot).
pub struct Signal<E: Event> {
    next_key: Cell<u64>,
    subscribers: RefCell<Vec<(SubscriberKey, Rc<dyn Fn(&E)>)>>,
}

impl<E: Event> Signal<E> {
    /// Create a new signal with no subscribers.
    pub fn new() -> Self {
        Self {
            next_key: Cell::new(0),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Subscribe a callback, returning the key that detaches it.
    pub fn subscribe(&self, callback: impl Fn(&E) + 'static) -> SubscriberKey {
        let key = SubscriberKey(self.next_key.get());
        self.next_key.set(key.0 + 1);
        self.subscribers.borrow_mut().push((key, Rc::new(callback)));
        key
    }

    /// Detach the subscription for `key`. Returns whether it was attached.
    pub fn unsubscribe(&self, key: SubscriberKey) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        match subscribers.iter().position(|(k, _)| *k == key) {
            Some(index) => {
                subscribers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Deliver an event to every current subscriber, synchronously.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Rc<dyn Fn(&E)>> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();

        for callback in snapshot {
            callback(event);
        }
    }

    /// Detach every subscriber.
    pub fn clear(&self) {
        self.subscribers.borrow_mut().clear();
    }

    /// Number of attached subscribers.
    pub fn count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl<E: Event> Default for Signal<E> {
    fn default() -> Self {
        Self::new()
    }
}
