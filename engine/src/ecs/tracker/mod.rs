//! The global entity registry.
//!
//! The [`Tracker`] is the source of truth for which entities currently exist.
//! It is a [`Holder`] over the whole population plus the registry-wide event
//! hub: when an entity registers, the tracker bridges the entity's own signal
//! into its single [`TrackerEvent`] stream, so consumers watching the whole
//! population (filtered views) subscribe exactly once instead of once per
//! entity.
//!
//! There is no process-wide instance; the tracker is owned by its `World` and
//! torn down with it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::warn;

use crate::ecs::entity::{Entity, Id};
use crate::ecs::event::{EntityEvent, Signal, SubscriberKey, TrackerEvent};
use crate::ecs::holder::Holder;

struct Bridge {
    signal: Rc<Signal<EntityEvent>>,
    key: SubscriberKey,
}

/// The registry of all live entities and the hub re-publishing their events.
pub struct Tracker {
    entities: Holder,
    events: Rc<Signal<TrackerEvent>>,
    bridges: RefCell<HashMap<Id, Bridge>>,
}

impl Tracker {
    pub(crate) fn new() -> Self {
        let entities = Holder::new();
        let events = Rc::new(Signal::new());

        // Re-publish the holder's own membership changes on the event hub.
        let tracked = Rc::clone(&events);
        let untracked = Rc::clone(&events);
        entities.listen(
            Some(Rc::new(move |e| tracked.emit(&TrackerEvent::Tracked(e)))),
            Some(Rc::new(move |e| untracked.emit(&TrackerEvent::Untracked(e)))),
        );

        Self {
            entities,
            events,
            bridges: RefCell::new(HashMap::new()),
        }
    }

    /// The set of live entities.
    #[inline]
    pub fn entities(&self) -> &Holder {
        &self.entities
    }

    /// The registry-wide event stream.
    #[inline]
    pub fn events(&self) -> &Rc<Signal<TrackerEvent>> {
        &self.events
    }

    /// Whether the tracker has been torn down.
    #[inline]
    pub fn is_cleaned(&self) -> bool {
        self.entities.is_cleaned()
    }

    /// Track an entity and bridge its signal into the registry-wide stream.
    /// No-op on a cleaned tracker or for an already-registered entity.
    pub(crate) fn register(&self, entity: Entity, signal: &Rc<Signal<EntityEvent>>) {
        if self.is_cleaned() {
            return;
        }

        if self.entities.track(entity) {
            let events = Rc::clone(&self.events);
            let key = signal.subscribe(move |event: &EntityEvent| {
                events.emit(&TrackerEvent::Entity(event.clone()));
            });
            self.bridges.borrow_mut().insert(
                entity.id(),
                Bridge {
                    signal: Rc::clone(signal),
                    key,
                },
            );
        }
    }

    /// Untrack an entity and drop its bridge. Returns whether the entity was
    /// actually removed; the caller owns the record teardown that follows.
    pub(crate) fn unregister(&self, entity: Entity) -> bool {
        if self.is_cleaned() {
            return false;
        }

        if !self.entities.untrack(entity) {
            return false;
        }

        match self.bridges.borrow_mut().remove(&entity.id()) {
            Some(bridge) => {
                bridge.signal.unsubscribe(bridge.key);
            }
            None => {
                warn!("unregistered entity {entity:?} had no event bridge");
            }
        }
        true
    }

    /// Untrack every entity (notifying subscribers), then drop all bridges
    /// and registry-wide subscribers. The tracker is unusable afterwards.
    pub(crate) fn clean(&self) {
        if self.is_cleaned() {
            return;
        }

        self.entities.clean();

        for (_, bridge) in self.bridges.borrow_mut().drain() {
            bridge.signal.unsubscribe(bridge.key);
        }
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn entity(id: u32) -> Entity {
        Entity::new(id)
    }

    #[test]
    fn register_bridges_entity_events_into_the_hub() {
        // Given
        let tracker = Tracker::new();
        let signal = Rc::new(Signal::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        tracker.events().subscribe(move |event: &TrackerEvent| {
            s.borrow_mut().push(format!("{event:?}"));
        });

        // When
        tracker.register(entity(0), &signal);
        signal.emit(&EntityEvent::TagAdded(entity(0), "enemy".into()));

        // Then - the tracked event and the re-published tag event both arrive
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].contains("Tracked"));
        assert!(seen[1].contains("TagAdded"));
    }

    #[test]
    fn unregister_stops_republication() {
        // Given
        let tracker = Tracker::new();
        let signal = Rc::new(Signal::new());
        tracker.register(entity(0), &signal);

        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        tracker.events().subscribe(move |_: &TrackerEvent| c.set(c.get() + 1));

        // When
        assert!(tracker.unregister(entity(0)));
        signal.emit(&EntityEvent::TagAdded(entity(0), "enemy".into()));

        // Then - only the untracked event arrived, the tag event did not
        assert_eq!(count.get(), 1);
        assert_eq!(signal.count(), 0);
        assert!(!tracker.unregister(entity(0)));
    }

    #[test]
    fn clean_tears_down_hub_and_membership() {
        // Given
        let tracker = Tracker::new();
        let signal = Rc::new(Signal::new());
        tracker.register(entity(0), &signal);

        // When
        tracker.clean();

        // Then
        assert!(tracker.is_cleaned());
        assert_eq!(tracker.events().count(), 0);
        assert_eq!(signal.count(), 0);
        tracker.register(entity(1), &Rc::new(Signal::new()));
        assert_eq!(tracker.entities().len(), 0);
    }
}
