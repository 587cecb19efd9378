//! Cached filtered views.

use std::cell::{Cell, RefCell};
use std::ops::Deref;
use std::rc::{Rc, Weak};

use crate::ecs::component::registry::Registry;
use crate::ecs::entity::{Entity, Store};
use crate::ecs::event::{EntityEvent, Signal, SubscriberKey, TrackerEvent};
use crate::ecs::filter::rules::Rules;
use crate::ecs::holder::{Holder, ListenerKey, TrackHandler};
use crate::ecs::tracker::Tracker;

/// A view over the population kept continuously consistent with one
/// [`Rules`] value.
///
/// The view subscribes once to the registry-wide event stream. Any event
/// naming an entity re-evaluates the rules against that entity and tracks or
/// untracks it accordingly; both operations are idempotent, so the
/// re-evaluation runs unconditionally. An entity leaving the registry is
/// untracked unconditionally, since an entity that no longer exists can never
/// match. Events arriving after the view is torn down are ignored by the
/// holder's closed-state guard.
///
/// The view derefs to its [`Holder`], exposing the snapshot query surface
/// (`all`, `select`, `first`, `random`, `for_each`, ...).
pub struct Filter {
    rules: Rules,
    entities: Holder,
    store: Rc<RefCell<Store>>,
    kinds: Rc<RefCell<Registry>>,
    events: Rc<Signal<TrackerEvent>>,
    subscription: Cell<Option<SubscriberKey>>,
}

impl Filter {
    /// Construct a live view: subscribe to the registry-wide stream, then
    /// seed the view with every currently-registered entity that matches.
    pub(crate) fn open(
        rules: Rules,
        store: Rc<RefCell<Store>>,
        kinds: Rc<RefCell<Registry>>,
        tracker: &Tracker,
    ) -> Rc<Self> {
        let filter = Rc::new(Self {
            rules,
            entities: Holder::new(),
            store,
            kinds,
            events: Rc::clone(tracker.events()),
            subscription: Cell::new(None),
        });

        let weak: Weak<Filter> = Rc::downgrade(&filter);
        let key = filter.events.subscribe(move |event: &TrackerEvent| {
            if let Some(filter) = weak.upgrade() {
                filter.on_event(event);
            }
        });
        filter.subscription.set(Some(key));

        for entity in tracker.entities().all() {
            if filter.matches(entity) {
                filter.entities.track(entity);
            }
        }

        filter
    }

    /// The rules this view stays consistent with.
    #[inline]
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// The underlying tracked set.
    #[inline]
    pub fn entities(&self) -> &Holder {
        &self.entities
    }

    /// Evaluate this view's rules against one entity right now.
    pub fn matches(&self, entity: Entity) -> bool {
        let store = self.store.borrow();
        let kinds = self.kinds.borrow();
        store
            .get(entity)
            .is_some_and(|record| self.rules.matches(record, &kinds))
    }

    /// Attach a consumer's callback pair to this view.
    pub(crate) fn listen(
        &self,
        on_tracked: Option<TrackHandler>,
        on_untracked: Option<TrackHandler>,
    ) -> ListenerKey {
        self.entities.listen(on_tracked, on_untracked)
    }

    /// Tear the view down: stop watching the registry stream and close the
    /// tracked set.
    pub(crate) fn close(&self) {
        if let Some(key) = self.subscription.take() {
            self.events.unsubscribe(key);
        }
        self.entities.clean();
    }

    fn on_event(&self, event: &TrackerEvent) {
        if self.entities.is_cleaned() {
            return;
        }

        match event {
            TrackerEvent::Tracked(entity) => {
                if self.matches(*entity) {
                    self.entities.track(*entity);
                }
            }
            TrackerEvent::Untracked(entity) => {
                self.entities.untrack(*entity);
            }
            TrackerEvent::Entity(event) => match event {
                EntityEvent::TagAdded(entity, _)
                | EntityEvent::TagRemoved(entity, _)
                | EntityEvent::ComponentAdded(entity, _)
                | EntityEvent::ComponentRemoved(entity, _)
                | EntityEvent::ComponentEnabled(entity, _)
                | EntityEvent::ComponentDisabled(entity, _) => {
                    self.reevaluate(*entity);
                }
                EntityEvent::Created(_) | EntityEvent::Destroyed(_) => {}
            },
        }
    }

    /// Track the entity if it now matches, untrack it if it no longer does.
    fn reevaluate(&self, entity: Entity) {
        if self.matches(entity) {
            self.entities.track(entity);
        } else {
            self.entities.untrack(entity);
        }
    }
}

impl Deref for Filter {
    type Target = Holder;

    fn deref(&self) -> &Self::Target {
        &self.entities
    }
}

/// One consumer's claim on a shared [`Filter`].
///
/// The handle derefs to the view for querying. Releasing goes through
/// `World::release_filter`, which consumes the handle; a handle can therefore
/// be released at most once.
pub struct FilterHandle {
    pub(crate) filter: Rc<Filter>,
    pub(crate) listener: ListenerKey,
}

impl FilterHandle {
    pub(crate) fn new(filter: Rc<Filter>, listener: ListenerKey) -> Self {
        Self { filter, listener }
    }

    /// The shared view this handle claims.
    #[inline]
    pub fn view(&self) -> &Filter {
        &self.filter
    }
}

impl Deref for FilterHandle {
    type Target = Filter;

    fn deref(&self) -> &Self::Target {
        &self.filter
    }
}
