//! The World is the owning context for the whole engine.
//!
//! A `World` composes the entity allocator, the per-entity records, the
//! component kind registry, the global [`Tracker`] and the shared view cache.
//! It is the single mutation surface: tag and component changes go through
//! the world, which updates the record, then lets the change propagate
//! synchronously through the entity's signal, the tracker's registry-wide
//! stream, and every live filtered view - all before the mutating call
//! returns.
//!
//! There is no hidden global instance; the application constructs a `World`,
//! passes clones of the handle wherever mutation access is needed, and tears
//! it down with [`World::clean`]. Two worlds are fully independent.
//!
//! # Reentrancy
//!
//! All callbacks run synchronously on the mutating call's stack, and a
//! callback may itself mutate the world. Internal borrows are always released
//! before any callback is invoked, and set iteration works on snapshots, so
//! reentrant mutation is safe by construction.

use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::warn;

use crate::ecs::component::{Component, ComponentRef, Kind, registry::Registry};
use crate::ecs::entity::{Allocator, Entity, Record, Slot, Store, Toggle};
use crate::ecs::error::Error;
use crate::ecs::event::EntityEvent;
use crate::ecs::filter::cache::{Cache, Release};
use crate::ecs::filter::view::Filter;
use crate::ecs::filter::{Builder, FilterHandle, Rules};
use crate::ecs::holder::{Holder, TrackHandler};
use crate::ecs::tracker::Tracker;

struct Inner {
    /// The world's entity allocator.
    allocator: RefCell<Allocator>,

    /// The per-entity records (tags, component slots, entity signal).
    store: Rc<RefCell<Store>>,

    /// The component kind registry for the world.
    kinds: Rc<RefCell<Registry>>,

    /// The registry of live entities and its event hub.
    tracker: Tracker,

    /// The shared filtered-view cache.
    cache: RefCell<Cache>,

    /// Set once the world has been cleaned.
    closed: Cell<bool>,
}

/// The owning context for entities, components, and filtered views.
///
/// `World` is a cheap cloneable handle; clones share the same underlying
/// state. It is single-threaded by design (`!Send`).
#[derive(Clone)]
pub struct World {
    inner: Rc<Inner>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                allocator: RefCell::new(Allocator::new()),
                store: Rc::new(RefCell::new(Store::default())),
                kinds: Rc::new(RefCell::new(Registry::new())),
                tracker: Tracker::new(),
                cache: RefCell::new(Cache::default()),
                closed: Cell::new(false),
            }),
        }
    }

    /// The registry of live entities.
    #[inline]
    pub fn tracker(&self) -> &Tracker {
        &self.inner.tracker
    }

    /// The set of live entities, for direct querying.
    #[inline]
    pub fn entities(&self) -> &Holder {
        self.inner.tracker.entities()
    }

    /// Whether the world has been cleaned.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    // -- Entity lifecycle -- \\

    /// Create a new entity, register it with the tracker, and announce it.
    pub fn spawn(&self) -> Entity {
        let entity = self.inner.allocator.borrow_mut().alloc();
        let record = Record::new(entity);
        let signal = Rc::clone(record.signal());
        self.inner.store.borrow_mut().insert(record);

        self.inner.tracker.register(entity, &signal);
        signal.emit(&EntityEvent::Created(entity));
        entity
    }

    /// Destroy an entity: announce the destruction, unregister it (which
    /// removes it from every view), then free its record and id. Returns
    /// whether the handle named a live entity.
    pub fn despawn(&self, entity: Entity) -> bool {
        let signal = {
            let mut store = self.inner.store.borrow_mut();
            let Some(record) = store.get_mut(entity) else {
                warn!("despawn of dead entity {entity:?}");
                return false;
            };
            if record.dying() {
                return false;
            }
            record.set_dying();
            Rc::clone(record.signal())
        };

        signal.emit(&EntityEvent::Destroyed(entity));
        self.inner.tracker.unregister(entity);

        // Hold the record past the store borrow so component drops run with
        // the store unlocked.
        let removed = self.inner.store.borrow_mut().remove(entity);
        if removed.is_some() {
            self.inner.allocator.borrow_mut().free(entity);
        }
        drop(removed);
        true
    }

    /// Whether the handle names a live entity.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.inner.store.borrow().get(entity).is_some()
    }

    // -- Tags -- \\

    /// Add a tag to an entity. Returns whether it was newly added.
    pub fn add_tag(&self, entity: Entity, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        let signal = {
            let mut store = self.inner.store.borrow_mut();
            let Some(record) = store.get_mut(entity) else {
                warn!("tag {tag:?} added to dead entity {entity:?}");
                return false;
            };
            if !record.add_tag(tag.clone()) {
                return false;
            }
            Rc::clone(record.signal())
        };

        signal.emit(&EntityEvent::TagAdded(entity, tag));
        true
    }

    /// Remove a tag from an entity. Returns whether it was present.
    pub fn remove_tag(&self, entity: Entity, tag: &str) -> bool {
        let signal = {
            let mut store = self.inner.store.borrow_mut();
            let Some(record) = store.get_mut(entity) else {
                warn!("tag {tag:?} removed from dead entity {entity:?}");
                return false;
            };
            if !record.remove_tag(tag) {
                return false;
            }
            Rc::clone(record.signal())
        };

        signal.emit(&EntityEvent::TagRemoved(entity, tag.to_owned()));
        true
    }

    pub fn has_tag(&self, entity: Entity, tag: &str) -> bool {
        self.inner
            .store
            .borrow()
            .get(entity)
            .is_some_and(|r| r.has_tag(tag))
    }

    /// The entity's tags in insertion order.
    pub fn tags(&self, entity: Entity) -> Vec<String> {
        self.inner
            .store
            .borrow()
            .get(entity)
            .map_or_else(Vec::new, |r| r.tags().to_vec())
    }

    /// Whether the entity carries any of the given tags. An empty query list
    /// matches only a tagless entity.
    pub fn has_any_tag<S: AsRef<str>>(&self, entity: Entity, tags: &[S]) -> bool {
        self.inner
            .store
            .borrow()
            .get(entity)
            .is_some_and(|r| r.has_any_tag(tags))
    }

    /// Whether the entity carries all of the given tags. An empty query list
    /// matches only a tagless entity.
    pub fn has_all_tags<S: AsRef<str>>(&self, entity: Entity, tags: &[S]) -> bool {
        self.inner
            .store
            .borrow()
            .get(entity)
            .is_some_and(|r| r.has_all_tags(tags))
    }

    // -- Components -- \\

    /// Register a component kind without attaching anything.
    pub fn register_kind<C: Component>(&self) -> Kind {
        self.inner.kinds.borrow_mut().register::<C>()
    }

    /// The kind for `C`, if this world has registered it.
    pub fn kind_of<C: Component>(&self) -> Option<Kind> {
        self.inner.kinds.borrow().get::<C>()
    }

    /// Attach a component to a live entity, returning a shared handle to it.
    /// Attaching to a dead entity fails loudly.
    pub fn attach<C: Component>(
        &self,
        entity: Entity,
        component: C,
    ) -> Result<ComponentRef<C>, Error> {
        let kind = self.inner.kinds.borrow_mut().register::<C>();
        let cell = Rc::new(RefCell::new(component));

        let signal = {
            let mut store = self.inner.store.borrow_mut();
            let Some(record) = store.get_mut(entity) else {
                return Err(Error::StaleEntity(entity));
            };
            record.attach(Slot::new(kind, Rc::clone(&cell)));
            Rc::clone(record.signal())
        };

        signal.emit(&EntityEvent::ComponentAdded(entity, kind));
        Ok(ComponentRef::new(cell))
    }

    /// Detach the first component of exactly type `C`. Returns whether one
    /// was attached.
    pub fn detach<C: Component>(&self, entity: Entity) -> bool {
        let (signal, slot) = {
            let mut store = self.inner.store.borrow_mut();
            let Some(record) = store.get_mut(entity) else {
                warn!("component detached from dead entity {entity:?}");
                return false;
            };
            let Some(slot) = record.detach(TypeId::of::<C>()) else {
                return false;
            };
            (Rc::clone(record.signal()), slot)
        };

        // The slot (and possibly the last handle to the component) drops
        // with the store unlocked, before listeners re-evaluate.
        let kind = slot.kind();
        drop(slot);
        signal.emit(&EntityEvent::ComponentRemoved(entity, kind));
        true
    }

    /// A shared handle to the first component of exactly type `C`.
    pub fn component<C: Component>(&self, entity: Entity) -> Option<ComponentRef<C>> {
        let store = self.inner.store.borrow();
        let record = store.get(entity)?;
        let slot = record.slot(TypeId::of::<C>())?;
        let cell = Rc::clone(slot.any()).downcast::<RefCell<C>>().ok()?;
        Some(ComponentRef::new(cell))
    }

    /// Whether the entity carries a component satisfying kind `C`, honoring
    /// widened capability claims ([`Component::provides`]).
    pub fn has_component<C: Component>(&self, entity: Entity, include_disabled: bool) -> bool {
        self.inner
            .store
            .borrow()
            .get(entity)
            .is_some_and(|r| r.has_component(TypeId::of::<C>(), include_disabled))
    }

    /// Kind-valued variant of [`World::has_component`].
    pub fn has_component_kind(&self, entity: Entity, kind: Kind, include_disabled: bool) -> bool {
        let kinds = self.inner.kinds.borrow();
        let Some(info) = kinds.info(kind) else {
            return false;
        };
        self.inner
            .store
            .borrow()
            .get(entity)
            .is_some_and(|r| r.has_component(info.type_id(), include_disabled))
    }

    /// Toggle the enabled flag on the entity's `C` component. Returns whether
    /// such a component is attached; an event fires only on an actual
    /// transition.
    pub fn set_enabled<C: Component>(&self, entity: Entity, enabled: bool) -> bool {
        let (signal, kind) = {
            let mut store = self.inner.store.borrow_mut();
            let Some(record) = store.get_mut(entity) else {
                warn!("component toggled on dead entity {entity:?}");
                return false;
            };
            match record.set_enabled(TypeId::of::<C>(), enabled) {
                Toggle::Missing => return false,
                Toggle::Unchanged => return true,
                Toggle::Changed(kind) => (Rc::clone(record.signal()), kind),
            }
        };

        let event = if enabled {
            EntityEvent::ComponentEnabled(entity, kind)
        } else {
            EntityEvent::ComponentDisabled(entity, kind)
        };
        signal.emit(&event);
        true
    }

    /// The enabled flag of the entity's `C` component, if attached.
    pub fn is_enabled<C: Component>(&self, entity: Entity) -> Option<bool> {
        self.inner
            .store
            .borrow()
            .get(entity)
            .and_then(|r| r.is_enabled(TypeId::of::<C>()))
    }

    // -- Rules -- \\

    /// Start building a rules value against this world's component kinds.
    pub fn rules(&self) -> Builder {
        Builder::new(Rc::clone(&self.inner.kinds))
    }

    /// Start building from the conditions of an existing rules value.
    pub fn rules_from(&self, rules: &Rules) -> Builder {
        Builder::seeded(Rc::clone(&self.inner.kinds), rules)
    }

    /// Evaluate a rules value against one entity right now.
    pub fn matches(&self, rules: &Rules, entity: Entity) -> bool {
        let store = self.inner.store.borrow();
        let kinds = self.inner.kinds.borrow();
        store
            .get(entity)
            .is_some_and(|record| rules.matches(record, &kinds))
    }

    // -- Filtered views -- \\

    /// Acquire a shared view for `rules`.
    ///
    /// If a live view with structurally equal rules exists it is joined and
    /// its reference count bumped; otherwise a fresh view is opened and
    /// seeded from the current population. The callbacks are attached to the
    /// view, and with `replay` set, `on_tracked` is invoked once per entity
    /// already in the view (in membership order) before this call returns, so
    /// a late subscriber misses nothing.
    pub fn acquire_filter(
        &self,
        rules: Rules,
        on_tracked: Option<TrackHandler>,
        on_untracked: Option<TrackHandler>,
        replay: bool,
    ) -> FilterHandle {
        if self.is_closed() {
            warn!("filter acquired on a closed world");
        }

        let existing = self.inner.cache.borrow_mut().acquire(&rules);
        let filter = match existing {
            Some(filter) => filter,
            None => {
                let filter = Filter::open(
                    rules.clone(),
                    Rc::clone(&self.inner.store),
                    Rc::clone(&self.inner.kinds),
                    &self.inner.tracker,
                );
                self.inner
                    .cache
                    .borrow_mut()
                    .insert(rules, Rc::clone(&filter));
                filter
            }
        };

        let listener = filter.listen(on_tracked.clone(), on_untracked);
        if replay && let Some(on_tracked) = &on_tracked {
            for entity in filter.all() {
                on_tracked(entity);
            }
        }

        FilterHandle::new(filter, listener)
    }

    /// Release one claim on a shared view.
    ///
    /// The handle's callbacks are detached; with `replay` set, the untracked
    /// callback is invoked once per entity still in the view (symmetric
    /// teardown notification). When the last claim is released the view stops
    /// watching the registry and its tracked set is closed for good; a later
    /// acquire with equal rules opens a fresh view.
    pub fn release_filter(&self, handle: FilterHandle, replay: bool) {
        let FilterHandle { filter, listener } = handle;

        let detached = filter.entities().unlisten(listener);
        if replay
            && let Some((_, Some(on_untracked))) = &detached
        {
            for entity in filter.all() {
                on_untracked(entity);
            }
        }

        let release = self
            .inner
            .cache
            .borrow_mut()
            .release(filter.rules(), &filter);
        match release {
            Release::Retained => {}
            Release::Closed => filter.close(),
            Release::NotCached => {
                if !filter.is_cleaned() {
                    filter.close();
                }
            }
        }
    }

    /// Current number of claims on the view for `rules`. Zero if no live
    /// view carries these rules.
    pub fn filter_refs(&self, rules: &Rules) -> usize {
        self.inner.cache.borrow().refs(rules)
    }

    // -- Teardown -- \\

    /// Tear the world down: every entity is untracked from the tracker (and
    /// with it from every view, with callbacks), the registry-wide stream is
    /// closed, and all records are dropped. Subsequent mutations are no-ops.
    pub fn clean(&self) {
        if self.inner.closed.replace(true) {
            return;
        }

        self.inner.tracker.clean();
        self.inner.cache.borrow_mut().clear();

        // Take the records out before dropping them, so component drops run
        // with the store unlocked.
        let dropped = std::mem::take(&mut *self.inner.store.borrow_mut());
        drop(dropped);
    }
}
