//! The tracked-set base abstraction.
//!
//! A [`Holder`] is an ordered, duplicate-free collection of entities with
//! multicast tracked/untracked callbacks. It is the common substrate of the
//! global registry and every filtered view.
//!
//! Query operations take a snapshot of the membership before doing anything
//! else, so a callback that tracks or untracks during iteration never
//! invalidates the in-progress traversal and never observes entries added or
//! removed mid-traversal.
//!
//! [`Holder::clean`] permanently closes the set: every member is untracked
//! (with callbacks), all listeners are detached, and from then on every query
//! returns empty and every mutation is a silent no-op. The closed-state guard
//! is what keeps straggling late events from being delivered into a torn-down
//! view.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;

use fixedbitset::FixedBitSet;
use rand::Rng;

use crate::ecs::entity::Entity;

/// A tracked/untracked callback.
pub type TrackHandler = Rc<dyn Fn(Entity)>;

/// An optional membership predicate for query operations.
pub type Predicate<'a> = Option<&'a dyn Fn(Entity) -> bool>;

/// An optional ordering for query operations.
pub type Comparator<'a> = Option<&'a dyn Fn(&Entity, &Entity) -> Ordering>;

/// Key identifying one listener pair on a [`Holder`]. Unlistening is
/// guaranteed-once; a second unlisten with the same key is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(u64);

struct Listener {
    key: ListenerKey,
    on_tracked: Option<TrackHandler>,
    on_untracked: Option<TrackHandler>,
}

/// Membership is an insertion-ordered list plus a bitset over entity slots
/// for O(1) containment checks. The bitset grows on demand.
#[derive(Default)]
struct Membership {
    order: Vec<Entity>,
    index: FixedBitSet,
}

impl Membership {
    fn contains(&self, entity: Entity) -> bool {
        self.index.contains(entity.index()) && self.order.contains(&entity)
    }

    fn insert(&mut self, entity: Entity) {
        let slot = entity.index();
        self.index.grow(slot + 1);
        self.index.insert(slot);
        self.order.push(entity);
    }

    fn remove(&mut self, entity: Entity) -> bool {
        match self.order.iter().position(|e| *e == entity) {
            Some(position) => {
                self.order.remove(position);
                self.index.set(entity.index(), false);
                true
            }
            None => false,
        }
    }
}

/// An ordered, duplicate-free set of entities with change callbacks.
pub struct Holder {
    /// `None` once the holder has been cleaned.
    members: RefCell<Option<Membership>>,
    listeners: RefCell<Vec<Listener>>,
    next_key: Cell<u64>,
}

impl Holder {
    pub(crate) fn new() -> Self {
        Self {
            members: RefCell::new(Some(Membership::default())),
            listeners: RefCell::new(Vec::new()),
            next_key: Cell::new(0),
        }
    }

    /// Whether this holder has been permanently closed.
    pub fn is_cleaned(&self) -> bool {
        self.members.borrow().is_none()
    }

    // -- Listeners -- \\

    /// Attach a tracked/untracked callback pair. Either side may be `None`.
    /// On a cleaned holder the key is returned but nothing is attached.
    pub fn listen(
        &self,
        on_tracked: Option<TrackHandler>,
        on_untracked: Option<TrackHandler>,
    ) -> ListenerKey {
        let key = ListenerKey(self.next_key.get());
        self.next_key.set(key.0 + 1);

        if !self.is_cleaned() {
            self.listeners.borrow_mut().push(Listener {
                key,
                on_tracked,
                on_untracked,
            });
        }
        key
    }

    /// Detach a listener pair, returning the detached callbacks. Returns
    /// `None` if the key was already detached (or never attached).
    pub fn unlisten(&self, key: ListenerKey) -> Option<(Option<TrackHandler>, Option<TrackHandler>)> {
        let mut listeners = self.listeners.borrow_mut();
        let position = listeners.iter().position(|l| l.key == key)?;
        let listener = listeners.remove(position);
        Some((listener.on_tracked, listener.on_untracked))
    }

    // -- Tracking -- \\

    /// Add an entity to the set, firing tracked callbacks. Returns whether it
    /// was newly added; tracking a present entity (or tracking on a cleaned
    /// holder) is a no-op.
    pub(crate) fn track(&self, entity: Entity) -> bool {
        {
            let mut guard = self.members.borrow_mut();
            let Some(members) = guard.as_mut() else {
                return false;
            };
            if members.contains(entity) {
                return false;
            }
            members.insert(entity);
        }

        for callback in self.snapshot_listeners(true) {
            callback(entity);
        }
        true
    }

    /// Remove an entity from the set, firing untracked callbacks. Returns
    /// whether a removal occurred; untracking an absent entity is a no-op.
    pub(crate) fn untrack(&self, entity: Entity) -> bool {
        {
            let mut guard = self.members.borrow_mut();
            let Some(members) = guard.as_mut() else {
                return false;
            };
            if !members.remove(entity) {
                return false;
            }
        }

        for callback in self.snapshot_listeners(false) {
            callback(entity);
        }
        true
    }

    /// Untrack every member in reverse order (firing callbacks), detach all
    /// listeners, and permanently close the set.
    pub(crate) fn clean(&self) {
        if self.is_cleaned() {
            return;
        }

        let mut members = self.all();
        members.reverse();
        for entity in members {
            self.untrack(entity);
        }

        self.listeners.borrow_mut().clear();
        *self.members.borrow_mut() = None;
    }

    // -- Entity Query Methods -- \\

    /// Whether the entity is currently a member. Always false once cleaned.
    pub fn contains(&self, entity: Entity) -> bool {
        self.members
            .borrow()
            .as_ref()
            .is_some_and(|m| m.contains(entity))
    }

    /// Current number of members. Zero once cleaned.
    pub fn len(&self) -> usize {
        self.members
            .borrow()
            .as_ref()
            .map_or(0, |m| m.order.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the current membership in insertion order.
    pub fn all(&self) -> Vec<Entity> {
        self.members
            .borrow()
            .as_ref()
            .map_or_else(Vec::new, |m| m.order.clone())
    }

    /// Snapshot of the membership, optionally filtered and sorted. The
    /// snapshot is taken before the predicate runs, so the predicate itself
    /// may mutate the holder.
    pub fn select(&self, predicate: Predicate<'_>, sort: Comparator<'_>) -> Vec<Entity> {
        let mut result = self.all();
        if let Some(predicate) = predicate {
            result.retain(|e| predicate(*e));
        }
        if let Some(sort) = sort {
            result.sort_by(|a, b| sort(a, b));
        }
        result
    }

    /// First member under the given filter and ordering.
    pub fn first(&self, predicate: Predicate<'_>, sort: Comparator<'_>) -> Option<Entity> {
        self.select(predicate, sort).first().copied()
    }

    /// A uniformly random member under the given filter.
    pub fn random(&self, predicate: Predicate<'_>) -> Option<Entity> {
        let candidates = self.select(predicate, None);
        if candidates.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..candidates.len());
        Some(candidates[index])
    }

    /// Visit every member of a filtered, sorted snapshot in order.
    pub fn for_each(&self, predicate: Predicate<'_>, sort: Comparator<'_>, mut f: impl FnMut(Entity)) {
        for entity in self.select(predicate, sort) {
            f(entity);
        }
    }

    /// Visit every member of a filtered, sorted snapshot in reverse order.
    pub fn for_each_reverse(
        &self,
        predicate: Predicate<'_>,
        sort: Comparator<'_>,
        mut f: impl FnMut(Entity),
    ) {
        for entity in self.select(predicate, sort).into_iter().rev() {
            f(entity);
        }
    }

    fn snapshot_listeners(&self, tracked: bool) -> Vec<TrackHandler> {
        self.listeners
            .borrow()
            .iter()
            .filter_map(|l| {
                if tracked {
                    l.on_tracked.clone()
                } else {
                    l.on_untracked.clone()
                }
            })
            .collect()
    }
}
