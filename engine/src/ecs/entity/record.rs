use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use crate::ecs::component::{Component, Kind};
use crate::ecs::entity::Entity;
use crate::ecs::event::{EntityEvent, Signal};

/// One attached component on an entity.
///
/// The same allocation is held through two views: `object` for dynamic
/// dispatch (capability checks) and `any` for recovering the concrete type.
/// The enabled flag lives on the slot, not inside the component value.
pub(crate) struct Slot {
    kind: Kind,
    type_id: TypeId,
    enabled: bool,
    object: Rc<RefCell<dyn Component>>,
    any: Rc<dyn Any>,
}

impl Slot {
    pub(crate) fn new<C: Component>(kind: Kind, cell: Rc<RefCell<C>>) -> Self {
        Self {
            kind,
            type_id: TypeId::of::<C>(),
            enabled: true,
            object: cell.clone(),
            any: cell,
        }
    }

    #[inline]
    pub(crate) fn kind(&self) -> Kind {
        self.kind
    }

    #[inline]
    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub(crate) fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub(crate) fn any(&self) -> &Rc<dyn Any> {
        &self.any
    }

    /// Whether this slot satisfies a component condition for `type_id`.
    ///
    /// An exact kind match is answered without touching the component value,
    /// so a component the caller currently borrows mutably still satisfies
    /// its own kind. Widened capability claims (`Component::provides`) need a
    /// shared borrow and are skipped for a component that is mutably borrowed
    /// at evaluation time.
    pub(crate) fn satisfies(&self, type_id: TypeId, include_disabled: bool) -> bool {
        if !include_disabled && !self.enabled {
            return false;
        }

        self.type_id == type_id
            || self
                .object
                .try_borrow()
                .map(|component| component.provides(type_id))
                .unwrap_or(false)
    }
}

/// The outcome of toggling a slot's enabled flag.
pub(crate) enum Toggle {
    Missing,
    Unchanged,
    Changed(Kind),
}

/// The per-entity bookkeeping: tags, component slots, and the entity's own
/// change signal. Tags are kept unique in insertion order; slots hold only
/// components attached to this entity.
pub(crate) struct Record {
    entity: Entity,
    dying: bool,
    tags: Vec<String>,
    slots: Vec<Slot>,
    signal: Rc<Signal<EntityEvent>>,
}

impl Record {
    pub(crate) fn new(entity: Entity) -> Self {
        Self {
            entity,
            dying: false,
            tags: Vec::new(),
            slots: Vec::new(),
            signal: Rc::new(Signal::new()),
        }
    }

    #[inline]
    pub(crate) fn entity(&self) -> Entity {
        self.entity
    }

    #[inline]
    pub(crate) fn signal(&self) -> &Rc<Signal<EntityEvent>> {
        &self.signal
    }

    #[inline]
    pub(crate) fn dying(&self) -> bool {
        self.dying
    }

    #[inline]
    pub(crate) fn set_dying(&mut self) {
        self.dying = true;
    }

    // -- Tags -- \\

    pub(crate) fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Add a tag, returning whether it was newly added.
    pub(crate) fn add_tag(&mut self, tag: String) -> bool {
        if self.has_tag(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Remove a tag, returning whether it was present.
    pub(crate) fn remove_tag(&mut self, tag: &str) -> bool {
        match self.tags.iter().position(|t| t == tag) {
            Some(index) => {
                self.tags.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether the entity carries any of the given tags. An empty query list
    /// matches only a tagless entity.
    pub(crate) fn has_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        if tags.is_empty() {
            return self.tags.is_empty();
        }
        tags.iter().any(|t| self.has_tag(t.as_ref()))
    }

    /// Whether the entity carries all of the given tags. An empty query list
    /// matches only a tagless entity.
    pub(crate) fn has_all_tags<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        if tags.is_empty() {
            return self.tags.is_empty();
        }
        tags.iter().all(|t| self.has_tag(t.as_ref()))
    }

    // -- Components -- \\

    pub(crate) fn attach(&mut self, slot: Slot) {
        self.slots.push(slot);
    }

    /// Remove the first slot holding a component of exactly `type_id`.
    pub(crate) fn detach(&mut self, type_id: TypeId) -> Option<Slot> {
        let index = self
            .slots
            .iter()
            .position(|s| Slot::type_id(s) == type_id)?;
        Some(self.slots.remove(index))
    }

    /// First slot holding a component of exactly `type_id`.
    pub(crate) fn slot(&self, type_id: TypeId) -> Option<&Slot> {
        self.slots.iter().find(|s| Slot::type_id(s) == type_id)
    }

    /// Whether any attached component satisfies `type_id`, honoring widened
    /// capability claims.
    pub(crate) fn has_component(&self, type_id: TypeId, include_disabled: bool) -> bool {
        self.slots
            .iter()
            .any(|s| s.satisfies(type_id, include_disabled))
    }

    /// Toggle the enabled flag on the first slot of exactly `type_id`.
    pub(crate) fn set_enabled(&mut self, type_id: TypeId, enabled: bool) -> Toggle {
        let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| Slot::type_id(s) == type_id)
        else {
            return Toggle::Missing;
        };

        if slot.enabled == enabled {
            return Toggle::Unchanged;
        }
        slot.enabled = enabled;
        Toggle::Changed(slot.kind())
    }

    pub(crate) fn is_enabled(&self, type_id: TypeId) -> Option<bool> {
        self.slot(type_id).map(Slot::enabled)
    }
}

/// Entity-indexed storage for records. Slots are reused across generations;
/// lookups validate the handle's generation against the stored record.
#[derive(Default)]
pub(crate) struct Store {
    records: Vec<Option<Record>>,
}

impl Store {
    pub(crate) fn insert(&mut self, record: Record) {
        let index = record.entity().index();
        if index >= self.records.len() {
            self.records.resize_with(index + 1, || None);
        }
        self.records[index] = Some(record);
    }

    pub(crate) fn get(&self, entity: Entity) -> Option<&Record> {
        self.records
            .get(entity.index())?
            .as_ref()
            .filter(|r| r.entity() == entity)
    }

    pub(crate) fn get_mut(&mut self, entity: Entity) -> Option<&mut Record> {
        self.records
            .get_mut(entity.index())?
            .as_mut()
            .filter(|r| r.entity() == entity)
    }

    pub(crate) fn remove(&mut self, entity: Entity) -> Option<Record> {
        let slot = self.records.get_mut(entity.index())?;
        if slot.as_ref().is_some_and(|r| r.entity() == entity) {
            slot.take()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::entity::Generation;

    #[test]
    fn tags_are_deduplicated_in_insertion_order() {
        // Given
        let mut record = Record::new(Entity::new(0u32));

        // When
        assert!(record.add_tag("enemy".into()));
        assert!(record.add_tag("active".into()));
        assert!(!record.add_tag("enemy".into()));

        // Then
        assert_eq!(record.tags(), ["enemy", "active"]);
    }

    #[test]
    fn empty_tag_query_matches_only_tagless_record() {
        let mut record = Record::new(Entity::new(0u32));
        let none: [&str; 0] = [];

        assert!(record.has_any_tag(&none));
        assert!(record.has_all_tags(&none));

        record.add_tag("enemy".into());
        assert!(!record.has_any_tag(&none));
        assert!(!record.has_all_tags(&none));
    }

    #[test]
    fn store_rejects_stale_generation() {
        // Given
        let mut store = Store::default();
        let live = Entity::new_with_generation(3u32.into(), Generation::FIRST.next());
        store.insert(Record::new(live));

        // When - looking up the previous generation of the same slot
        let stale = Entity::new(3u32);

        // Then
        assert!(store.get(live).is_some());
        assert!(store.get(stale).is_none());
        assert!(store.remove(stale).is_none());
        assert!(store.remove(live).is_some());
    }
}
