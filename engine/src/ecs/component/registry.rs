//! The component kind registry.
//!
//! Kinds are dense per-world identifiers assigned at first registration.
//! All rule matching and event payloads speak in `Kind`; the registry is the
//! only place that maps back and forth to `TypeId` and a readable name.

use std::any::{TypeId, type_name};
use std::collections::HashMap;

use crate::ecs::component::Component;

/// A dense component kind identifier, unique within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Kind(u32);

impl Kind {
    /// Get the index of this kind if it were to live in indexable storage (e.g. Vec).
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Information about a registered component kind.
#[derive(Debug, Clone, Copy)]
pub struct Info {
    kind: Kind,
    type_id: TypeId,
    name: &'static str,
}

impl Info {
    fn new<C: Component>(kind: Kind) -> Self {
        Self {
            kind,
            type_id: TypeId::of::<C>(),
            name: type_name::<C>(),
        }
    }

    #[inline]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Registry of component kinds for one world.
#[derive(Debug, Default)]
pub struct Registry {
    type_map: HashMap<TypeId, Kind>,
    infos: Vec<Info>,
}

impl Registry {
    /// Create a new component kind registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type and get its kind. If the type is already
    /// registered, returns the existing kind.
    pub fn register<C: Component>(&mut self) -> Kind {
        let type_id = TypeId::of::<C>();
        if let Some(kind) = self.type_map.get(&type_id) {
            return *kind;
        }

        let kind = Kind(self.infos.len() as u32);
        self.infos.push(Info::new::<C>(kind));
        self.type_map.insert(type_id, kind);
        kind
    }

    /// Get the kind for a provided type `C`, if registered.
    #[inline]
    pub fn get<C: Component>(&self) -> Option<Kind> {
        self.get_by_type_id(TypeId::of::<C>())
    }

    /// Get the kind for a raw `TypeId`, if it names a registered component kind.
    #[inline]
    pub fn get_by_type_id(&self, type_id: TypeId) -> Option<Kind> {
        self.type_map.get(&type_id).copied()
    }

    /// Get the info for a kind, if the kind belongs to this registry.
    #[inline]
    pub fn info(&self, kind: Kind) -> Option<&Info> {
        self.infos.get(kind.index())
    }

    /// Number of registered kinds.
    #[inline]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_macros::Component;

    #[derive(Component)]
    struct Health;

    #[derive(Component)]
    struct Movement;

    #[test]
    fn register_assigns_dense_kinds_once() {
        // Given
        let mut registry = Registry::new();

        // When
        let health = registry.register::<Health>();
        let movement = registry.register::<Movement>();
        let again = registry.register::<Health>();

        // Then
        assert_eq!(health.index(), 0);
        assert_eq!(movement.index(), 1);
        assert_eq!(health, again);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn info_round_trips_type_identity() {
        // Given
        let mut registry = Registry::new();
        let kind = registry.register::<Health>();

        // When
        let info = registry.info(kind).unwrap();

        // Then
        assert_eq!(info.kind(), kind);
        assert_eq!(info.type_id(), TypeId::of::<Health>());
        assert!(info.name().contains("Health"));
        assert_eq!(registry.get::<Health>(), Some(kind));
        assert_eq!(registry.get_by_type_id(TypeId::of::<Health>()), Some(kind));
    }

    #[test]
    fn unregistered_type_has_no_kind() {
        let registry = Registry::new();
        assert_eq!(registry.get::<Health>(), None);
    }
}
