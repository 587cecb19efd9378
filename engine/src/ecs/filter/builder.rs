//! Fluent accumulation of match rules.

use std::any::TypeId;
use std::cell::RefCell;
use std::rc::Rc;

use crate::ecs::component::{Component, registry::Registry};
use crate::ecs::error::Error;
use crate::ecs::filter::rules::{ComponentRule, Rules, TagMatch, TagRule};

/// A fluent accumulator producing a [`Rules`] value.
///
/// Duplicate conditions and blank tags are silently ignored. Typed component
/// conditions are statically valid; dynamic ones (by `TypeId`) must name a
/// registered component kind and fail loudly otherwise.
///
/// [`Builder::build`] snapshots the accumulated conditions; the builder stays
/// usable and later additions do not affect rules already built.
pub struct Builder {
    kinds: Rc<RefCell<Registry>>,
    tags: Vec<TagRule>,
    components: Vec<ComponentRule>,
}

impl Builder {
    pub(crate) fn new(kinds: Rc<RefCell<Registry>>) -> Self {
        Self {
            kinds,
            tags: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Start from the conditions of an existing rules value.
    pub(crate) fn seeded(kinds: Rc<RefCell<Registry>>, rules: &Rules) -> Self {
        Self {
            kinds,
            tags: rules.tag_rules().to_vec(),
            components: rules.component_rules().to_vec(),
        }
    }

    /// Add one tag condition under the given mode.
    pub fn tag(mut self, tag: impl Into<String>, mode: TagMatch) -> Self {
        if let Some(rule) = TagRule::new(tag, mode)
            && !self.tags.contains(&rule)
        {
            self.tags.push(rule);
        }
        self
    }

    /// Add a group of tag conditions under the given mode.
    pub fn tags<I, S>(mut self, tags: I, mode: TagMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self = self.tag(tag, mode);
        }
        self
    }

    /// Add a component-presence condition for `C`, registering the kind if
    /// this world has not seen it yet.
    pub fn component<C: Component>(mut self, must_be_enabled: bool) -> Self {
        let kind = self.kinds.borrow_mut().register::<C>();
        let rule = ComponentRule::new(kind, must_be_enabled);
        if !self.components.contains(&rule) {
            self.components.push(rule);
        }
        self
    }

    /// Add a component-presence condition for a dynamically named type. The
    /// `TypeId` must already denote a registered component kind.
    pub fn component_by_type_id(
        mut self,
        type_id: TypeId,
        must_be_enabled: bool,
    ) -> Result<Self, Error> {
        let Some(kind) = self.kinds.borrow().get_by_type_id(type_id) else {
            return Err(Error::UnknownKind(type_id));
        };
        let rule = ComponentRule::new(kind, must_be_enabled);
        if !self.components.contains(&rule) {
            self.components.push(rule);
        }
        Ok(self)
    }

    /// Snapshot the accumulated conditions into an immutable rules value.
    pub fn build(&self) -> Rules {
        Rules::from_conditions(self.tags.clone(), self.components.clone())
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

    fn kinds() -> Rc<RefCell<Registry>> {
        Rc::new(RefCell::new(Registry::new()))
    }

    #[test]
    fn duplicate_conditions_collapse() {
        // Given
        let builder = Builder::new(kinds())
            .tag("enemy", TagMatch::Any)
            .tag("enemy", TagMatch::Any)
            .component::<Health>(true)
            .component::<Health>(true);

        // When
        let rules = builder.build();

        // Then
        assert_eq!(rules.tag_rules().len(), 1);
        assert_eq!(rules.component_rules().len(), 1);
    }

    #[test]
    fn blank_tag_is_silently_dropped() {
        let rules = Builder::new(kinds()).tag("", TagMatch::All).build();
        assert!(rules.is_unconditional());
    }

    #[test]
    fn dynamic_condition_requires_a_registered_kind() {
        // Given
        let kinds = kinds();
        kinds.borrow_mut().register::<Health>();

        // When
        let known =
            Builder::new(Rc::clone(&kinds)).component_by_type_id(TypeId::of::<Health>(), false);
        let unknown =
            Builder::new(Rc::clone(&kinds)).component_by_type_id(TypeId::of::<Movement>(), false);

        // Then
        assert!(known.is_ok());
        assert_eq!(
            unknown.err(),
            Some(Error::UnknownKind(TypeId::of::<Movement>()))
        );
    }

    #[test]
    fn build_is_a_snapshot() {
        // Given
        let builder = Builder::new(kinds()).tag("enemy", TagMatch::Any);
        let first = builder.build();

        // When - the builder keeps accumulating afterwards
        let second = builder.tag("boss", TagMatch::Any).build();

        // Then
        assert_eq!(first.tag_rules().len(), 1);
        assert_eq!(second.tag_rules().len(), 2);
        assert_ne!(first, second);
    }

    #[test]
    fn seeded_builder_extends_existing_rules() {
        // Given
        let kinds = kinds();
        let base = Builder::new(Rc::clone(&kinds))
            .tag("enemy", TagMatch::Any)
            .build();

        // When
        let extended = Builder::seeded(kinds, &base)
            .component::<Health>(true)
            .build();

        // Then
        assert_eq!(extended.tag_rules(), base.tag_rules());
        assert_eq!(extended.component_rules().len(), 1);
    }
}
