//! Typed behavior components.
//!
//! A [`Component`] is a `'static` behavior module attached to exactly one
//! entity for as long as it stays attached. Components are looked up two
//! ways:
//!
//! - **By kind** for rule matching: every attached component answers
//!   [`Component::provides`] for a requested kind's `TypeId`. The default
//!   answers only the component's own type; an implementation may widen it to
//!   claim compatibility with another kind it can stand in for.
//! - **By concrete type** for direct access: [`ComponentRef`] hands the
//!   caller a shared handle to the exact component value.
//!
//! Implement the trait with `#[derive(Component)]` from `reflex_macros`.

pub mod registry;

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

pub use registry::{Kind, Registry};

/// A typed behavior module attachable to an entity.
pub trait Component: Any {
    /// Borrow self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrow self as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Whether this component satisfies a condition asking for the component
    /// kind identified by `type_id`. Defaults to the component's own type;
    /// override to claim compatibility with a kind this component can stand
    /// in for.
    fn provides(&self, type_id: std::any::TypeId) -> bool {
        self.as_any().type_id() == type_id
    }
}

/// A shared handle to one component value on one entity.
///
/// The handle stays valid while the caller holds it, even if the component is
/// detached from its entity in the meantime; a detached component simply no
/// longer participates in rule matching.
pub struct ComponentRef<C: Component> {
    cell: Rc<RefCell<C>>,
}

impl<C: Component> ComponentRef<C> {
    pub(crate) fn new(cell: Rc<RefCell<C>>) -> Self {
        Self { cell }
    }

    /// Borrow the component value.
    ///
    /// # Panics
    /// Panics if the component is currently borrowed mutably.
    #[inline]
    pub fn borrow(&self) -> Ref<'_, C> {
        self.cell.borrow()
    }

    /// Mutably borrow the component value.
    ///
    /// # Panics
    /// Panics if the component is currently borrowed.
    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, C> {
        self.cell.borrow_mut()
    }
}

impl<C: Component> Clone for ComponentRef<C> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}
