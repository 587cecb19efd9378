use std::any::TypeId;

use thiserror::Error;

use crate::ecs::entity::Entity;

/// Construction-time misuse of the engine's public surface.
///
/// Runtime inconsistencies during live notification are absorbed locally
/// (logged and recovered) instead of surfacing here; the notify pipeline
/// never throws.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A dynamic component condition named a type that is not a registered
    /// component kind.
    #[error("no registered component kind for type {0:?}")]
    UnknownKind(TypeId),

    /// An operation that must report failure was handed a handle to an
    /// entity that is no longer (or never was) alive.
    #[error("entity {0:?} is not alive")]
    StaleEntity(Entity),
}
