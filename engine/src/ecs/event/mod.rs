//! Change notification plumbing.
//!
//! This module provides [`Signal`], the synchronous multicast primitive every
//! notification in the engine flows through, and the two event vocabularies:
//!
//! - [`EntityEvent`]: raised on one entity's own signal when its tags,
//!   components, or lifecycle change.
//! - [`TrackerEvent`]: the registry-wide stream. The tracker re-publishes
//!   every registered entity's events here, plus its own membership events,
//!   so a consumer watching the whole population subscribes exactly once.
//!
//! # Delivery model
//!
//! Delivery is fully synchronous: an emission invokes every subscriber before
//! the emitting call returns, with no batching or frame deferral. Emission
//! snapshots the subscriber list first, so a callback may subscribe,
//! unsubscribe, or emit again without invalidating the in-progress delivery.

pub mod signal;

use std::fmt;

use crate::ecs::component::Kind;
use crate::ecs::entity::Entity;

pub use signal::{Signal, SubscriberKey};

/// Marker trait for event types.
///
/// Events must be:
/// - `'static`: No borrowed data
/// - `Clone`: Events may be re-published onto another stream
/// - `Debug`: For diagnostics and logging
pub trait Event: fmt::Debug + Clone + 'static {}

/// A change on one entity, raised on that entity's own signal.
#[derive(Debug, Clone)]
pub enum EntityEvent {
    /// The entity finished construction and registration.
    Created(Entity),
    /// The entity is about to be destroyed.
    Destroyed(Entity),
    /// A tag was added to the entity.
    TagAdded(Entity, String),
    /// A tag was removed from the entity.
    TagRemoved(Entity, String),
    /// A component of the given kind was attached.
    ComponentAdded(Entity, Kind),
    /// A component of the given kind was detached.
    ComponentRemoved(Entity, Kind),
    /// A component of the given kind became enabled.
    ComponentEnabled(Entity, Kind),
    /// A component of the given kind became disabled.
    ComponentDisabled(Entity, Kind),
}

impl EntityEvent {
    /// The entity this event is about.
    pub fn entity(&self) -> Entity {
        match self {
            Self::Created(e)
            | Self::Destroyed(e)
            | Self::TagAdded(e, _)
            | Self::TagRemoved(e, _)
            | Self::ComponentAdded(e, _)
            | Self::ComponentRemoved(e, _)
            | Self::ComponentEnabled(e, _)
            | Self::ComponentDisabled(e, _) => *e,
        }
    }
}

impl Event for EntityEvent {}

/// A registry-wide event. Filtered views consume only this stream; no view
/// ever subscribes to an individual entity.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// An entity entered the registry.
    Tracked(Entity),
    /// An entity left the registry.
    Untracked(Entity),
    /// A registered entity's own event, re-published.
    Entity(EntityEvent),
}

impl Event for TrackerEvent {}
