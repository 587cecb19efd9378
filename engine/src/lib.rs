//! A reactive entity filtering engine.
//!
//! Entities carry string tags and typed behavior components. Observers build
//! immutable match rules over those, acquire cached filtered views that stay
//! consistent with every mutation, and get notified synchronously as entities
//! enter and leave the view. Views with equal rules are shared and
//! reference-counted across observers.

// Allow the derive macros to reference `::reflex_engine::...` paths from inside
// the crate itself (see the macros crate for the companion comment).
extern crate self as reflex_engine;

pub mod ecs;
