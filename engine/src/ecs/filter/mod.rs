//! Match rules and cached filtered views.
//!
//! A [`Rules`] value is an immutable predicate over an entity: a set of tag
//! conditions and a set of component-presence conditions. A [`Filter`] is a
//! view over the population that is kept continuously consistent with one
//! `Rules` value by watching the registry-wide event stream.
//!
//! Views are shared: acquiring a filter for rules structurally equal to a
//! live view's rules joins that view and bumps its reference count, so any
//! number of observers querying the same combination pay for one incremental
//! computation and one event subscription. The last release tears the view
//! down.

pub mod builder;
pub mod rules;
pub mod view;

pub(crate) mod cache;

pub use builder::Builder;
pub use rules::{ComponentRule, Rules, TagMatch, TagRule};
pub use view::{Filter, FilterHandle};
