pub mod component;
pub mod entity;
pub mod error;
pub mod event;
pub mod filter;
pub mod holder;
pub mod system;
pub mod tracker;
pub mod world;

pub use component::{Component, ComponentRef, Kind};
pub use entity::Entity;
pub use error::Error;
pub use event::{EntityEvent, TrackerEvent};
pub use filter::{Builder, Filter, FilterHandle, Rules, TagMatch};
pub use holder::{Holder, TrackHandler};
pub use system::{Driver, System};
pub use tracker::Tracker;
pub use world::World;
