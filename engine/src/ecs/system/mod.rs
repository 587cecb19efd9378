//! The observer boundary.
//!
//! A [`System`] declares the rules for the entities it wants to observe and
//! reacts as entities enter and leave that set. A [`Driver`] owns the
//! system's claim on the shared view for its whole lifetime: it acquires the
//! view on construction (replaying entities that already match) and releases
//! it on drop (replaying the teardown), so a system never misses an entity
//! and never leaks a subscription.
//!
//! What a system does with its view each tick - and when ticks happen - is
//! the application's business; [`Driver::update`] just hands the system its
//! world and its live view.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ecs::entity::Entity;
use crate::ecs::filter::view::Filter;
use crate::ecs::filter::{Builder, FilterHandle, Rules};
use crate::ecs::holder::TrackHandler;
use crate::ecs::world::World;

/// An observer over a filtered slice of the population.
pub trait System: 'static {
    /// Declare the rules for the entities this system observes.
    fn rules(&self, builder: Builder) -> Rules;

    /// An entity entered the observed set.
    fn entity_tracked(&mut self, world: &World, entity: Entity) {
        let _ = (world, entity);
    }

    /// An entity left the observed set.
    fn entity_untracked(&mut self, world: &World, entity: Entity) {
        let _ = (world, entity);
    }

    /// One tick over the live view.
    fn update(&mut self, world: &World, entities: &Filter) {
        let _ = (world, entities);
    }
}

/// A deferred hook delivery: `true` for tracked, `false` for untracked.
type PendingHook = (Entity, bool);

/// Owns a [`System`]'s claim on its shared view.
///
/// Hooks are delivered synchronously. The one exception is a notification
/// caused by the system's own `update` (it holds the exclusive borrow on the
/// system while it runs): such notifications are queued and delivered, in
/// order, as soon as `update` returns.
pub struct Driver<S: System> {
    world: World,
    system: Rc<RefCell<S>>,
    pending: Rc<RefCell<Vec<PendingHook>>>,
    handle: Option<FilterHandle>,
}

impl<S: System> Driver<S> {
    /// Wrap a system and acquire its view, replaying current members into
    /// `entity_tracked`.
    pub fn new(world: &World, system: S) -> Self {
        let system = Rc::new(RefCell::new(system));
        let pending: Rc<RefCell<Vec<PendingHook>>> = Rc::new(RefCell::new(Vec::new()));
        let rules = system.borrow().rules(world.rules());

        let on_tracked: TrackHandler = {
            let world = world.clone();
            let system = Rc::clone(&system);
            let pending = Rc::clone(&pending);
            Rc::new(move |entity| match system.try_borrow_mut() {
                Ok(mut system) => system.entity_tracked(&world, entity),
                Err(_) => pending.borrow_mut().push((entity, true)),
            })
        };
        let on_untracked: TrackHandler = {
            let world = world.clone();
            let system = Rc::clone(&system);
            let pending = Rc::clone(&pending);
            Rc::new(move |entity| match system.try_borrow_mut() {
                Ok(mut system) => system.entity_untracked(&world, entity),
                Err(_) => pending.borrow_mut().push((entity, false)),
            })
        };

        let handle = world.acquire_filter(rules, Some(on_tracked), Some(on_untracked), true);
        Self {
            world: world.clone(),
            system,
            pending,
            handle: Some(handle),
        }
    }

    /// The live view this system observes.
    pub fn entities(&self) -> &Filter {
        self.handle
            .as_ref()
            .expect("driver handle only vacated on drop")
    }

    /// The world this system observes.
    #[inline]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Tick the system once, then flush any hooks its own mutations caused.
    pub fn update(&mut self) {
        if let Some(handle) = &self.handle {
            self.system.borrow_mut().update(&self.world, handle);
        }
        self.flush_pending();
    }

    fn flush_pending(&self) {
        loop {
            let next = {
                let mut pending = self.pending.borrow_mut();
                if pending.is_empty() {
                    None
                } else {
                    Some(pending.remove(0))
                }
            };
            let Some((entity, tracked)) = next else {
                break;
            };
            let mut system = self.system.borrow_mut();
            if tracked {
                system.entity_tracked(&self.world, entity);
            } else {
                system.entity_untracked(&self.world, entity);
            }
        }
    }
}

impl<S: System> Drop for Driver<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.world.release_filter(handle, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use reflex_macros::Component;

    use crate::ecs::filter::TagMatch;

    #[derive(Component)]
    struct Movement;

    struct Recorder {
        tracked: Vec<Entity>,
        untracked: Vec<Entity>,
        ticks: u32,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                tracked: Vec::new(),
                untracked: Vec::new(),
                ticks: 0,
            }
        }
    }

    impl System for Recorder {
        fn rules(&self, builder: Builder) -> Rules {
            builder
                .tag("mover", TagMatch::Any)
                .component::<Movement>(true)
                .build()
        }

        fn entity_tracked(&mut self, _world: &World, entity: Entity) {
            self.tracked.push(entity);
        }

        fn entity_untracked(&mut self, _world: &World, entity: Entity) {
            self.untracked.push(entity);
        }

        fn update(&mut self, world: &World, entities: &Filter) {
            self.ticks += 1;
            entities.for_each(None, None, |e| {
                let _ = world.has_tag(e, "mover");
            });
        }
    }

    fn mover(world: &World) -> Entity {
        let entity = world.spawn();
        world.add_tag(entity, "mover");
        world.attach(entity, Movement).unwrap();
        entity
    }

    #[test]
    fn driver_replays_existing_members_on_construction() {
        // Given
        let world = World::new();
        let existing = mover(&world);

        // When
        let driver = Driver::new(&world, Recorder::new());

        // Then
        assert_eq!(driver.system.borrow().tracked, vec![existing]);
        assert!(driver.entities().contains(existing));
    }

    #[test]
    fn hooks_fire_as_membership_changes() {
        // Given
        let world = World::new();
        let mut driver = Driver::new(&world, Recorder::new());

        // When
        let entity = mover(&world);
        driver.update();
        world.remove_tag(entity, "mover");

        // Then
        let system = driver.system.borrow();
        assert_eq!(system.tracked, vec![entity]);
        assert_eq!(system.untracked, vec![entity]);
        assert_eq!(system.ticks, 1);
    }

    #[test]
    fn drop_releases_the_claim_with_teardown_replay() {
        // Given
        let world = World::new();
        let entity = mover(&world);
        let rules = world
            .rules()
            .tag("mover", TagMatch::Any)
            .component::<Movement>(true)
            .build();

        let driver = Driver::new(&world, Recorder::new());
        let system = Rc::clone(&driver.system);
        assert_eq!(world.filter_refs(&rules), 1);

        // When
        drop(driver);

        // Then - the teardown replayed the member and the claim is gone
        assert_eq!(system.borrow().untracked, vec![entity]);
        assert_eq!(world.filter_refs(&rules), 0);
    }

    struct SelfMutating {
        world_handle: World,
        spawned: Option<Entity>,
        tracked: Vec<Entity>,
    }

    impl System for SelfMutating {
        fn rules(&self, builder: Builder) -> Rules {
            builder.tag("mover", TagMatch::Any).build()
        }

        fn entity_tracked(&mut self, _world: &World, entity: Entity) {
            self.tracked.push(entity);
        }

        fn update(&mut self, _world: &World, _entities: &Filter) {
            // Mutating from inside update makes the view notify while this
            // system is exclusively borrowed; delivery is deferred until the
            // tick ends.
            let entity = self.world_handle.spawn();
            self.world_handle.add_tag(entity, "mover");
            self.spawned = Some(entity);
        }
    }

    #[test]
    fn hooks_from_inside_update_are_delivered_after_the_tick() {
        // Given
        let world = World::new();
        let mut driver = Driver::new(
            &world,
            SelfMutating {
                world_handle: world.clone(),
                spawned: None,
                tracked: Vec::new(),
            },
        );

        // When
        driver.update();

        // Then
        let system = driver.system.borrow();
        let spawned = system.spawned.unwrap();
        assert_eq!(system.tracked, vec![spawned]);
        assert!(driver.entities().contains(spawned));
    }
}
