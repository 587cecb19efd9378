//! Two observers sharing one filtered view over a handful of patrolling
//! drones. Run with `RUST_LOG=info cargo run --example patrol`.

use log::info;

use reflex_engine::ecs::{Builder, Driver, Entity, Filter, Rules, System, TagMatch, World};
use reflex_macros::Component;

const PATROL_TAG: &str = "patrolling";

#[derive(Component)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Component)]
struct Patrol {
    speed: f32,
}

/// Moves every patrolling drone a step along its route.
struct PatrolSystem;

impl System for PatrolSystem {
    fn rules(&self, builder: Builder) -> Rules {
        builder
            .tag(PATROL_TAG, TagMatch::Any)
            .component::<Position>(true)
            .component::<Patrol>(true)
            .build()
    }

    fn entity_tracked(&mut self, _world: &World, entity: Entity) {
        info!("patrol: drone {entity:?} started patrolling");
    }

    fn entity_untracked(&mut self, _world: &World, entity: Entity) {
        info!("patrol: drone {entity:?} stopped patrolling");
    }

    fn update(&mut self, world: &World, entities: &Filter) {
        entities.for_each(None, None, |entity| {
            let Some(position) = world.component::<Position>(entity) else {
                return;
            };
            let Some(patrol) = world.component::<Patrol>(entity) else {
                return;
            };
            let speed = patrol.borrow().speed;
            let mut position = position.borrow_mut();
            position.x += speed;
            info!(
                "patrol: drone {entity:?} now at ({:.1}, {:.1})",
                position.x, position.y
            );
        });
    }
}

/// Counts the same view the patrol system observes; acquiring the same rules
/// shares the underlying filter rather than rebuilding it.
struct HeadcountSystem;

impl System for HeadcountSystem {
    fn rules(&self, builder: Builder) -> Rules {
        builder
            .tag(PATROL_TAG, TagMatch::Any)
            .component::<Position>(true)
            .component::<Patrol>(true)
            .build()
    }

    fn update(&mut self, _world: &World, entities: &Filter) {
        info!("headcount: {} drone(s) on patrol", entities.len());
    }
}

fn spawn_drone(world: &World, x: f32, speed: f32) -> Entity {
    let drone = world.spawn();
    world.add_tag(drone, PATROL_TAG);
    world
        .attach(drone, Position { x, y: 0.0 })
        .expect("drone is alive");
    world.attach(drone, Patrol { speed }).expect("drone is alive");
    drone
}

fn main() {
    env_logger::init();

    let world = World::new();
    let mut patrol = Driver::new(&world, PatrolSystem);
    let mut headcount = Driver::new(&world, HeadcountSystem);

    let scout = spawn_drone(&world, 0.0, 1.0);
    let sentry = spawn_drone(&world, 10.0, 0.5);

    patrol.update();
    headcount.update();

    // The sentry powers its patrol module down; the shared view drops it.
    world.set_enabled::<Patrol>(sentry, false);
    patrol.update();
    headcount.update();

    // Back online - it re-enters the view.
    world.set_enabled::<Patrol>(sentry, true);
    patrol.update();

    // The scout is destroyed mid-flight.
    world.despawn(scout);
    headcount.update();

    drop(patrol);
    drop(headcount);
    world.clean();
}
