//! End-to-end coverage of the mutation -> notification -> view pipeline.

use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use reflex_engine::ecs::{Entity, Rules, TagMatch, World};
use reflex_macros::Component;

#[derive(Component)]
struct Health;

#[derive(Component)]
struct Targeting {
    target: Option<Entity>,
}

#[derive(Component)]
struct Movement;

/// A component standing in for the `Movement` kind without being it.
struct Hovering;

impl reflex_engine::ecs::Component for Hovering {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn provides(&self, type_id: TypeId) -> bool {
        type_id == TypeId::of::<Hovering>() || type_id == TypeId::of::<Movement>()
    }
}

fn counting_handler(counter: &Rc<Cell<u32>>) -> reflex_engine::ecs::TrackHandler {
    let counter = Rc::clone(counter);
    Rc::new(move |_| counter.set(counter.get() + 1))
}

#[test]
fn enabling_a_component_pulls_the_entity_into_the_view() {
    // Given - an enemy whose Health starts disabled
    let world = World::new();
    let enemy = world.spawn();
    world.add_tag(enemy, "enemy");
    world.attach(enemy, Health).unwrap();
    world.set_enabled::<Health>(enemy, false);

    let rules = world
        .rules()
        .tag("enemy", TagMatch::Any)
        .component::<Health>(true)
        .build();

    let tracked = Rc::new(Cell::new(0u32));
    let handle = world.acquire_filter(rules, Some(counting_handler(&tracked)), None, true);

    // Then - the disabled component keeps the enemy out
    assert!(!handle.contains(enemy));
    assert_eq!(tracked.get(), 0);

    // When
    world.set_enabled::<Health>(enemy, true);

    // Then - exactly one tracked notification
    assert!(handle.contains(enemy));
    assert_eq!(tracked.get(), 1);

    // And toggling twice more does not double-fire
    world.set_enabled::<Health>(enemy, true);
    assert_eq!(tracked.get(), 1);

    world.release_filter(handle, false);
}

#[test]
fn two_observers_with_equal_rules_see_one_view() {
    // Given
    let world = World::new();
    let player = world.spawn();
    world.add_tag(player, "player");
    world.add_tag(player, "alive");

    // When - two observers build the same rule independently
    let a = world.acquire_filter(Rules::all_of(["player", "alive"]), None, None, true);
    let b = world.acquire_filter(Rules::all_of(["alive", "player"]), None, None, true);

    // Then - same view, same membership
    assert!(std::ptr::eq(a.view(), b.view()));
    assert_eq!(a.all(), b.all());
    assert_eq!(a.all(), vec![player]);

    world.release_filter(a, false);
    world.release_filter(b, false);
}

#[test]
fn destroying_a_tracked_entity_notifies_once_and_shrinks_the_registry() {
    // Given
    let world = World::new();
    let enemy = world.spawn();
    world.add_tag(enemy, "enemy");
    let bystander = world.spawn();
    world.add_tag(bystander, "enemy");

    let untracked = Rc::new(Cell::new(0u32));
    let handle = world.acquire_filter(
        Rules::any_of(["enemy"]),
        None,
        Some(counting_handler(&untracked)),
        true,
    );
    assert_eq!(world.entities().len(), 2);

    // When
    world.despawn(enemy);

    // Then
    assert_eq!(untracked.get(), 1);
    assert!(!handle.contains(enemy));
    assert!(handle.contains(bystander));
    assert_eq!(world.entities().len(), 1);

    world.release_filter(handle, false);
}

#[test]
fn replay_delivers_existing_members_in_membership_order_before_returning() {
    // Given - three matching entities tracked in spawn order
    let world = World::new();
    let entities: Vec<Entity> = (0..3)
        .map(|_| {
            let e = world.spawn();
            world.add_tag(e, "enemy");
            e
        })
        .collect();

    // When
    let replayed = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&replayed);
    let handle = world.acquire_filter(
        Rules::any_of(["enemy"]),
        Some(Rc::new(move |e| sink.borrow_mut().push(e))),
        None,
        true,
    );

    // Then - the replay already happened, once per member, in order
    assert_eq!(*replayed.borrow(), entities);

    // And without replay a second observer hears nothing
    let silent = Rc::new(Cell::new(0u32));
    let second = world.acquire_filter(
        Rules::any_of(["enemy"]),
        Some(counting_handler(&silent)),
        None,
        false,
    );
    assert_eq!(silent.get(), 0);

    world.release_filter(handle, false);
    world.release_filter(second, false);
}

#[test]
fn release_replay_is_the_symmetric_teardown() {
    // Given
    let world = World::new();
    let enemy = world.spawn();
    world.add_tag(enemy, "enemy");

    let untracked = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&untracked);
    let handle = world.acquire_filter(
        Rules::any_of(["enemy"]),
        None,
        Some(Rc::new(move |e| sink.borrow_mut().push(e))),
        true,
    );

    // When
    world.release_filter(handle, true);

    // Then - one untracked notification per member still in the view
    assert_eq!(*untracked.borrow(), vec![enemy]);
}

#[test]
fn callback_driven_mutation_propagates_while_the_first_mutation_unwinds() {
    // Given - a handler that reacts to a new target by arming the entity
    let world = World::new();

    let armed_rules = world
        .rules()
        .tag("armed", TagMatch::Any)
        .component::<Targeting>(true)
        .build();
    let armed_seen = Rc::new(Cell::new(0u32));
    let armed = world.acquire_filter(
        armed_rules,
        Some(counting_handler(&armed_seen)),
        None,
        true,
    );

    let w = world.clone();
    let targeting_rules = world.rules().component::<Targeting>(true).build();
    let arming = world.acquire_filter(
        targeting_rules,
        Some(Rc::new(move |entity| {
            // Reentrant mutation: runs inside the attach that tracked us.
            w.add_tag(entity, "armed");
        })),
        None,
        true,
    );

    // When
    let hunter = world.spawn();
    world.attach(hunter, Targeting { target: None }).unwrap();

    // Then - the nested tag mutation already reached the other view
    assert!(world.has_tag(hunter, "armed"));
    assert!(armed.contains(hunter));
    assert_eq!(armed_seen.get(), 1);

    world.release_filter(armed, false);
    world.release_filter(arming, false);
}

#[test]
fn a_widened_capability_claim_satisfies_the_base_kind() {
    // Given - a rule asking for Movement, an entity hovering instead
    let world = World::new();
    let rules = world.rules().component::<Movement>(false).build();

    let hoverer = world.spawn();
    world.attach(hoverer, Hovering).unwrap();

    let walker = world.spawn();
    world.attach(walker, Movement).unwrap();

    // When
    let handle = world.acquire_filter(rules, None, None, true);

    // Then - both satisfy the kind, only the walker is the exact type
    assert!(handle.contains(hoverer));
    assert!(handle.contains(walker));
    assert!(world.component::<Movement>(hoverer).is_none());
    assert!(world.component::<Movement>(walker).is_some());

    world.release_filter(handle, false);
}

#[test]
fn events_after_release_never_reach_the_old_view() {
    // Given
    let world = World::new();
    let rules = Rules::any_of(["enemy"]);

    let tracked = Rc::new(Cell::new(0u32));
    let handle = world.acquire_filter(rules.clone(), Some(counting_handler(&tracked)), None, true);
    world.release_filter(handle, false);

    // When - mutations that would have matched
    let enemy = world.spawn();
    world.add_tag(enemy, "enemy");

    // Then
    assert_eq!(tracked.get(), 0);
    assert_eq!(world.filter_refs(&rules), 0);
}

#[test]
fn component_lookup_reads_and_writes_through_the_handle() {
    // Given
    let world = World::new();
    let hunter = world.spawn();
    let prey = world.spawn();
    world.attach(hunter, Targeting { target: None }).unwrap();

    // When
    let targeting = world.component::<Targeting>(hunter).unwrap();
    targeting.borrow_mut().target = Some(prey);

    // Then - a second lookup sees the same value
    let again = world.component::<Targeting>(hunter).unwrap();
    assert_eq!(again.borrow().target, Some(prey));
}
