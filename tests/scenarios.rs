//! End-to-end scenarios exercising the storage-and-query core as an external
//! caller would: through `World` and `QueryDescription` alone.

use archetype_ecs::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position(f32, f32);
#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity(f32, f32);
#[derive(Debug, Clone, Copy, PartialEq)]
struct A;
#[derive(Debug, Clone, Copy, PartialEq)]
struct B;
#[derive(Debug, Clone, Copy, PartialEq)]
struct C;

#[test]
fn query_and_bulk_update_touches_every_matching_entity_once() {
    let mut world = World::new();
    let mut entities = Vec::new();
    for i in 0..3 {
        let e = world.create().unwrap();
        world.set(e, Position(i as f32, 0.0)).unwrap();
        world.set(e, Velocity(1.0, 2.0)).unwrap();
        entities.push(e);
    }

    let desc = QueryDescription::new()
        .with_all(&[component::register::<Position>(), component::register::<Velocity>()]);
    let query_idx = world.query(&desc).unwrap();

    let rows: Vec<_> = world.iter_entities(query_idx).map(|r| r.entity).collect();
    assert_eq!(rows.len(), 3);

    for e in &entities {
        let delta = *world.get::<Velocity>(*e).unwrap();
        let pos = world.get_mut::<Position>(*e).unwrap();
        pos.0 += delta.0;
        pos.1 += delta.1;
    }

    for (i, e) in entities.iter().enumerate() {
        assert_eq!(*world.get::<Position>(*e).unwrap(), Position(i as f32 + 1.0, 2.0));
    }
}

#[test]
fn adding_a_component_preserves_prior_values_and_moves_to_one_archetype() {
    let mut world = World::new();
    let e = world.create().unwrap();
    world.set(e, Position(3.0, 4.0)).unwrap();

    world.set(e, Velocity(1.0, 2.0)).unwrap();

    assert_eq!(*world.get::<Position>(e).unwrap(), Position(3.0, 4.0));
    assert_eq!(*world.get::<Velocity>(e).unwrap(), Velocity(1.0, 2.0));

    let exclusive = QueryDescription::new()
        .with_exclusive(&[component::register::<Position>(), component::register::<Velocity>()]);
    let query_idx = world.query(&exclusive).unwrap();
    let rows: Vec<_> = world.iter_entities(query_idx).map(|r| r.entity).collect();
    assert_eq!(rows, vec![e], "entity lives in exactly one archetype, the {{Position, Velocity}} one");
}

#[test]
fn all_any_exclusive_predicates_over_three_populations() {
    let mut world = World::new();

    for _ in 0..100 {
        let e = world.create().unwrap();
        world.set(e, A).unwrap();
    }
    for _ in 0..100 {
        let e = world.create().unwrap();
        world.set(e, A).unwrap();
        world.set(e, B).unwrap();
    }
    for _ in 0..100 {
        let e = world.create().unwrap();
        world.set(e, B).unwrap();
    }

    let a_not_b = QueryDescription::new()
        .with_all(&[component::register::<A>()])
        .with_none(&[component::register::<B>()]);
    let idx = world.query(&a_not_b).unwrap();
    let count: usize = world.query_matches(idx).iter().map(|&a| world.archetype(a).len()).sum();
    assert_eq!(count, 100);

    let a_or_b = QueryDescription::new().with_any(&[component::register::<A>(), component::register::<B>()]);
    let idx = world.query(&a_or_b).unwrap();
    let count: usize = world.query_matches(idx).iter().map(|&a| world.archetype(a).len()).sum();
    assert_eq!(count, 300);

    let exactly_a = QueryDescription::new().with_exclusive(&[component::register::<A>()]);
    let idx = world.query(&exactly_a).unwrap();
    let count: usize = world.query_matches(idx).iter().map(|&a| world.archetype(a).len()).sum();
    assert_eq!(count, 100);
}

#[test]
fn recreated_entity_gets_a_new_version_and_old_handle_is_stale() {
    let mut world = World::new();
    let e = world.create().unwrap();
    world.set(e, A).unwrap();
    world.destroy(e).unwrap();

    let e2 = world.create().unwrap();
    world.set(e2, A).unwrap();

    assert_eq!(e.id, e2.id);
    assert_ne!(e.version, e2.version);
    assert_eq!(world.get::<A>(e).unwrap_err(), EcsError::StaleHandle(e));
}

#[test]
fn filling_past_one_chunk_visits_every_row_in_archetype_major_order() {
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Wide([u8; 16]);

    let mut world = World::new();
    let ty = component::register::<Wide>();
    let stride_capacity = archetype_ecs::archetype::DEFAULT_CHUNK_BYTES / std::mem::size_of::<Wide>();

    let mut entities = Vec::with_capacity(stride_capacity + 1);
    for i in 0..(stride_capacity + 1) {
        let e = world.create().unwrap();
        world.set(e, Wide([(i % 256) as u8; 16])).unwrap();
        entities.push(e);
    }

    let desc = QueryDescription::new().with_all(&[ty]);
    let query_idx = world.query(&desc).unwrap();

    let visited: Vec<_> = world.iter_entities(query_idx).map(|r| r.entity).collect();
    assert_eq!(visited.len(), stride_capacity + 1);

    let archetype_idx = world.query_matches(query_idx)[0];
    assert!(world.archetype(archetype_idx).chunks().len() >= 2);
}

#[test]
fn query_built_before_a_new_matching_archetype_picks_it_up() {
    let mut world = World::new();
    let desc = QueryDescription::new().with_all(&[component::register::<A>()]);
    let query_idx = world.query(&desc).unwrap();
    assert_eq!(world.query_matches(query_idx).len(), 0);

    let e = world.create().unwrap();
    world.set(e, A).unwrap();
    world.set(e, C).unwrap();

    assert_eq!(world.query_matches(query_idx).len(), 1);
    let rows: Vec<_> = world.iter_entities(query_idx).map(|r| r.entity).collect();
    assert_eq!(rows, vec![e]);
}
