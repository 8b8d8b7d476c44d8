// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! World: the entity table, archetype index, and query cache.
//!
//! The single external entry point to the storage core. Owns every
//! Archetype; orchestrates structural changes (entity create/destroy,
//! component add/remove) that move rows between archetypes.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

#[cfg(feature = "profiling")]
use tracing::trace;

use crate::archetype::Archetype;
use crate::component::{self, Component, ComponentType};
use crate::entity::{Entity, EntityLocation, Slot};
use crate::error::{EcsError, Result};
use crate::query::{Query, QueryDescription};
use crate::signature::Signature;

/// No-op lifecycle callbacks the core invokes but never defines handlers
/// for. External layers (event dispatch, change tracking, networking)
/// implement this trait and install it via `World::set_hooks`.
pub trait Hooks {
    fn on_create(&mut self, _entity: Entity) {}
    fn on_set(&mut self, _entity: Entity, _component: ComponentType) {}
    fn on_remove(&mut self, _entity: Entity, _component: ComponentType) {}
    fn on_destroy(&mut self, _entity: Entity) {}
}

struct NoopHooks;
impl Hooks for NoopHooks {}

/// Central entity/archetype/query store.
pub struct World {
    slots: Vec<Slot>,
    free_ids: Vec<u32>,
    archetypes: Vec<Archetype>,
    /// Signature hash -> candidate archetype indices (collision list, since
    /// the hash alone does not guarantee uniqueness).
    signature_index: FxHashMap<u64, SmallVec<[usize; 4]>>,
    queries: Vec<Query>,
    query_index: FxHashMap<u64, usize>,
    hooks: Box<dyn Hooks>,
}

impl World {
    /// Create a new, empty world. Bootstraps the zero-component archetype at
    /// index 0.
    pub fn new() -> Self {
        let mut world = Self {
            slots: Vec::new(),
            free_ids: Vec::new(),
            archetypes: Vec::new(),
            signature_index: FxHashMap::default(),
            queries: Vec::new(),
            query_index: FxHashMap::default(),
            hooks: Box::new(NoopHooks),
        };
        world.get_or_create_archetype(Signature::empty());
        world
    }

    /// Install lifecycle hooks. Replaces any previously installed hooks.
    pub fn set_hooks(&mut self, hooks: Box<dyn Hooks>) {
        self.hooks = hooks;
    }

    // ---- entity lifecycle ----------------------------------------------

    /// Create a new entity with no components, in the empty archetype.
    pub fn create(&mut self) -> Result<Entity> {
        let archetype_idx = self.get_or_create_archetype(Signature::empty());
        // Mint the slot (and surface `CapacityExceeded`) before touching the
        // archetype, so a failed mint never leaves a phantom row behind.
        let entity = self.alloc_slot(EntityLocation {
            archetype_idx,
            chunk_idx: 0,
            row: 0,
        })?;
        let (chunk_idx, row) = self.archetypes[archetype_idx].add(entity);
        self.fixup_location(entity, archetype_idx, chunk_idx, row);

        #[cfg(feature = "profiling")]
        trace!(entity_id = entity.id, version = entity.version, "entity created");

        self.hooks.on_create(entity);
        Ok(entity)
    }

    /// Is `entity` alive (its version matches the slot's current version)?
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.id as usize)
            .is_some_and(|slot| slot.occupied && slot.version == entity.version)
    }

    pub(crate) fn location_for_reflection(&self, entity: Entity) -> Result<EntityLocation> {
        self.location(entity)
    }

    fn location(&self, entity: Entity) -> Result<EntityLocation> {
        match self.slots.get(entity.id as usize) {
            Some(slot) if slot.occupied && slot.version == entity.version => Ok(slot.location),
            _ => Err(EcsError::StaleHandle(entity)),
        }
    }

    fn set_location(&mut self, entity: Entity, location: EntityLocation) {
        self.slots[entity.id as usize].location = location;
    }

    fn fixup_location(&mut self, entity: Entity, archetype_idx: usize, chunk_idx: usize, row: usize) {
        if let Some(slot) = self.slots.get_mut(entity.id as usize) {
            slot.location = EntityLocation {
                archetype_idx,
                chunk_idx,
                row,
            };
        }
    }

    /// Destroy `entity`. Its id is recycled and its slot version bumped, so
    /// any held handle with the old version is stale thereafter.
    pub fn destroy(&mut self, entity: Entity) -> Result<()> {
        let location = self.location(entity)?;
        self.hooks.on_destroy(entity);

        let archetype = &mut self.archetypes[location.archetype_idx];
        if let Some(swapped) = archetype.remove(location.chunk_idx, location.row) {
            self.fixup_location(swapped, location.archetype_idx, location.chunk_idx, location.row);
        }

        let slot = &mut self.slots[entity.id as usize];
        slot.occupied = false;
        slot.version = slot.version.wrapping_add(1);
        self.free_ids.push(entity.id);
        Ok(())
    }

    fn alloc_slot(&mut self, location: EntityLocation) -> Result<Entity> {
        if let Some(id) = self.free_ids.pop() {
            let slot = &mut self.slots[id as usize];
            slot.location = location;
            slot.occupied = true;
            return Ok(Entity { id, version: slot.version });
        }

        if self.slots.len() >= u32::MAX as usize {
            return Err(EcsError::CapacityExceeded);
        }

        let id = self.slots.len() as u32;
        self.slots.push(Slot {
            location,
            version: 0,
            occupied: true,
        });
        Ok(Entity { id, version: 0 })
    }

    // ---- component access ------------------------------------------------

    /// Does `entity` carry a component of type `T`?
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        let ty = component::register::<T>();
        match self.location(entity) {
            Ok(location) => self.archetypes[location.archetype_idx]
                .chunk(location.chunk_idx)
                .has(ty.id),
            Err(_) => false,
        }
    }

    /// Immutable access to `entity`'s component of type `T`.
    pub fn get<T: Component>(&self, entity: Entity) -> Result<&T> {
        let ty = component::register::<T>();
        let location = self.location(entity)?;
        let chunk = self.archetypes[location.archetype_idx].chunk(location.chunk_idx);
        if !chunk.has(ty.id) {
            return Err(EcsError::UnknownComponent(ty));
        }
        Ok(unsafe { chunk.get::<T>(ty.id, location.row) })
    }

    /// Mutable access to `entity`'s component of type `T`.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        let ty = component::register::<T>();
        let location = self.location(entity)?;
        let chunk = self.archetypes[location.archetype_idx].chunk_mut(location.chunk_idx);
        if !chunk.has(ty.id) {
            return Err(EcsError::UnknownComponent(ty));
        }
        Ok(unsafe { chunk.get_mut::<T>(ty.id, location.row) })
    }

    /// Set `entity`'s component of type `T`, adding it (a structural change)
    /// if not already present, or overwriting it in place otherwise.
    pub fn set<T: Component>(&mut self, entity: Entity, value: T) -> Result<()> {
        let ty = component::register::<T>();
        let location = self.location(entity)?;
        let has_already = self.archetypes[location.archetype_idx]
            .chunk(location.chunk_idx)
            .has(ty.id);

        if has_already {
            let chunk = self.archetypes[location.archetype_idx].chunk_mut(location.chunk_idx);
            *unsafe { chunk.get_mut::<T>(ty.id, location.row) } = value;
            self.hooks.on_set(entity, ty);
            return Ok(());
        }

        let old_signature = self.archetypes[location.archetype_idx].signature().clone();
        let new_signature = old_signature.with(ty);
        let new_location = self.transition(entity, location, new_signature)?;

        let chunk = self.archetypes[new_location.archetype_idx].chunk_mut(new_location.chunk_idx);
        let ptr = chunk
            .raw_ptr_mut(ty.id, new_location.row)
            .expect("column just created for this type") as *mut T;
        unsafe { std::ptr::write(ptr, value) };

        self.hooks.on_set(entity, ty);
        Ok(())
    }

    /// Remove `entity`'s component of type `T` (a structural change). Fails
    /// with `UnknownComponent` if not present.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Result<()> {
        let ty = component::register::<T>();
        let location = self.location(entity)?;
        let old_signature = self.archetypes[location.archetype_idx].signature().clone();
        if !old_signature.contains(ty.id) {
            return Err(EcsError::UnknownComponent(ty));
        }

        self.hooks.on_remove(entity, ty);
        let new_signature = old_signature.without(ty.id);
        self.transition(entity, location, new_signature)?;
        Ok(())
    }

    /// Move `entity` from `old_location` into the archetype for
    /// `new_signature`, copying every shared column and dropping the
    /// columns the new archetype does not carry.
    fn transition(
        &mut self,
        entity: Entity,
        old_location: EntityLocation,
        new_signature: Signature,
    ) -> Result<EntityLocation> {
        let new_idx = self.get_or_create_archetype(new_signature.clone());
        if new_idx == old_location.archetype_idx {
            return Ok(old_location);
        }

        let (new_chunk_idx, new_row, swapped) = {
            let (old_arch, new_arch) = if old_location.archetype_idx < new_idx {
                let (left, right) = self.archetypes.split_at_mut(new_idx);
                (&mut left[old_location.archetype_idx], &mut right[0])
            } else {
                let (left, right) = self.archetypes.split_at_mut(old_location.archetype_idx);
                (&mut right[0], &mut left[new_idx])
            };

            let (new_chunk_idx, new_row) = new_arch.add(entity);
            new_arch
                .chunk_mut(new_chunk_idx)
                .copy_from(old_arch.chunk(old_location.chunk_idx), old_location.row, new_row);

            let swapped = old_arch.remove_filtered(old_location.chunk_idx, old_location.row, |id| {
                !new_signature.contains(id)
            });

            (new_chunk_idx, new_row, swapped)
        };

        if let Some(swapped_entity) = swapped {
            self.fixup_location(
                swapped_entity,
                old_location.archetype_idx,
                old_location.chunk_idx,
                old_location.row,
            );
        }

        let new_location = EntityLocation {
            archetype_idx: new_idx,
            chunk_idx: new_chunk_idx,
            row: new_row,
        };
        self.set_location(entity, new_location);
        Ok(new_location)
    }

    // ---- archetype index --------------------------------------------------

    fn get_or_create_archetype(&mut self, signature: Signature) -> usize {
        let hash = signature.hash_cached_or_compute();
        if let Some(candidates) = self.signature_index.get(&hash) {
            for &idx in candidates {
                if self.archetypes[idx].signature() == &signature {
                    return idx;
                }
            }
        }

        let idx = self.archetypes.len();
        let mut archetype = Archetype::new(signature);
        for (query_idx, query) in self.queries.iter_mut().enumerate() {
            query.consider(&mut archetype, idx, query_idx);
        }

        #[cfg(feature = "profiling")]
        trace!(archetype_idx = idx, "archetype created");

        self.archetypes.push(archetype);
        self.signature_index.entry(hash).or_default().push(idx);
        idx
    }

    pub fn archetype(&self, idx: usize) -> &Archetype {
        &self.archetypes[idx]
    }

    pub(crate) fn archetype_mut(&mut self, idx: usize) -> &mut Archetype {
        &mut self.archetypes[idx]
    }

    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Number of currently live entities.
    pub fn entity_count(&self) -> usize {
        self.slots.len() - self.free_ids.len()
    }

    // ---- queries ------------------------------------------------------

    /// Resolve `desc` to a query index, compiling and scanning all existing
    /// archetypes on first use. Subsequent calls with an equal composite
    /// hash return the same cached query.
    pub fn query(&mut self, desc: &QueryDescription) -> Result<usize> {
        let mut desc = desc.clone();
        let hash = desc.composite_hash();
        if let Some(&idx) = self.query_index.get(&hash) {
            return Ok(idx);
        }

        let mut query = Query::compile(&desc)?;
        let idx = self.queries.len();
        query.scan_all(&mut self.archetypes, idx);
        self.queries.push(query);
        self.query_index.insert(hash, idx);
        Ok(idx)
    }

    /// Archetype indices matched by the query at `query_idx`.
    pub fn query_matches(&self, query_idx: usize) -> &[usize] {
        self.queries[query_idx].matches()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position(f32, f32);
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity(f32, f32);

    #[test]
    fn create_and_destroy_round_trip() {
        let mut world = World::new();
        let e = world.create().unwrap();
        assert!(world.is_alive(e));
        world.destroy(e).unwrap();
        assert!(!world.is_alive(e));
    }

    #[test]
    fn destroyed_id_is_recycled_with_bumped_version() {
        let mut world = World::new();
        let e1 = world.create().unwrap();
        world.destroy(e1).unwrap();
        let e2 = world.create().unwrap();
        assert_eq!(e1.id, e2.id);
        assert_ne!(e1.version, e2.version);
        assert_eq!(world.get::<Position>(e1).unwrap_err(), EcsError::StaleHandle(e1));
    }

    #[test]
    fn set_adds_component_via_structural_change() {
        let mut world = World::new();
        let e = world.create().unwrap();
        assert!(!world.has::<Position>(e));

        world.set(e, Position(1.0, 2.0)).unwrap();
        assert!(world.has::<Position>(e));
        assert_eq!(*world.get::<Position>(e).unwrap(), Position(1.0, 2.0));
    }

    #[test]
    fn set_overwrites_in_place_without_structural_change() {
        let mut world = World::new();
        let e = world.create().unwrap();
        world.set(e, Position(1.0, 2.0)).unwrap();
        let archetype_before = world.location(e).unwrap().archetype_idx;

        world.set(e, Position(9.0, 9.0)).unwrap();
        assert_eq!(world.location(e).unwrap().archetype_idx, archetype_before);
        assert_eq!(*world.get::<Position>(e).unwrap(), Position(9.0, 9.0));
    }

    #[test]
    fn remove_drops_component_and_preserves_siblings() {
        let mut world = World::new();
        let e = world.create().unwrap();
        world.set(e, Position(1.0, 2.0)).unwrap();
        world.set(e, Velocity(3.0, 4.0)).unwrap();

        world.remove::<Position>(e).unwrap();
        assert!(!world.has::<Position>(e));
        assert_eq!(*world.get::<Velocity>(e).unwrap(), Velocity(3.0, 4.0));
    }

    #[test]
    fn remove_of_absent_component_is_unknown_component() {
        let mut world = World::new();
        let e = world.create().unwrap();
        assert!(world.remove::<Position>(e).is_err());
    }

    #[test]
    fn swap_with_last_fixes_up_swapped_entity_location() {
        let mut world = World::new();
        let a = world.create().unwrap();
        world.set(a, Position(1.0, 1.0)).unwrap();
        let b = world.create().unwrap();
        world.set(b, Position(2.0, 2.0)).unwrap();
        let c = world.create().unwrap();
        world.set(c, Position(3.0, 3.0)).unwrap();

        world.destroy(a).unwrap();

        assert_eq!(*world.get::<Position>(b).unwrap(), Position(2.0, 2.0));
        assert_eq!(*world.get::<Position>(c).unwrap(), Position(3.0, 3.0));
    }

    #[test]
    fn query_matches_new_archetypes_created_after_it_was_built() {
        let mut world = World::new();
        let desc = QueryDescription::new().with_all(&[component::register::<Position>()]);
        let query_idx = world.query(&desc).unwrap();
        assert_eq!(world.query_matches(query_idx).len(), 0);

        let e = world.create().unwrap();
        world.set(e, Position(0.0, 0.0)).unwrap();

        assert_eq!(world.query_matches(query_idx).len(), 1);
    }

    #[test]
    fn archetype_count_reflects_distinct_signatures() {
        let mut world = World::new();
        let a = world.create().unwrap();
        world.set(a, Position(0.0, 0.0)).unwrap();
        let b = world.create().unwrap();
        world.set(b, Position(0.0, 0.0)).unwrap();
        world.set(b, Velocity(0.0, 0.0)).unwrap();

        // empty archetype + {Position} + {Position, Velocity}
        assert_eq!(world.archetype_count(), 3);
    }
}
