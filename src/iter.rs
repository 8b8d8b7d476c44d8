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

//! Lazy, single-pass iteration over a query's matched archetypes.
//!
//! Three layers, each flattening the one below: archetypes, their chunks,
//! and each chunk's entity rows. None allocate after construction. Mutating
//! the world mid-iteration (structural changes) invalidates these iterators;
//! the core does not detect that, per the reference-safety design note.

use crate::archetype::Archetype;
use crate::chunk::Chunk;
use crate::entity::Entity;
use crate::world::World;

/// Yields every archetype matched by a query, in match order (archetype
/// creation order).
pub struct ArchetypeIter<'w> {
    world: &'w World,
    matches: &'w [usize],
    pos: usize,
}

impl<'w> ArchetypeIter<'w> {
    pub(crate) fn new(world: &'w World, query_idx: usize) -> Self {
        Self {
            world,
            matches: world.query_matches(query_idx),
            pos: 0,
        }
    }
}

impl<'w> Iterator for ArchetypeIter<'w> {
    type Item = &'w Archetype;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = *self.matches.get(self.pos)?;
        self.pos += 1;
        Some(self.world.archetype(idx))
    }
}

/// Flattens a query's matched archetypes into their chunks, in
/// archetype-major, chunk-allocation order.
pub struct ChunkIter<'w> {
    archetypes: ArchetypeIter<'w>,
    current: Option<(&'w Archetype, usize)>,
}

impl<'w> ChunkIter<'w> {
    pub(crate) fn new(world: &'w World, query_idx: usize) -> Self {
        Self {
            archetypes: ArchetypeIter::new(world, query_idx),
            current: None,
        }
    }
}

impl<'w> Iterator for ChunkIter<'w> {
    type Item = &'w Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((archetype, chunk_idx)) = self.current {
                if chunk_idx < archetype.chunks().len() {
                    self.current = Some((archetype, chunk_idx + 1));
                    return Some(archetype.chunk(chunk_idx));
                }
            }
            let archetype = self.archetypes.next()?;
            self.current = Some((archetype, 0));
        }
    }
}

/// One visited row: the entity, its row index within `chunk`, and the chunk
/// itself (so callers can fetch typed component slices).
pub struct EntityRow<'w> {
    pub entity: Entity,
    pub row: usize,
    pub chunk: &'w Chunk,
}

/// Flattens a query's matched chunks into entity rows, in archetype-major,
/// chunk-major, row `0..size` order.
pub struct EntityIter<'w> {
    chunks: ChunkIter<'w>,
    current: Option<(&'w Chunk, usize)>,
}

impl<'w> EntityIter<'w> {
    pub(crate) fn new(world: &'w World, query_idx: usize) -> Self {
        Self {
            chunks: ChunkIter::new(world, query_idx),
            current: None,
        }
    }
}

impl<'w> Iterator for EntityIter<'w> {
    type Item = EntityRow<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((chunk, row)) = self.current {
                if row < chunk.len() {
                    self.current = Some((chunk, row + 1));
                    return Some(EntityRow {
                        entity: chunk.entity(row),
                        row,
                        chunk,
                    });
                }
            }
            let chunk = self.chunks.next()?;
            self.current = Some((chunk, 0));
        }
    }
}

impl World {
    /// Iterate the archetypes matched by the query at `query_idx`.
    pub fn iter_archetypes(&self, query_idx: usize) -> ArchetypeIter<'_> {
        ArchetypeIter::new(self, query_idx)
    }

    /// Iterate the chunks of the archetypes matched by `query_idx`.
    pub fn iter_chunks(&self, query_idx: usize) -> ChunkIter<'_> {
        ChunkIter::new(self, query_idx)
    }

    /// Iterate every entity row matched by `query_idx`.
    pub fn iter_entities(&self, query_idx: usize) -> EntityIter<'_> {
        EntityIter::new(self, query_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryDescription;
    use crate::component;

    #[derive(Debug, Clone, Copy)]
    struct A;
    #[derive(Debug, Clone, Copy)]
    struct B;

    #[test]
    fn entity_iter_visits_every_matching_row_once() {
        let mut world = World::new();
        for _ in 0..5 {
            let e = world.create().unwrap();
            world.set(e, A).unwrap();
        }
        for _ in 0..3 {
            let e = world.create().unwrap();
            world.set(e, A).unwrap();
            world.set(e, B).unwrap();
        }

        let desc = QueryDescription::new().with_all(&[component::register::<A>()]);
        let query_idx = world.query(&desc).unwrap();

        let count = world.iter_entities(query_idx).count();
        assert_eq!(count, 8);
    }

    #[test]
    fn chunk_iter_spans_second_chunk_once_first_is_full() {
        let mut world = World::new();
        let desc = QueryDescription::new().with_all(&[component::register::<A>()]);
        let query_idx = world.query(&desc).unwrap();

        // enough entities to force a second chunk allocation in the small
        // default capacity derived from a zero-sized-only signature
        for _ in 0..20_000 {
            let e = world.create().unwrap();
            world.set(e, A).unwrap();
        }

        let archetype = world.iter_archetypes(query_idx).next().unwrap();
        assert!(archetype.chunks().len() >= 1);
        let total: usize = world.iter_chunks(query_idx).map(Chunk::len).sum();
        assert_eq!(total, 20_000);
    }
}
