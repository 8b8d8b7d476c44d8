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

//! Archetype: the set of entities sharing a Signature, owning one or more
//! Chunks. All of an archetype's chunks share identical column layout; only
//! the last chunk may be partially filled.

use crate::bitset::BitSet;
use crate::chunk::Chunk;
use crate::entity::Entity;
use crate::signature::Signature;

/// Target bytes per chunk when sizing a new archetype's chunk capacity.
/// Mirrors the teacher's general "page-sized" storage-block sizing habit
/// (see `archetype.rs::Archetype::reserve_rows`'s batch-growth strategy),
/// generalized into a fixed default per §4.5.
pub const DEFAULT_CHUNK_BYTES: usize = 16 * 1024;

pub struct Archetype {
    signature: Signature,
    bitset: BitSet,
    chunks: Vec<Chunk>,
    chunk_capacity: usize,
    /// Queries that have already matched this archetype and cached it; used
    /// so a newly created archetype can be appended to existing queries'
    /// match lists (§4.5's back-reference contract), stored as indices into
    /// the world's query table rather than raw pointers.
    query_back_refs: Vec<usize>,
}

impl Archetype {
    /// Create a new, chunkless archetype for `signature`. Chunk capacity is
    /// derived from the signature's row stride: `DEFAULT_CHUNK_BYTES / stride`,
    /// minimum 1.
    pub fn new(signature: Signature) -> Self {
        let bitset = BitSet::from_ids(signature.types().iter().map(|t| t.id));
        let stride: usize = signature.types().iter().map(|t| t.size as usize).sum();
        let chunk_capacity = if stride == 0 {
            // All-zero-sized-component (or empty) archetypes still need a
            // bound on entities-per-chunk so iteration has a finite unit.
            DEFAULT_CHUNK_BYTES
        } else {
            (DEFAULT_CHUNK_BYTES / stride).max(1)
        };

        Self {
            signature,
            bitset,
            chunks: Vec::new(),
            chunk_capacity,
            query_back_refs: Vec::new(),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn bitset(&self) -> &BitSet {
        &self.bitset
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut [Chunk] {
        &mut self.chunks
    }

    pub fn chunk(&self, idx: usize) -> &Chunk {
        &self.chunks[idx]
    }

    pub fn chunk_mut(&mut self, idx: usize) -> &mut Chunk {
        &mut self.chunks[idx]
    }

    /// Live entity count across all chunks.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Chunk::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn query_back_refs(&self) -> &[usize] {
        &self.query_back_refs
    }

    pub fn register_query_back_ref(&mut self, query_idx: usize) {
        if !self.query_back_refs.contains(&query_idx) {
            self.query_back_refs.push(query_idx);
        }
    }

    /// Append `entity` to the last chunk, allocating a new one first if the
    /// last chunk is full (or none exist yet). Never fails.
    pub fn add(&mut self, entity: Entity) -> (usize, usize) {
        if self.chunks.last().map_or(true, Chunk::is_full) {
            self.chunks.push(Chunk::new(self.signature.types(), self.chunk_capacity));
            #[cfg(feature = "profiling")]
            tracing::trace!(
                chunk_count = self.chunks.len(),
                capacity = self.chunk_capacity,
                "archetype allocated new chunk"
            );
        }
        let chunk_idx = self.chunks.len() - 1;
        let row = self.chunks[chunk_idx].add(entity);
        (chunk_idx, row)
    }

    /// Remove the row at `(chunk_idx, row)`. Returns the entity swapped into
    /// that row, if any. Emptied chunks are retained for reuse rather than
    /// freed (§9's open question, resolved in favor of the safer default).
    pub fn remove(&mut self, chunk_idx: usize, row: usize) -> Option<Entity> {
        self.chunks[chunk_idx].remove(row)
    }

    /// As `remove`, but only drops columns for which `should_drop` returns
    /// true. Used by structural changes that have already copied a row's
    /// shared columns into a destination archetype.
    pub fn remove_filtered(
        &mut self,
        chunk_idx: usize,
        row: usize,
        should_drop: impl Fn(u32) -> bool,
    ) -> Option<Entity> {
        self.chunks[chunk_idx].remove_filtered(row, should_drop)
    }
}
