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

//! Entity handles and world-table slot metadata.
//!
//! An `Entity` is a stable, opaque `{id, version}` handle. The id indexes the
//! world's entity table; the version disambiguates reused ids after a
//! destroy/recreate cycle. An entity is alive iff its version matches the
//! table slot's current version.

/// Opaque entity handle. `id` indexes the world's slot table; `version` is
/// bumped every time that slot's id is recycled, so a stale handle to a
/// destroyed-and-replaced entity is distinguishable from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    pub id: u32,
    pub version: u32,
}

/// Where a live entity's row lives: which archetype, which chunk within it,
/// and which row within that chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLocation {
    pub archetype_idx: usize,
    pub chunk_idx: usize,
    pub row: usize,
}

/// One slot in the world's entity table.
///
/// `version` always reflects the slot's current generation, whether the slot
/// is occupied or sitting in the free list; `location` is only meaningful
/// while occupied.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub location: EntityLocation,
    pub version: u32,
    pub occupied: bool,
}
