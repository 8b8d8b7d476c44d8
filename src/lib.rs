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

//! Archetype ECS — a storage-and-query core for Entity-Component-System data.
//!
//! Entities are stable `{id, version}` handles; components live in
//! contiguous, Structure-of-Arrays `Chunk`s grouped by `Archetype`
//! (identical component `Signature`). Declarative `QueryDescription`s
//! compile to cached, incrementally-updated archetype match-sets.
//!
//! Variadic ergonomic helpers, event dispatch, (de)serialization, and
//! multi-threaded scheduling are external-collaborator concerns; this crate
//! exposes the seams they need and nothing more.

pub mod archetype;
pub mod bitset;
pub mod chunk;
pub mod component;
pub mod entity;
pub mod error;
pub mod iter;
pub mod prelude;
pub mod query;
pub mod reflection;
pub mod signature;
pub mod world;

pub use component::{register, Component, ComponentType};
pub use entity::Entity;
pub use error::{EcsError, Result};
pub use iter::{ArchetypeIter, ChunkIter, EntityIter, EntityRow};
pub use query::{Query, QueryDescription};
pub use signature::Signature;
pub use world::{Hooks, World};
