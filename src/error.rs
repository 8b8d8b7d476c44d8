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

//! Error types

use std::fmt;

use crate::component::ComponentType;
use crate::entity::Entity;

/// ECS error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    /// Operation on an entity whose version no longer matches its slot.
    StaleHandle(Entity),

    /// A ComponentType not registered, or not present on the target entity.
    UnknownComponent(ComponentType),

    /// A `QueryDescription` set `exclusive` together with `all`/`any`/`none`.
    MalformedQuery,

    /// Reserved for entity-id exhaustion (32-bit id + version space).
    CapacityExceeded,
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::StaleHandle(entity) => write!(
                f,
                "stale handle: entity {}v{} no longer matches its slot",
                entity.id, entity.version
            ),
            EcsError::UnknownComponent(ty) => {
                write!(f, "unknown component: type id {} not present", ty.id)
            }
            EcsError::MalformedQuery => write!(
                f,
                "malformed query: `exclusive` cannot be combined with all/any/none"
            ),
            EcsError::CapacityExceeded => write!(f, "entity id/version space exhausted"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
