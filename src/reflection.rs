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

//! Type-erased component access, for external serialization layers.
//!
//! Narrowed from a full field-level reflection trait down to set/get/has
//! keyed by `ComponentType` — exactly the surface a (de)serializer needs to
//! walk an entity's components without knowing their concrete Rust types.

use crate::component::ComponentType;
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::world::World;

impl World {
    /// Does `entity` carry a component of type `ty`?
    pub fn has_erased(&self, entity: Entity, ty: ComponentType) -> Result<bool> {
        let location = self.location_for_reflection(entity)?;
        Ok(self
            .archetype(location.archetype_idx)
            .chunk(location.chunk_idx)
            .has(ty.id))
    }

    /// Raw pointer to `entity`'s component of type `ty`. Valid until the
    /// next structural change affecting this entity.
    pub fn get_erased(&self, entity: Entity, ty: ComponentType) -> Result<*const u8> {
        let location = self.location_for_reflection(entity)?;
        let chunk = self.archetype(location.archetype_idx).chunk(location.chunk_idx);
        chunk
            .raw_ptr(ty.id, location.row)
            .ok_or(EcsError::UnknownComponent(ty))
    }

    /// Mutable counterpart to `get_erased`.
    pub fn get_erased_mut(&mut self, entity: Entity, ty: ComponentType) -> Result<*mut u8> {
        let location = self.location_for_reflection(entity)?;
        let archetype_idx = location.archetype_idx;
        let chunk_idx = location.chunk_idx;
        let row = location.row;
        self.archetype_mut(archetype_idx)
            .chunk_mut(chunk_idx)
            .raw_ptr_mut(ty.id, row)
            .ok_or(EcsError::UnknownComponent(ty))
    }

    /// Overwrite `entity`'s component of type `ty` with `ty.size` bytes read
    /// from `src`.
    ///
    /// # Safety
    /// `src` must be valid to read `ty.size` bytes from, and those bytes
    /// must be a legal bit pattern for the component type registered under
    /// `ty` (matching alignment is the caller's responsibility too).
    pub unsafe fn set_erased(&mut self, entity: Entity, ty: ComponentType, src: *const u8) -> Result<()> {
        let dst = self.get_erased_mut(entity, ty)?;
        unsafe { std::ptr::copy_nonoverlapping(src, dst, ty.size as usize) };
        Ok(())
    }
}
