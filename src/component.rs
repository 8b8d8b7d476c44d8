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

//! Component type registry.
//!
//! Maps user component types to dense, process-wide stable small integer
//! ids and records each type's size/alignment. Registration is append-only
//! and is expected to complete during single-threaded initialization; the
//! registry itself never sits on the iteration hot path.

use std::any::TypeId;
use std::sync::OnceLock;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Marker trait for component values.
///
/// Components must be `'static` (no borrowed data) and safe to move between
/// threads.
pub trait Component: 'static + Send + Sync {}

/// Automatically implement Component for all valid types.
impl<T: 'static + Send + Sync> Component for T {}

/// Registry-issued identity for a component class.
///
/// Ids are assigned densely, in order of first registration, and are stable
/// for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentType {
    pub id: u32,
    pub size: u32,
    pub align: u32,
    pub is_zero_sized: bool,
}

impl ComponentType {
    /// The drop glue for this type, or `None` if it needs no destructor.
    pub fn drop_fn(self) -> Option<unsafe fn(*mut u8)> {
        registry().drop_fn(self.id)
    }
}

struct Inner {
    ids: FxHashMap<TypeId, u32>,
    types: Vec<ComponentType>,
    drop_fns: Vec<Option<unsafe fn(*mut u8)>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            ids: FxHashMap::default(),
            types: Vec::new(),
            drop_fns: Vec::new(),
        }
    }

    fn register<T: Component>(&mut self) -> ComponentType {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.ids.get(&type_id) {
            return self.types[id as usize];
        }

        let id = self.types.len() as u32;
        let size = std::mem::size_of::<T>() as u32;
        let align = std::mem::align_of::<T>() as u32;
        let is_zero_sized = size == 0;

        let ty = ComponentType {
            id,
            size,
            align,
            is_zero_sized,
        };

        self.ids.insert(type_id, id);
        self.types.push(ty);
        self.drop_fns.push(if std::mem::needs_drop::<T>() {
            Some(|ptr: *mut u8| unsafe { std::ptr::drop_in_place(ptr as *mut T) })
        } else {
            None
        });

        #[cfg(feature = "profiling")]
        tracing::debug!(
            component = std::any::type_name::<T>(),
            id,
            size,
            align,
            "component registered"
        );

        ty
    }

    fn lookup<T: Component>(&self) -> Option<ComponentType> {
        self.ids
            .get(&TypeId::of::<T>())
            .map(|&id| self.types[id as usize])
    }

    fn drop_fn(&self, id: u32) -> Option<unsafe fn(*mut u8)> {
        self.drop_fns.get(id as usize).copied().flatten()
    }
}

/// Process-wide, append-only component registry.
pub struct ComponentRegistry {
    inner: Mutex<Inner>,
}

impl ComponentRegistry {
    /// Register `T`, returning its cached `ComponentType`. The first call for
    /// a given `T` assigns the next id; later calls are a lookup.
    pub fn register<T: Component>(&self) -> ComponentType {
        self.inner.lock().register::<T>()
    }

    /// Look up `T`'s `ComponentType` if it was already registered.
    pub fn lookup<T: Component>(&self) -> Option<ComponentType> {
        self.inner.lock().lookup::<T>()
    }

    /// Number of distinct component types registered so far.
    pub fn len(&self) -> usize {
        self.inner.lock().types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn registry() -> &'static ComponentRegistry {
    static REGISTRY: OnceLock<ComponentRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| ComponentRegistry {
        inner: Mutex::new(Inner::new()),
    })
}

/// Register `T` against the global registry, returning its `ComponentType`.
pub fn register<T: Component>() -> ComponentType {
    registry().register::<T>()
}

/// Look up `T`'s `ComponentType` without registering it.
pub fn lookup<T: Component>() -> Option<ComponentType> {
    registry().lookup::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position(f32, f32);
    struct Velocity(f32, f32);
    struct Marker;

    #[test]
    fn repeat_registration_returns_cached_type() {
        let a = register::<Position>();
        let b = register::<Position>();
        assert_eq!(a, b);
        assert_eq!(a.size, (std::mem::size_of::<f32>() * 2) as u32);
    }

    #[test]
    fn zero_sized_components_are_flagged() {
        let marker = register::<Marker>();
        assert!(marker.is_zero_sized);
        assert_eq!(marker.size, 0);
    }

    #[test]
    fn distinct_types_get_distinct_ids() {
        let a = register::<Position>();
        let b = register::<Velocity>();
        assert_ne!(a.id, b.id);
    }
}
