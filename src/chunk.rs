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

//! Chunk: a fixed-capacity Structure-of-Arrays storage block.
//!
//! One parallel component array per type, plus an entity back-reference
//! array and a component-id -> column-index lookup. The unit of allocation
//! and the unit of iteration.

use crate::component::ComponentType;
use crate::entity::Entity;

/// Type-erased, densely packed array of one component type's values.
///
/// Mirrors the teacher's `ComponentColumn` (byte buffer + item size + drop
/// glue) but is pre-sized to the chunk's fixed `capacity` instead of growing
/// per write.
struct Column {
    data: Vec<u8>,
    item_size: usize,
    drop_fn: Option<unsafe fn(*mut u8)>,
}

impl Column {
    fn new(ty: ComponentType, capacity: usize) -> Self {
        let item_size = ty.size as usize;
        Self {
            data: vec![0u8; item_size * capacity],
            item_size,
            drop_fn: ty.drop_fn(),
        }
    }

    fn ptr_mut(&mut self, row: usize) -> *mut u8 {
        if self.item_size == 0 {
            return self.data.as_mut_ptr();
        }
        unsafe { self.data.as_mut_ptr().add(row * self.item_size) }
    }

    fn ptr(&self, row: usize) -> *const u8 {
        if self.item_size == 0 {
            return self.data.as_ptr();
        }
        unsafe { self.data.as_ptr().add(row * self.item_size) }
    }

    /// Copy the element at `src_row` over `dst_row` (raw bytes, no drop of
    /// the overwritten destination — caller guarantees `dst_row` holds no
    /// live value needing a destructor, or has already dropped it).
    unsafe fn copy_within(&mut self, src_row: usize, dst_row: usize) {
        if self.item_size == 0 || src_row == dst_row {
            return;
        }
        let src = self.ptr(src_row);
        let dst = self.ptr_mut(dst_row);
        unsafe {
            std::ptr::copy_nonoverlapping(src, dst, self.item_size);
        }
    }

    unsafe fn drop_row(&mut self, row: usize) {
        if let Some(drop_fn) = self.drop_fn {
            let ptr = self.ptr_mut(row);
            unsafe { drop_fn(ptr) };
        }
    }
}

/// Fixed-capacity Structure-of-Arrays storage block.
///
/// Invariant: `size <= capacity`; rows `[0, size)` hold valid data for every
/// column; rows `[size, capacity)` are unspecified.
pub struct Chunk {
    capacity: usize,
    size: usize,
    entities: Vec<Entity>,
    columns: Vec<Column>,
    /// Component id backing each entry of `columns`, same order.
    column_ids: Vec<u32>,
    /// `id_to_column[component_id] = column index`, or `-1` if absent.
    id_to_column: Vec<i32>,
}

impl Chunk {
    /// Build a chunk for the given component types and fixed capacity.
    pub fn new(types: &[ComponentType], capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let max_id = types.iter().map(|t| t.id).max().map(|m| m as usize + 1).unwrap_or(0);
        let mut id_to_column = vec![-1i32; max_id];
        let mut columns = Vec::with_capacity(types.len());
        let mut column_ids = Vec::with_capacity(types.len());
        for (col_idx, &ty) in types.iter().enumerate() {
            id_to_column[ty.id as usize] = col_idx as i32;
            columns.push(Column::new(ty, capacity));
            column_ids.push(ty.id);
        }

        Self {
            capacity,
            size: 0,
            entities: Vec::with_capacity(capacity),
            columns,
            column_ids,
            id_to_column,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.size >= self.capacity
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities[..self.size]
    }

    pub fn entity(&self, row: usize) -> Entity {
        self.entities[row]
    }

    /// Does this chunk have a column for component id `id`?
    pub fn has(&self, id: u32) -> bool {
        (id as usize) < self.id_to_column.len() && self.id_to_column[id as usize] != -1
    }

    fn column_index(&self, id: u32) -> Option<usize> {
        if (id as usize) < self.id_to_column.len() {
            let idx = self.id_to_column[id as usize];
            if idx >= 0 {
                return Some(idx as usize);
            }
        }
        None
    }

    /// Append `entity` at the tail. Caller must ensure `size < capacity`.
    pub fn add(&mut self, entity: Entity) -> usize {
        debug_assert!(self.size < self.capacity, "chunk add on a full chunk");
        let row = self.size;
        self.entities.push(entity);
        self.size += 1;
        row
    }

    /// Swap-remove `row`: drop its components, move the last row's data
    /// (including entity back-reference) into `row`, shrink `size`. Returns
    /// the entity that was swapped into `row`, if any (the caller must fix
    /// up that entity's world slot).
    pub fn remove(&mut self, row: usize) -> Option<Entity> {
        self.remove_filtered(row, |_| true)
    }

    /// Swap-remove `row`, dropping only the columns for which `should_drop`
    /// returns true. Used when a row's value has already been moved to
    /// another chunk (structural change) and must not be double-dropped.
    pub fn remove_filtered(&mut self, row: usize, should_drop: impl Fn(u32) -> bool) -> Option<Entity> {
        debug_assert!(row < self.size, "chunk remove out of bounds");
        let last = self.size - 1;

        for (column, &id) in self.columns.iter_mut().zip(self.column_ids.iter()) {
            if should_drop(id) {
                unsafe { column.drop_row(row) };
            }
            if row != last {
                unsafe { column.copy_within(last, row) };
            }
        }

        self.entities.swap_remove(row);
        self.size -= 1;

        if row < self.size {
            Some(self.entities[row])
        } else {
            None
        }
    }

    /// Mutable typed reference to component `T` at `row`. Bounds/type are
    /// checked in debug builds only; undefined behavior if absent in
    /// release, per the spec's release-mode performance tradeoff.
    ///
    /// # Safety
    /// Caller must ensure `row < len()` and that `T` matches the column's
    /// registered component type.
    pub unsafe fn get_mut<T>(&mut self, id: u32, row: usize) -> &mut T {
        let col_idx = self.column_index(id).expect("component absent from chunk");
        debug_assert!(row < self.size);
        let column = &mut self.columns[col_idx];
        unsafe { &mut *(column.ptr_mut(row) as *mut T) }
    }

    /// # Safety
    /// Same contract as `get_mut`.
    pub unsafe fn get<T>(&self, id: u32, row: usize) -> &T {
        let col_idx = self.column_index(id).expect("component absent from chunk");
        debug_assert!(row < self.size);
        let column = &self.columns[col_idx];
        unsafe { &*(column.ptr(row) as *const T) }
    }

    /// Raw pointer to the start of row `row` in the column for `id`, for
    /// writing a freshly constructed value. Used by `World::create`/the
    /// add-component path.
    pub(crate) fn raw_ptr_mut(&mut self, id: u32, row: usize) -> Option<*mut u8> {
        self.column_index(id).map(|idx| self.columns[idx].ptr_mut(row))
    }

    /// Immutable counterpart to `raw_ptr_mut`, for type-erased reads.
    pub(crate) fn raw_ptr(&self, id: u32, row: usize) -> Option<*const u8> {
        self.column_index(id).map(|idx| self.columns[idx].ptr(row))
    }

    /// Copy shared columns from `(src_row in src)` to `(dst_row in self)`.
    /// Columns present only in `self` are left untouched (caller
    /// initializes); columns present only in `src` are not copied (and will
    /// be dropped when `src`'s row is removed).
    pub fn copy_from(&mut self, src: &Chunk, src_row: usize, dst_row: usize) {
        for (id_usize, &dst_col_idx) in self.id_to_column.iter().enumerate() {
            if dst_col_idx < 0 {
                continue;
            }
            let id = id_usize as u32;
            if let Some(src_col_idx) = src.column_index(id) {
                let src_column = &src.columns[src_col_idx];
                let dst_column = &mut self.columns[dst_col_idx as usize];
                if src_column.item_size == 0 {
                    continue;
                }
                unsafe {
                    let s = src_column.ptr(src_row);
                    let d = dst_column.ptr_mut(dst_row);
                    std::ptr::copy_nonoverlapping(s, d, src_column.item_size);
                }
            }
        }
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        for column in &mut self.columns {
            if column.drop_fn.is_some() {
                for row in 0..self.size {
                    unsafe { column.drop_row(row) };
                }
            }
        }
    }
}
