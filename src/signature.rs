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

//! Signature: the canonical identity of an archetype's component set.
//!
//! An ordered, deduplicated sequence of `ComponentType`s with a lazily
//! computed, cached hash. Two signatures are equal iff their sorted id
//! sequences are equal.

use smallvec::SmallVec;

use crate::component::ComponentType;

/// Inline capacity before a Signature's type list spills to the heap.
const INLINE_TYPES: usize = 8;

/// Ordered, deduplicated set of component types, plus a cached hash.
///
/// The cached hash uses `Option<u64>` rather than a magic sentinel integer:
/// `None` is "not yet computed", matching the lazy-recompute behavior this
/// type's hot path depends on (hashing a signature is cheap once cached, but
/// should not be redone on every lookup).
#[derive(Debug, Clone)]
pub struct Signature {
    types: SmallVec<[ComponentType; INLINE_TYPES]>,
    hash: Option<u64>,
}

impl Signature {
    /// Build a signature from a slice of component types. Sorts by id and
    /// drops duplicates.
    pub fn new(types: &[ComponentType]) -> Self {
        let mut sorted: SmallVec<[ComponentType; INLINE_TYPES]> = types.into();
        sorted.sort_by_key(|t| t.id);
        sorted.dedup_by_key(|t| t.id);
        Self {
            types: sorted,
            hash: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            types: SmallVec::new(),
            hash: None,
        }
    }

    pub fn types(&self) -> &[ComponentType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.types.binary_search_by_key(&id, |t| t.id).is_ok()
    }

    /// Signature with `ty` appended (or replacing an existing entry of the
    /// same id), re-sorted. Used by structural-change transitions.
    pub fn with(&self, ty: ComponentType) -> Self {
        let mut types: Vec<ComponentType> = self
            .types
            .iter()
            .copied()
            .filter(|t| t.id != ty.id)
            .collect();
        types.push(ty);
        Self::new(&types)
    }

    /// Signature with the component of the given id removed.
    pub fn without(&self, id: u32) -> Self {
        let types: Vec<ComponentType> = self.types.iter().copied().filter(|t| t.id != id).collect();
        Self::new(&types)
    }

    /// Order-independent hash over the sorted id sequence, computed once and
    /// cached. `&mut self` because the first call fills the cache.
    pub fn hash(&mut self) -> u64 {
        if let Some(h) = self.hash {
            return h;
        }
        let h = hash_ids(self.types.iter().map(|t| t.id));
        self.hash = Some(h);
        h
    }

    /// Hash without mutating the cache, recomputing if necessary. Prefer
    /// `hash(&mut self)` on the hot path; this exists for `&self` contexts
    /// (e.g. trait impls) where recompute-on-miss is acceptable.
    pub fn hash_cached_or_compute(&self) -> u64 {
        self.hash
            .unwrap_or_else(|| hash_ids(self.types.iter().map(|t| t.id)))
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.types.len() == other.types.len()
            && self
                .types
                .iter()
                .zip(other.types.iter())
                .all(|(a, b)| a.id == b.id)
    }
}
impl Eq for Signature {}

impl std::hash::Hash for Signature {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash_cached_or_compute().hash(state);
    }
}

fn hash_ids(ids: impl Iterator<Item = u32>) -> u64 {
    // FNV-1a style fold; order-independent because callers always iterate
    // the already-sorted, deduplicated id sequence.
    let mut h: u64 = 0xcbf29ce484222325;
    for id in ids {
        h ^= id as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(id: u32) -> ComponentType {
        ComponentType {
            id,
            size: 4,
            align: 4,
            is_zero_sized: false,
        }
    }

    #[test]
    fn permutations_hash_and_compare_equal() {
        let mut a = Signature::new(&[ty(3), ty(1), ty(2)]);
        let mut b = Signature::new(&[ty(1), ty(2), ty(3)]);
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn duplicates_are_removed() {
        let sig = Signature::new(&[ty(1), ty(1), ty(2)]);
        assert_eq!(sig.len(), 2);
    }

    #[test]
    fn with_and_without_round_trip() {
        let base = Signature::new(&[ty(1), ty(2)]);
        let extended = base.with(ty(3));
        assert_eq!(extended.len(), 3);
        assert!(extended.contains(3));

        let shrunk = extended.without(2);
        assert_eq!(shrunk, Signature::new(&[ty(1), ty(3)]));
    }

    #[test]
    fn hash_is_lazily_cached() {
        let mut sig = Signature::new(&[ty(5)]);
        assert!(sig.hash.is_none());
        let h1 = sig.hash();
        assert!(sig.hash.is_some());
        assert_eq!(h1, sig.hash());
    }
}
