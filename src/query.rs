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

//! Query compilation and caching.
//!
//! A `QueryDescription` carries four Signatures (`all`, `any`, `none`,
//! `exclusive`). Compiling it produces a `Query`: each Signature becomes a
//! `BitSet`, and the world resolves the query to a cached list of matching
//! archetypes, incrementally extended as new archetypes are created.
//!
//! Grounded on the teacher's `QuerySignature`/`CachedQueryResult`
//! (required/excluded TypeId lists with a `seen_archetypes`-gated `update`),
//! generalized to the spec's four-way predicate set.

use crate::archetype::Archetype;
use crate::bitset::BitSet;
use crate::component::ComponentType;
use crate::error::{EcsError, Result};
use crate::signature::Signature;

/// Declarative component predicate: all/any/none are ANDed together; an
/// empty `any`/`none` is vacuously satisfied. `exclusive`, if non-empty,
/// must be the *only* non-empty field (validated at compile time).
#[derive(Debug, Clone, Default)]
pub struct QueryDescription {
    pub all: Signature,
    pub any: Signature,
    pub none: Signature,
    pub exclusive: Signature,
    composite_hash: Option<u64>,
}

impl QueryDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_all(mut self, types: &[ComponentType]) -> Self {
        self.all = Signature::new(types);
        self.composite_hash = None;
        self
    }

    pub fn with_any(mut self, types: &[ComponentType]) -> Self {
        self.any = Signature::new(types);
        self.composite_hash = None;
        self
    }

    pub fn with_none(mut self, types: &[ComponentType]) -> Self {
        self.none = Signature::new(types);
        self.composite_hash = None;
        self
    }

    pub fn with_exclusive(mut self, types: &[ComponentType]) -> Self {
        self.exclusive = Signature::new(types);
        self.composite_hash = None;
        self
    }

    /// `exclusive` is mutually exclusive with `all`/`any`/`none`.
    fn validate(&self) -> Result<()> {
        if !self.exclusive.is_empty()
            && (!self.all.is_empty() || !self.any.is_empty() || !self.none.is_empty())
        {
            return Err(EcsError::MalformedQuery);
        }
        Ok(())
    }

    /// Composite hash over the four Signature hashes, combined order-
    /// sensitively: `h = 17; h = 23*h + each`. Lazily computed and cached;
    /// call `rebuild()` after mutating any Signature in place to invalidate
    /// the cache (the builder methods above do this automatically).
    pub fn composite_hash(&mut self) -> u64 {
        if let Some(h) = self.composite_hash {
            return h;
        }
        let mut h: u64 = 17;
        for part in [
            self.all.hash(),
            self.any.hash(),
            self.none.hash(),
            self.exclusive.hash(),
        ] {
            h = h.wrapping_mul(23).wrapping_add(part);
        }
        self.composite_hash = Some(h);
        h
    }

    /// Invalidate the cached composite hash after mutating `all`/`any`/
    /// `none`/`exclusive` directly (rather than through the builder
    /// methods).
    pub fn rebuild(&mut self) {
        self.composite_hash = None;
    }
}

/// Compiled predicate ready to test against an archetype's BitSet.
#[derive(Debug, Clone)]
enum Mode {
    Exclusive(BitSet),
    Standard {
        all: BitSet,
        any: BitSet,
        none: BitSet,
    },
}

/// A compiled, cached match-set of archetypes.
pub struct Query {
    mode: Mode,
    /// Archetype indices (into `World`'s archetype vector) known to match,
    /// in the order they were discovered (archetype creation order).
    matches: Vec<usize>,
}

impl Query {
    /// Compile a validated `QueryDescription` into bitsets. Does not scan
    /// any archetypes yet; callers populate `matches` via `scan_all`/
    /// `consider`.
    pub fn compile(desc: &QueryDescription) -> Result<Self> {
        desc.validate()?;
        let mode = if !desc.exclusive.is_empty() {
            Mode::Exclusive(BitSet::from_ids(desc.exclusive.types().iter().map(|t| t.id)))
        } else {
            Mode::Standard {
                all: BitSet::from_ids(desc.all.types().iter().map(|t| t.id)),
                any: BitSet::from_ids(desc.any.types().iter().map(|t| t.id)),
                none: BitSet::from_ids(desc.none.types().iter().map(|t| t.id)),
            }
        };
        Ok(Self {
            mode,
            matches: Vec::new(),
        })
    }

    /// Does `bitset` satisfy this query's predicate?
    pub fn valid(&self, bitset: &BitSet) -> bool {
        match &self.mode {
            Mode::Exclusive(mask) => bitset.exclusive(mask),
            Mode::Standard { all, any, none } => {
                bitset.all(all) && bitset.any(any) && bitset.none(none)
            }
        }
    }

    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    /// Scan every archetype in `archetypes` (full rebuild, used the first
    /// time a query is built) and record matches, registering a back-ref
    /// into each matched archetype so future structural changes can find
    /// this query.
    pub(crate) fn scan_all(&mut self, archetypes: &mut [Archetype], self_idx: usize) {
        self.matches.clear();
        for (idx, archetype) in archetypes.iter_mut().enumerate() {
            if self.valid(archetype.bitset()) {
                self.matches.push(idx);
                archetype.register_query_back_ref(self_idx);
            }
        }
    }

    /// Consider a single newly created archetype; append it to `matches`
    /// and register the back-ref if it matches. Called by the world every
    /// time a new archetype is created, for every already-built query.
    pub(crate) fn consider(&mut self, archetype: &mut Archetype, new_idx: usize, self_idx: usize) {
        if self.valid(archetype.bitset()) {
            self.matches.push(new_idx);
            archetype.register_query_back_ref(self_idx);
        }
    }
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
    fn exclusive_with_all_is_malformed() {
        let desc = QueryDescription::new()
            .with_all(&[ty(0)])
            .with_exclusive(&[ty(1)]);
        assert_eq!(Query::compile(&desc).unwrap_err(), EcsError::MalformedQuery);
    }

    #[test]
    fn empty_description_matches_everything() {
        let desc = QueryDescription::new();
        let query = Query::compile(&desc).unwrap();
        assert!(query.valid(&BitSet::new()));
        assert!(query.valid(&BitSet::from_ids([0, 1, 2])));
    }

    #[test]
    fn standard_mode_applies_all_any_none() {
        let desc = QueryDescription::new()
            .with_all(&[ty(0)])
            .with_none(&[ty(1)]);
        let query = Query::compile(&desc).unwrap();

        assert!(query.valid(&BitSet::from_ids([0, 2])));
        assert!(!query.valid(&BitSet::from_ids([0, 1])), "none should exclude");
        assert!(!query.valid(&BitSet::from_ids([2])), "all should require id 0");
    }

    #[test]
    fn exclusive_mode_requires_exact_signature() {
        let desc = QueryDescription::new().with_exclusive(&[ty(0), ty(1)]);
        let query = Query::compile(&desc).unwrap();

        assert!(query.valid(&BitSet::from_ids([0, 1])));
        assert!(!query.valid(&BitSet::from_ids([0, 1, 2])));
        assert!(!query.valid(&BitSet::from_ids([0])));
    }

    #[test]
    fn composite_hash_is_order_sensitive_and_cached() {
        let mut a = QueryDescription::new().with_all(&[ty(0)]).with_none(&[ty(1)]);
        let mut b = QueryDescription::new().with_all(&[ty(1)]).with_none(&[ty(0)]);
        assert_ne!(a.composite_hash(), b.composite_hash());

        let h1 = a.composite_hash();
        assert_eq!(h1, a.composite_hash(), "cached value stable across calls");
    }

    #[test]
    fn rebuild_invalidates_cached_hash() {
        let mut desc = QueryDescription::new().with_all(&[ty(0)]);
        let h1 = desc.composite_hash();
        desc.all = Signature::new(&[ty(1)]);
        desc.rebuild();
        let h2 = desc.composite_hash();
        assert_ne!(h1, h2);
    }
}
