//! Sparse union-find over hashable identifiers.
//!
//! [`SparseUnionFind`] keeps a `parent` and a `size` map keyed by arbitrary ids
//! (element ids, vertex ids, strings) instead of dense array indices, so that
//! feature detections scattered over a huge space-time id range only cost memory
//! for the ids actually registered.
//!
//! - Union by size bounds the tree height.
//! - [`SparseUnionFind::find`] compresses by path halving: every visited node is
//!   re-pointed to its grandparent.
//! - Unknown ids degrade gracefully: `find`/`parent` return the id itself and
//!   `unite` returns `false`.

use std::collections::BTreeSet;
use std::hash::Hash;

use hashbrown::HashMap;

use crate::debug_invariants::DebugInvariants;
use crate::track_error::TrackError;

/// Disjoint-set forest over sparse identifiers.
#[derive(Debug, Clone)]
pub struct SparseUnionFind<Id> {
    parent: HashMap<Id, Id>,
    size: HashMap<Id, usize>,
}

impl<Id> Default for SparseUnionFind<Id> {
    fn default() -> Self {
        Self {
            parent: HashMap::new(),
            size: HashMap::new(),
        }
    }
}

impl<Id> SparseUnionFind<Id>
where
    Id: Clone + Eq + Hash + Ord,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize with the provided ids, each as its own singleton.
    pub fn with_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = Id>,
    {
        let mut uf = Self::default();
        for id in ids {
            uf.add(id);
        }
        uf
    }

    /// Register `id` as a singleton set of size 1.
    ///
    /// Re-adding an id that is already present is a no-op and returns `false`;
    /// its parent and the size bookkeeping of its set are left untouched.
    pub fn add(&mut self, id: Id) -> bool {
        if self.parent.contains_key(&id) {
            return false;
        }
        self.parent.insert(id.clone(), id.clone());
        self.size.insert(id, 1);
        true
    }

    #[inline]
    pub fn has(&self, id: &Id) -> bool {
        self.parent.contains_key(id)
    }

    /// Number of registered ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Iterate over all registered ids (arbitrary order).
    pub fn ids(&self) -> impl Iterator<Item = &Id> + '_ {
        self.parent.keys()
    }

    /// Current parent pointer; an unknown id is its own parent.
    pub fn parent(&self, id: &Id) -> Id {
        self.parent.get(id).cloned().unwrap_or_else(|| id.clone())
    }

    /// `true` if `id` is registered and is the root of its set.
    pub fn is_root(&self, id: &Id) -> bool {
        self.parent.get(id).is_some_and(|p| p == id)
    }

    /// Root of `id` with path halving. Returns `id` itself when not registered.
    pub fn find(&mut self, id: Id) -> Id {
        if !self.parent.contains_key(&id) {
            return id;
        }
        let mut x = id;
        loop {
            let p = match self.parent.get(&x) {
                Some(p) if *p != x => p.clone(),
                _ => return x,
            };
            let gp = self.parent.get(&p).cloned().unwrap_or_else(|| p.clone());
            if let Some(slot) = self.parent.get_mut(&x) {
                *slot = gp.clone();
            }
            if gp == p {
                return p;
            }
            x = gp;
        }
    }

    /// Root of `id` without compressing the path (read-only).
    pub fn root_of(&self, id: &Id) -> Id {
        let mut x = id.clone();
        while let Some(p) = self.parent.get(&x) {
            if *p == x {
                break;
            }
            x = p.clone();
        }
        x
    }

    /// Union by size.
    ///
    /// Returns `false` if either id is unknown. Returns `true` when the sets
    /// were merged and also when both ids already share a set.
    pub fn unite(&mut self, a: Id, b: Id) -> bool {
        if !self.has(&a) || !self.has(&b) {
            return false;
        }
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return true;
        }
        let sa = self.size.get(&ra).copied().unwrap_or(1);
        let sb = self.size.get(&rb).copied().unwrap_or(1);
        if sa < sb {
            self.parent.insert(ra, rb.clone());
            self.size.insert(rb, sa + sb);
        } else {
            self.parent.insert(rb, ra.clone());
            self.size.insert(ra, sa + sb);
        }
        true
    }

    pub fn same_set(&mut self, a: Id, b: Id) -> bool {
        self.find(a) == self.find(b)
    }

    /// Size of the set containing `id` (1 for unknown ids).
    pub fn size_of(&mut self, id: Id) -> usize {
        let r = self.find(id);
        self.size.get(&r).copied().unwrap_or(1)
    }

    /// Group all registered ids by their current root.
    ///
    /// Sets are ordered by their smallest member, so the result does not
    /// depend on which element happens to be the root.
    pub fn get_sets(&mut self) -> Vec<BTreeSet<Id>> {
        let ids: Vec<Id> = self.parent.keys().cloned().collect();
        let mut groups: HashMap<Id, BTreeSet<Id>> = HashMap::new();
        for id in ids {
            let root = self.find(id.clone());
            groups.entry(root).or_default().insert(id);
        }
        let mut sets: Vec<BTreeSet<Id>> = groups.into_values().collect();
        sets.sort_by(|a, b| a.iter().next().cmp(&b.iter().next()));
        sets
    }
}

impl<Id> DebugInvariants for SparseUnionFind<Id>
where
    Id: Clone + Eq + Hash + Ord + std::fmt::Debug,
{
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "SparseUnionFind");
    }

    fn validate_invariants(&self) -> Result<(), TrackError> {
        let n = self.parent.len();
        let mut root_total = 0usize;
        for (id, p) in &self.parent {
            if !self.parent.contains_key(p) {
                return Err(TrackError::InvariantViolation(format!(
                    "parent {p:?} of {id:?} is not registered"
                )));
            }
            let mut x = id;
            let mut steps = 0usize;
            while let Some(next) = self.parent.get(x) {
                if next == x {
                    break;
                }
                x = next;
                steps += 1;
                if steps > n {
                    return Err(TrackError::InvariantViolation(format!(
                        "parent chain from {id:?} does not terminate"
                    )));
                }
            }
            if p == id {
                root_total += self.size.get(id).copied().unwrap_or(0);
            }
        }
        if root_total != n {
            return Err(TrackError::InvariantViolation(format!(
                "root sizes sum to {root_total}, expected {n}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_degrade_gracefully() {
        let mut uf = SparseUnionFind::<u64>::new();
        assert_eq!(uf.find(42), 42);
        assert_eq!(uf.parent(&42), 42);
        assert!(!uf.is_root(&42));
        uf.add(1);
        assert!(!uf.unite(1, 42));
        assert!(!uf.unite(42, 1));
    }

    #[test]
    fn re_add_is_a_noop() {
        let mut uf = SparseUnionFind::<u64>::with_ids([1, 2, 3]);
        assert!(uf.unite(1, 2));
        assert!(!uf.add(2));
        assert!(!uf.add(1));
        assert!(uf.same_set(1, 2));
        assert_eq!(uf.size_of(1), 2);
        uf.validate_invariants().unwrap();
    }

    #[test]
    fn self_union_and_repeated_union_keep_sizes() {
        let mut uf = SparseUnionFind::<u64>::with_ids([1, 2]);
        assert!(uf.unite(1, 1));
        assert_eq!(uf.size_of(1), 1);
        assert!(uf.unite(1, 2));
        assert!(uf.unite(2, 1));
        assert_eq!(uf.size_of(2), 2);
        uf.validate_invariants().unwrap();
    }

    #[test]
    fn smaller_tree_goes_under_larger() {
        let mut uf = SparseUnionFind::<u64>::with_ids(1..=4);
        uf.unite(1, 2);
        uf.unite(1, 3);
        let big_root = uf.find(1);
        uf.unite(4, 1);
        assert_eq!(uf.find(4), big_root);
    }

    #[test]
    fn path_halving_shortens_chains() {
        let mut uf = SparseUnionFind::<u64>::with_ids(0..8);
        // Build a chain 0 <- 1 <- ... by hand through set_parent-like unions.
        for i in 1..8 {
            uf.parent.insert(i, i - 1);
            uf.size.insert(0, i as usize + 1);
        }
        let root = uf.find(7);
        assert_eq!(root, 0);
        // After one halving pass, 7 points two levels higher.
        assert_eq!(uf.parent(&7), 5);
        uf.validate_invariants().unwrap();
    }

    #[test]
    fn string_ids_work() {
        let mut uf = SparseUnionFind::<String>::new();
        uf.add("a".into());
        uf.add("b".into());
        uf.add("c".into());
        assert!(uf.unite("a".into(), "c".into()));
        let sets = uf.get_sets();
        assert_eq!(sets.len(), 2);
        assert!(sets[0].contains("a") && sets[0].contains("c"));
    }

    #[test]
    fn get_sets_reflects_compressed_state() {
        let mut uf = SparseUnionFind::<u32>::with_ids([5, 1, 9, 3]);
        uf.unite(5, 9);
        uf.unite(3, 1);
        let sets = uf.get_sets();
        let expected: Vec<BTreeSet<u32>> =
            vec![[1, 3].into_iter().collect(), [5, 9].into_iter().collect()];
        assert_eq!(sets, expected);
    }
}
