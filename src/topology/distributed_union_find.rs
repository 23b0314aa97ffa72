//! Union-find over elements whose ownership spans several blocks.
//!
//! Each block holds a [`DistributedUnionFind`] with the elements it detected
//! (owned) plus ghost copies learned from other blocks. Parent pointers may name
//! ids that are not registered locally; such ids act as *remote roots* until an
//! exchange registers them. [`crate::algs::union_exchange::exchange_unions`]
//! ships [`DistributedUnionFind::known_unions`] to every peer and feeds what it
//! receives into [`DistributedUnionFind::replay`] until no block changes.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;

use hashbrown::HashMap;

use crate::debug_invariants::DebugInvariants;
use crate::track_error::TrackError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OwnershipEntry {
    pub owner: usize,
    pub is_ghost: bool,
}

/// One parent link as exchanged between blocks: `(id, parent, id_owner, parent_owner)`.
///
/// An owner is `None` when the sending block never learned it, e.g. for a
/// remote root registered by a union.
pub type UnionLink<Id> = (Id, Id, Option<usize>, Option<usize>);

#[derive(Debug, Clone)]
pub struct DistributedUnionFind<Id> {
    rank: usize,
    parent: HashMap<Id, Id>,
    size: HashMap<Id, usize>,
    ownership: HashMap<Id, OwnershipEntry>,
}

impl<Id> DistributedUnionFind<Id>
where
    Id: Copy + Eq + Hash + Ord + Debug,
{
    pub fn new(rank: usize) -> Self {
        Self {
            rank,
            parent: HashMap::new(),
            size: HashMap::new(),
            ownership: HashMap::new(),
        }
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Register `id` owned by `owner`. A ghost is any id owned by another rank.
    ///
    /// Returns `false` if `id` was already registered; a missing ownership
    /// entry is filled in, an existing one keeps the smallest owner.
    pub fn add(&mut self, id: Id, owner: usize) -> bool {
        let entry = match self.ownership.get(&id) {
            Some(e) => e.owner.min(owner),
            None => owner,
        };
        self.ownership.insert(
            id,
            OwnershipEntry {
                owner: entry,
                is_ghost: entry != self.rank,
            },
        );
        self.register(id)
    }

    /// Register an element owned by this block.
    pub fn add_local(&mut self, id: Id) -> bool {
        self.add(id, self.rank)
    }

    fn register(&mut self, id: Id) -> bool {
        if self.parent.contains_key(&id) {
            return false;
        }
        self.parent.insert(id, id);
        self.size.insert(id, 1);
        true
    }

    #[inline]
    pub fn has(&self, id: &Id) -> bool {
        self.parent.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn ownership(&self, id: &Id) -> Option<OwnershipEntry> {
        self.ownership.get(id).copied()
    }

    pub fn owner(&self, id: &Id) -> Option<usize> {
        self.ownership.get(id).map(|e| e.owner)
    }

    pub fn is_ghost(&self, id: &Id) -> Option<bool> {
        self.ownership.get(id).map(|e| e.is_ghost)
    }

    /// Ids owned by this block, sorted.
    pub fn owned_ids(&self) -> Vec<Id> {
        let mut ids: Vec<Id> = self
            .ownership
            .iter()
            .filter(|(_, e)| !e.is_ghost)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Current parent pointer; an unknown id is its own parent.
    pub fn parent(&self, id: &Id) -> Id {
        self.parent.get(id).copied().unwrap_or(*id)
    }

    /// Rewrite the parent pointer of a registered `id`.
    ///
    /// `parent` does not have to be registered; it then acts as a remote root.
    /// Returns `false` if `id` is unknown.
    pub fn set_parent(&mut self, id: Id, parent: Id) -> bool {
        match self.parent.get_mut(&id) {
            Some(slot) => {
                *slot = parent;
                true
            }
            None => false,
        }
    }

    /// `true` if `id` is registered and points at itself.
    pub fn is_root(&self, id: &Id) -> bool {
        self.parent.get(id).is_some_and(|p| p == id)
    }

    /// Root of `id` with path halving. The walk stops at a self-parented id
    /// or at a parent that is not registered here (a remote root).
    pub fn find(&mut self, id: Id) -> Id {
        let mut x = id;
        loop {
            let p = match self.parent.get(&x) {
                Some(&p) if p != x => p,
                _ => return x,
            };
            let gp = match self.parent.get(&p) {
                Some(&gp) => gp,
                None => return p,
            };
            if let Some(slot) = self.parent.get_mut(&x) {
                *slot = gp;
            }
            if gp == p {
                return p;
            }
            x = gp;
        }
    }

    /// Union by size. Remote roots are registered on first use so both sides
    /// of the link live in this forest afterwards.
    ///
    /// Returns `false` if either id is unknown, `true` otherwise (including
    /// when both already share a set).
    pub fn unite(&mut self, a: Id, b: Id) -> bool {
        if !self.has(&a) || !self.has(&b) {
            return false;
        }
        let ra = self.find(a);
        let rb = self.find(b);
        self.register(ra);
        self.register(rb);
        self.link_roots(ra, rb);
        true
    }

    /// Returns `true` if the two roots were different and got merged.
    fn link_roots(&mut self, ra: Id, rb: Id) -> bool {
        if ra == rb {
            return false;
        }
        let sa = self.size.get(&ra).copied().unwrap_or(1);
        let sb = self.size.get(&rb).copied().unwrap_or(1);
        if sa < sb {
            self.parent.insert(ra, rb);
            self.size.insert(rb, sa + sb);
        } else {
            self.parent.insert(rb, ra);
            self.size.insert(ra, sa + sb);
        }
        true
    }

    pub fn same_set(&mut self, a: Id, b: Id) -> bool {
        self.find(a) == self.find(b)
    }

    /// Every non-root id with its current root and the owners of both.
    ///
    /// Sorted by id, so the payload a block sends does not depend on hash order.
    /// Ids without an ownership entry here carry no owner claim.
    pub fn known_unions(&mut self) -> Vec<UnionLink<Id>> {
        let mut ids: Vec<Id> = self.parent.keys().copied().collect();
        ids.sort_unstable();
        let mut out = Vec::new();
        for id in ids {
            let root = self.find(id);
            if root != id {
                out.push((id, root, self.owner(&id), self.owner(&root)));
            }
        }
        out
    }

    /// Register `id`, recording `owner` only when one was shipped.
    fn claim(&mut self, id: Id, owner: Option<usize>) -> bool {
        match owner {
            Some(o) => self.add(id, o),
            None => self.register(id),
        }
    }

    /// Fold links learned from another block into this forest.
    ///
    /// Returns how many links changed local state (a newly registered id or a
    /// merge of two distinct sets). Zero means the links were already known.
    pub fn replay<I>(&mut self, links: I) -> usize
    where
        I: IntoIterator<Item = UnionLink<Id>>,
    {
        let mut changed = 0usize;
        for (id, parent, id_owner, parent_owner) in links {
            let mut touched = false;
            touched |= self.claim(id, id_owner);
            touched |= self.claim(parent, parent_owner);
            let ra = self.find(id);
            let rb = self.find(parent);
            self.register(ra);
            self.register(rb);
            touched |= self.link_roots(ra, rb);
            if touched {
                changed += 1;
            }
        }
        changed
    }

    /// Group registered ids by root, ordered by each set's smallest member.
    pub fn get_sets(&mut self) -> Vec<BTreeSet<Id>> {
        let ids: Vec<Id> = self.parent.keys().copied().collect();
        let mut groups: HashMap<Id, BTreeSet<Id>> = HashMap::new();
        for id in ids {
            let root = self.find(id);
            groups.entry(root).or_default().insert(id);
        }
        let mut sets: Vec<BTreeSet<Id>> = groups.into_values().collect();
        sets.sort_by(|a, b| a.iter().next().cmp(&b.iter().next()));
        sets
    }
}

impl<Id> DebugInvariants for DistributedUnionFind<Id>
where
    Id: Copy + Eq + Hash + Ord + Debug,
{
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "DistributedUnionFind");
    }

    fn validate_invariants(&self) -> Result<(), TrackError> {
        let n = self.parent.len();
        for id in self.parent.keys() {
            let mut x = *id;
            let mut steps = 0usize;
            while let Some(&p) = self.parent.get(&x) {
                if p == x {
                    break;
                }
                x = p;
                steps += 1;
                if steps > n {
                    return Err(TrackError::InvariantViolation(format!(
                        "parent chain from {id:?} does not terminate"
                    )));
                }
            }
        }
        for (id, e) in &self.ownership {
            if !self.parent.contains_key(id) {
                return Err(TrackError::InvariantViolation(format!(
                    "ownership recorded for unregistered id {id:?}"
                )));
            }
            if e.is_ghost != (e.owner != self.rank) {
                return Err(TrackError::InvariantViolation(format!(
                    "ghost flag of {id:?} disagrees with owner {}",
                    e.owner
                )));
            }
        }
        Ok(())
    }
}
