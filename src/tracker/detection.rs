//! Concurrent detection map: element id -> feature record.
//!
//! One `parking_lot::Mutex` guards the records, the forest the records are
//! registered in, and the set of related cells. Producers compute everything
//! they can (location, related cells) before taking the lock.
//!
//! Elements whose feature was dropped by the type filter are remembered
//! separately: they still count as hits of their cells when the cells are
//! checked for regularity, but they never become points.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;
use serde::Serialize;

use crate::data::feature::FeatureRecord;
use crate::numeric::predicate::PredicateCounts;
use crate::topology::ids::ElementId;
use crate::topology::union_find::SparseUnionFind;

/// Counters of recoverable anomalies and escalations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub detections: usize,
    pub predicate: PredicateCounts,
    pub degenerate_locations: usize,
    pub duplicate_inserts: usize,
    pub filtered: usize,
    pub irregular_cells: usize,
    pub incomplete_cells: usize,
}

#[derive(Debug, Default)]
pub struct DetectionState {
    pub records: BTreeMap<ElementId, FeatureRecord>,
    pub forest: SparseUnionFind<ElementId>,
    pub related: BTreeSet<ElementId>,
    /// Detected but filtered out by feature type.
    pub filtered: BTreeSet<ElementId>,
    pub duplicates: usize,
}

#[derive(Debug, Default)]
pub struct DetectionMap {
    state: Mutex<DetectionState>,
}

impl DetectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` unless its element already has one (the first writer
    /// wins). Related cells are recorded either way.
    ///
    /// Returns `true` if the record was stored.
    pub fn insert<I>(&self, record: FeatureRecord, related: I) -> bool
    where
        I: IntoIterator<Item = ElementId>,
    {
        let mut st = self.state.lock();
        st.related.extend(related);
        let id = record.element;
        if st.records.contains_key(&id) {
            st.duplicates += 1;
            return false;
        }
        st.records.insert(id, record);
        st.forest.add(id);
        true
    }

    /// Remember that `id` carried a feature the type filter dropped.
    pub fn mark_filtered(&self, id: ElementId) {
        self.state.lock().filtered.insert(id);
    }

    pub fn filtered_ids(&self) -> Vec<ElementId> {
        self.state.lock().filtered.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.state.lock().records.contains_key(&id)
    }

    pub fn get(&self, id: ElementId) -> Option<FeatureRecord> {
        self.state.lock().records.get(&id).cloned()
    }

    /// All records ordered by element id.
    pub fn records(&self) -> Vec<FeatureRecord> {
        self.state.lock().records.values().cloned().collect()
    }

    pub fn element_ids(&self) -> Vec<ElementId> {
        self.state.lock().records.keys().copied().collect()
    }

    pub fn duplicates(&self) -> usize {
        self.state.lock().duplicates
    }

    /// Run `f` with exclusive access to the whole state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut DetectionState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn clear(&self) {
        *self.state.lock() = DetectionState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::feature::FeatureType;
    use rayon::prelude::*;

    fn rec(id: u64, scalar: f64) -> FeatureRecord {
        FeatureRecord {
            x: [0.0; 3],
            t: 0.0,
            scalar,
            kind: FeatureType::Saddle,
            element: ElementId(id),
            ordinal: true,
            timestep: 0,
        }
    }

    #[test]
    fn first_writer_wins() {
        let map = DetectionMap::new();
        assert!(map.insert(rec(5, 1.0), [ElementId(50)]));
        assert!(!map.insert(rec(5, 2.0), [ElementId(51)]));
        assert_eq!(map.get(ElementId(5)).map(|r| r.scalar), Some(1.0));
        assert_eq!(map.duplicates(), 1);
        map.with_state(|st| {
            assert_eq!(st.related.len(), 2);
            assert!(st.forest.has(&ElementId(5)));
        });
    }

    #[test]
    fn concurrent_inserts_keep_one_record_per_element() {
        let map = DetectionMap::new();
        (0..1000u64).into_par_iter().for_each(|i| {
            map.insert(rec(i % 100, i as f64), std::iter::empty());
        });
        assert_eq!(map.len(), 100);
        assert_eq!(map.duplicates(), 900);
        assert_eq!(map.element_ids(), (0..100).map(ElementId).collect::<Vec<_>>());
    }
}
