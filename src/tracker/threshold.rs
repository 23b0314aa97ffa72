//! Vertex-based blob tracking on a scalar threshold.
//!
//! Space-time vertices whose scalar is at or above the threshold are joined
//! with their spatial neighbours above threshold (ordinal edges) and with
//! their own copy at the next timestep (vertical interval edges). Each
//! connected component is one blob followed through time.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;

use crate::config::EnumeratorConfig;
use crate::data::snapshot::FieldSnapshot;
use crate::topology::enumerator::ElementEnumerator;
use crate::topology::ids::{ElementId, VertexId};
use crate::topology::mesh::SpaceTimeMesh;
use crate::topology::union_find::SparseUnionFind;
use crate::track_error::TrackError;

pub struct ThresholdTracker<'m, M: SpaceTimeMesh> {
    mesh: &'m M,
    threshold: f64,
    enumerator: ElementEnumerator<'m, M>,
    forest: Mutex<SparseUnionFind<VertexId>>,
    ordinal_done: BTreeSet<usize>,
    current_t: usize,
}

impl<'m, M: SpaceTimeMesh> ThresholdTracker<'m, M> {
    pub fn new(mesh: &'m M, threshold: f64, config: &EnumeratorConfig) -> Result<Self, TrackError> {
        if !threshold.is_finite() {
            return Err(TrackError::InvalidConfig(format!(
                "threshold must be finite, got {threshold}"
            )));
        }
        Ok(Self {
            mesh,
            threshold,
            enumerator: ElementEnumerator::new(mesh, config)?,
            forest: Mutex::new(SparseUnionFind::new()),
            ordinal_done: BTreeSet::new(),
            current_t: 0,
        })
    }

    pub fn current_timestep(&self) -> usize {
        self.current_t
    }

    pub fn push_snapshot(&mut self, snapshot: FieldSnapshot) -> Result<(), TrackError> {
        let t = self.current_t + self.enumerator.window().len();
        self.enumerator.push_snapshot(t, snapshot)
    }

    fn above(&self, v: VertexId) -> Result<bool, TrackError> {
        let t = self.mesh.vertex_timestep(v);
        let snap = self
            .enumerator
            .window()
            .get(t)
            .ok_or(TrackError::VertexOutsideWindow { vertex: v, timestep: t })?;
        Ok(snap.scalar_at(self.mesh.base_vertex(v))? >= self.threshold)
    }

    fn edge(&self, id: ElementId) -> Result<[VertexId; 2], TrackError> {
        self.mesh.get_simplex::<2>(id)
    }

    pub fn update_timestep(&mut self) -> Result<(), TrackError> {
        let t = self.current_t;
        let held = self.enumerator.window().len();
        if self.enumerator.window().first_timestep() != Some(t) {
            return Err(TrackError::InsufficientSnapshots { held });
        }
        if !self.ordinal_done.contains(&t) {
            self.enumerator.element_for_ordinal(0, t, |id| {
                let [v] = self.mesh.get_simplex::<1>(id)?;
                if self.above(v)? {
                    self.forest.lock().add(v);
                }
                Ok(())
            })?;
            self.enumerator.element_for_ordinal(1, t, |id| {
                let [a, b] = self.edge(id)?;
                if self.above(a)? && self.above(b)? {
                    self.forest.lock().unite(a, b);
                }
                Ok(())
            })?;
            self.ordinal_done.insert(t);
        }
        if held >= 2 {
            let next = t + 1;
            self.enumerator.element_for_ordinal(0, next, |id| {
                let [v] = self.mesh.get_simplex::<1>(id)?;
                if self.above(v)? {
                    self.forest.lock().add(v);
                }
                Ok(())
            })?;
            self.enumerator.element_for_interval(1, t, |id| {
                let [a, b] = self.edge(id)?;
                if self.mesh.base_vertex(a) == self.mesh.base_vertex(b)
                    && self.above(a)?
                    && self.above(b)?
                {
                    self.forest.lock().unite(a, b);
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    pub fn advance_timestep(&mut self) {
        self.enumerator.pop_snapshot();
        self.current_t += 1;
    }

    pub fn track<I>(&mut self, snapshots: I) -> Result<(), TrackError>
    where
        I: IntoIterator<Item = FieldSnapshot>,
    {
        for snapshot in snapshots {
            self.push_snapshot(snapshot)?;
            if self.enumerator.window().len() == 2 {
                self.update_timestep()?;
                self.advance_timestep();
            }
        }
        if !self.enumerator.window().is_empty() {
            self.update_timestep()?;
        }
        Ok(())
    }

    /// Blobs as sets of space-time vertices, ordered by smallest vertex.
    pub fn components(&self) -> Vec<BTreeSet<VertexId>> {
        self.forest.lock().get_sets()
    }

    /// Component index of every above-threshold base vertex at timestep `t`.
    pub fn labels_at(&self, t: usize) -> BTreeMap<usize, usize> {
        let mut labels = BTreeMap::new();
        for (c, set) in self.components().into_iter().enumerate() {
            for v in set {
                if self.mesh.vertex_timestep(v) == t {
                    labels.insert(self.mesh.base_vertex(v), c);
                }
            }
        }
        labels
    }
}
