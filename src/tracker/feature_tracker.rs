//! Streaming driver: snapshots in, trajectories or surfaces out.
//!
//! The tracker keeps the two-snapshot window at timesteps
//! `current_timestep()` and `current_timestep() + 1`. Each
//! [`update_timestep`](FeatureTracker::update_timestep) runs the ordinal pass at
//! the current timestep (once) and, when both snapshots are present, the
//! interval pass of the slab. [`advance_timestep`](FeatureTracker::advance_timestep)
//! drops the older snapshot. [`finalize`](FeatureTracker::finalize) connects the
//! detections.
//!
//! ```
//! use spacetime_track::prelude::*;
//!
//! let base = structured_triangles_2d(4, 4, [0.0, 0.0], [1.0, 1.0]).unwrap();
//! let mesh = ExtrudedMesh::new(base);
//! let n = mesh.n(0);
//! let snapshots = (0..3).map(|t| {
//!     let cx = 0.31 + 0.1 * t as f64;
//!     let v = (0..n)
//!         .map(|i| {
//!             let [x, y, _] = mesh.base().coords(i);
//!             [x - cx, y - 0.47]
//!         })
//!         .collect();
//!     FieldSnapshot::new().with_vector(v)
//! });
//! let mut tracker = FeatureTracker::new(&mesh, TrackerConfig::default()).unwrap();
//! let result = tracker.track(snapshots).unwrap();
//! assert_eq!(result.trajectories().unwrap().len(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::TrackerConfig;
use crate::data::feature::{FeatureKind, FeatureRecord, TrackingResult};
use crate::data::snapshot::FieldSnapshot;
use crate::io::checkpoint::{CHECKPOINT_VERSION, DetectionCheckpoint};
use crate::numeric::predicate::RobustPredicate;
use crate::topology::enumerator::ElementEnumerator;
use crate::topology::ids::{ElementId, VertexId};
use crate::topology::mesh::SpaceTimeMesh;
use crate::track_error::TrackError;
use crate::tracker::correspondence::{
    CorrespondenceBuilder, ProcessedSlabs, build_surface, build_trajectories, related_cells,
};
use crate::tracker::detection::{DetectionMap, Diagnostics};
use crate::tracker::locator::{FeatureLocator, Located};

pub struct FeatureTracker<'m, M: SpaceTimeMesh> {
    mesh: &'m M,
    config: TrackerConfig,
    enumerator: ElementEnumerator<'m, M>,
    predicate: RobustPredicate,
    locator: FeatureLocator,
    detections: DetectionMap,
    processed: ProcessedSlabs,
    current_t: usize,
    filtered: AtomicUsize,
    irregular: usize,
    incomplete: usize,
}

impl<'m, M: SpaceTimeMesh> FeatureTracker<'m, M> {
    /// Validates the configuration, the mesh dimension for the feature kind and
    /// the periodic setup.
    pub fn new(mesh: &'m M, config: TrackerConfig) -> Result<Self, TrackError> {
        config.validate()?;
        if mesh.max_dim() != config.kind.mesh_dim() {
            return Err(TrackError::UnsupportedDimension(mesh.max_dim()));
        }
        let configured = config.locator.periodic_planes;
        if configured != mesh.periodic_planes() {
            return Err(TrackError::InconsistentPeriodicity {
                configured,
                mesh: mesh.periodic_planes(),
            });
        }
        Ok(Self {
            mesh,
            enumerator: ElementEnumerator::new(mesh, &config.enumerator)?,
            predicate: RobustPredicate::new(config.predicate.clone())?,
            locator: FeatureLocator::new(config.locator.clone()),
            config,
            detections: DetectionMap::new(),
            processed: ProcessedSlabs::default(),
            current_t: 0,
            filtered: AtomicUsize::new(0),
            irregular: 0,
            incomplete: 0,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn current_timestep(&self) -> usize {
        self.current_t
    }

    /// Jump to `t`. Only valid while no snapshot is held.
    pub fn set_current_timestep(&mut self, t: usize) -> Result<(), TrackError> {
        if !self.enumerator.window().is_empty() {
            return Err(TrackError::InvalidConfig(format!(
                "cannot move to timestep {t} while {} snapshots are held",
                self.enumerator.window().len()
            )));
        }
        self.current_t = t;
        Ok(())
    }

    /// Append the next snapshot, for timestep `current + held`.
    pub fn push_snapshot(&mut self, snapshot: FieldSnapshot) -> Result<(), TrackError> {
        let t = self.current_t + self.enumerator.window().len();
        self.enumerator.push_snapshot(t, snapshot)
    }

    pub fn pop_snapshot(&mut self) -> Option<(usize, FieldSnapshot)> {
        self.enumerator.pop_snapshot()
    }

    /// Run the traversals available for the current timestep.
    pub fn update_timestep(&mut self) -> Result<(), TrackError> {
        let t = self.current_t;
        let held = self.enumerator.window().len();
        if self.enumerator.window().first_timestep() != Some(t) {
            return Err(TrackError::InsufficientSnapshots { held });
        }
        let dim = self.config.kind.feature_dim();

        if !self.processed.ordinal.contains(&t) {
            let n = self
                .enumerator
                .element_for_ordinal(dim, t, |id| self.check_element(dim, id, true))?;
            log::debug!("timestep {t}: checked {n} ordinal elements");
            self.processed.ordinal.insert(t);
        }
        if held >= 2 && !self.processed.interval.contains(&t) {
            let n = self
                .enumerator
                .element_for_interval(dim, t, |id| self.check_element(dim, id, false))?;
            log::debug!("slab {t}: checked {n} interval elements");
            self.processed.interval.insert(t);
        }
        Ok(())
    }

    /// Drop the older snapshot and move to the next timestep.
    pub fn advance_timestep(&mut self) {
        self.enumerator.pop_snapshot();
        self.current_t += 1;
    }

    /// Feed a whole stream of snapshots and finalize.
    pub fn track<I>(&mut self, snapshots: I) -> Result<TrackingResult, TrackError>
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
        self.finalize()
    }

    /// Connect the detections made so far.
    pub fn finalize(&mut self) -> Result<TrackingResult, TrackError> {
        let kind = self.config.kind;
        let builder = CorrespondenceBuilder::new(self.mesh, kind, self.config.strict_topology);
        let processed = &self.processed;
        let config = &self.config;
        let (result, corr) = self.detections.with_state(|st| {
            let corr = builder.connect(st, processed)?;
            let result = if kind.produces_surfaces() {
                TrackingResult::Surface(build_surface(st, &corr.triangles))
            } else {
                TrackingResult::Trajectories(build_trajectories(st, &corr.pairs, config))
            };
            Ok::<_, TrackError>((result, corr))
        })?;
        self.irregular = corr.irregular;
        self.incomplete = corr.incomplete;
        log::info!("finalize: {:?}", self.diagnostics());
        Ok(result)
    }

    pub fn detections(&self) -> &DetectionMap {
        &self.detections
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            detections: self.detections.len(),
            predicate: self.predicate.counts(),
            degenerate_locations: self.locator.degenerate_count(),
            duplicate_inserts: self.detections.duplicates(),
            filtered: self.filtered.load(Ordering::Relaxed),
            irregular_cells: self.irregular,
            incomplete_cells: self.incomplete,
        }
    }

    pub fn checkpoint(&self) -> DetectionCheckpoint {
        DetectionCheckpoint {
            version: CHECKPOINT_VERSION,
            current_timestep: self.current_t,
            ordinal_done: self.processed.ordinal.iter().copied().collect(),
            interval_done: self.processed.interval.iter().copied().collect(),
            records: self.detections.records(),
            filtered: self.detections.filtered_ids(),
        }
    }

    /// Replace the detections with those of `checkpoint` and resume at its
    /// timestep. Held snapshots are dropped.
    pub fn restore_detections(&mut self, checkpoint: DetectionCheckpoint) -> Result<(), TrackError> {
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(TrackError::Checkpoint(format!(
                "unsupported checkpoint version {}",
                checkpoint.version
            )));
        }
        let dim = self.config.kind.feature_dim();
        let cell_dim = self.config.kind.cell_dim();
        self.detections.clear();
        for rec in checkpoint.records {
            let related = related_cells(self.mesh, dim, cell_dim, rec.element)?;
            self.detections.insert(rec, related);
        }
        for id in checkpoint.filtered {
            self.detections.mark_filtered(id);
        }
        self.processed = ProcessedSlabs {
            ordinal: checkpoint.ordinal_done.into_iter().collect(),
            interval: checkpoint.interval_done.into_iter().collect(),
        };
        while self.enumerator.pop_snapshot().is_some() {}
        self.current_t = checkpoint.current_timestep;
        Ok(())
    }

    fn snapshot_of(&self, v: VertexId) -> Result<&FieldSnapshot, TrackError> {
        let t = self.mesh.vertex_timestep(v);
        self.enumerator
            .window()
            .get(t)
            .ok_or(TrackError::VertexOutsideWindow { vertex: v, timestep: t })
    }

    fn check_element(&self, dim: usize, id: ElementId, ordinal: bool) -> Result<(), TrackError> {
        let located = match self.config.kind {
            FeatureKind::CriticalPoints | FeatureKind::Filaments => self.check_triangle(id)?,
            FeatureKind::Contours => self.check_edge(id)?,
        };
        let Some(loc) = located else {
            return Ok(());
        };
        if !self.config.type_filter.contains(loc.kind) {
            self.filtered.fetch_add(1, Ordering::Relaxed);
            self.detections.mark_filtered(id);
            return Ok(());
        }
        let related = related_cells(self.mesh, dim, self.config.kind.cell_dim(), id)?;
        let record = FeatureRecord {
            x: loc.x,
            t: loc.t,
            scalar: loc.scalar,
            kind: loc.kind,
            element: id,
            ordinal,
            timestep: self.mesh.element_timestep(dim, id),
        };
        self.detections.insert(record, related);
        Ok(())
    }

    fn check_triangle(&self, id: ElementId) -> Result<Option<Located>, TrackError> {
        let verts: [VertexId; 3] = self.mesh.get_simplex::<3>(id)?;
        let mut values = [[0.0; 2]; 3];
        let mut scalars = Some([0.0; 3]);
        let mut jacobians = Some([[[0.0; 2]; 2]; 3]);
        for (k, &v) in verts.iter().enumerate() {
            let snap = self.snapshot_of(v)?;
            let b = self.mesh.base_vertex(v);
            values[k] = snap.vector_at(b)?;
            match (scalars.as_mut(), snap.scalar.as_ref().and_then(|s| s.get(b))) {
                (Some(out), Some(&s)) => out[k] = s,
                _ => scalars = None,
            }
            match (jacobians.as_mut(), snap.jacobian_at(b)) {
                (Some(out), Some(j)) => out[k] = j,
                _ => jacobians = None,
            }
        }
        if !self
            .predicate
            .vector_zero_in_triangle(verts.map(VertexId::get), values)?
        {
            return Ok(None);
        }
        let coords = self.locator.vertex_coords(self.mesh, &verts);
        Ok(Some(self.locator.locate_triangle(&coords, values, scalars, jacobians)))
    }

    fn check_edge(&self, id: ElementId) -> Result<Option<Located>, TrackError> {
        let verts: [VertexId; 2] = self.mesh.get_simplex::<2>(id)?;
        let mut values = [0.0; 2];
        for (k, &v) in verts.iter().enumerate() {
            values[k] = self.snapshot_of(v)?.scalar_at(self.mesh.base_vertex(v))?;
        }
        if !self.predicate.level_crossing_on_edge(values)? {
            return Ok(None);
        }
        let coords = self.locator.vertex_coords(self.mesh, &verts);
        Ok(Some(self.locator.locate_edge(&coords, values, self.config.predicate.level)))
    }
}
