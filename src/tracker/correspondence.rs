//! Connecting detections that belong to the same physical feature.
//!
//! Every detected feature registers the *cells* around it: the simplices of
//! the cell dimension reachable by repeatedly taking cofaces. At finalize each
//! related cell from a fully traversed slab is inspected: its faces of the
//! feature dimension that carry a detection are its *hits*.
//!
//! * Trajectory mode (cell = feature dim + 1): a cell with exactly 2 hits
//!   joins them.
//! * Surface mode (cell = feature dim + 2): 3 to 5 hits are put in cyclic order
//!   (neighbours share a facet of the cell), fan-triangulated and joined.
//!
//! Anything else is an irregular cell. Faces whose feature the type filter
//! dropped count as hits for this check; only kept records are joined.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use itertools::Itertools;

use crate::config::TrackerConfig;
use crate::data::feature::{FeatureKind, FeatureRecord, FeatureSurface, Trajectory};
use crate::topology::ids::ElementId;
use crate::topology::mesh::SpaceTimeMesh;
use crate::topology::union_find::SparseUnionFind;
use crate::track_error::TrackError;
use crate::tracker::detection::DetectionState;

/// Timesteps whose ordinal and interval passes have run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessedSlabs {
    pub ordinal: BTreeSet<usize>,
    pub interval: BTreeSet<usize>,
}

impl ProcessedSlabs {
    /// Whether every face of `cell` has been visited by some traversal.
    pub fn cell_complete<M: SpaceTimeMesh>(&self, mesh: &M, dim: usize, cell: ElementId) -> bool {
        let t = mesh.element_timestep(dim, cell);
        if mesh.is_ordinal(dim, cell) {
            self.ordinal.contains(&t)
        } else {
            self.ordinal.contains(&t)
                && self.ordinal.contains(&(t + 1))
                && self.interval.contains(&t)
        }
    }
}

/// Cells of dimension `cell_dim` containing the `dim`-simplex `id`, sorted.
pub fn related_cells<M: SpaceTimeMesh>(
    mesh: &M,
    dim: usize,
    cell_dim: usize,
    id: ElementId,
) -> Result<Vec<ElementId>, TrackError> {
    let mut frontier = vec![id];
    for d in dim..cell_dim {
        let mut next = Vec::new();
        for e in frontier {
            next.extend(mesh.sides(d, e)?);
        }
        next.sort_unstable();
        next.dedup();
        frontier = next;
    }
    Ok(frontier)
}

/// Faces of dimension `feature_dim` of `cell` for which `is_hit` holds, sorted.
pub fn cell_hits<M, F>(
    mesh: &M,
    cell_dim: usize,
    cell: ElementId,
    feature_dim: usize,
    is_hit: F,
) -> Result<Vec<ElementId>, TrackError>
where
    M: SpaceTimeMesh,
    F: Fn(&ElementId) -> bool,
{
    let verts = mesh.simplex_vertices(cell_dim, cell)?;
    let mut hits = Vec::new();
    for face in verts.into_iter().combinations(feature_dim + 1) {
        if let Some(id) = mesh.element_id(&face) {
            if is_hit(&id) {
                hits.push(id);
            }
        }
    }
    hits.sort_unstable();
    Ok(hits)
}

/// Unions and primitives discovered at finalize.
#[derive(Clone, Debug, Default)]
pub struct Correspondence {
    pub pairs: Vec<(ElementId, ElementId)>,
    pub triangles: Vec<[ElementId; 3]>,
    pub irregular: usize,
    pub incomplete: usize,
}

pub struct CorrespondenceBuilder<'a, M: SpaceTimeMesh> {
    mesh: &'a M,
    kind: FeatureKind,
    strict: bool,
}

impl<'a, M: SpaceTimeMesh> CorrespondenceBuilder<'a, M> {
    pub fn new(mesh: &'a M, kind: FeatureKind, strict: bool) -> Self {
        Self { mesh, kind, strict }
    }

    /// Inspect every related cell and union the hits in `state.forest`.
    pub fn connect(
        &self,
        state: &mut DetectionState,
        processed: &ProcessedSlabs,
    ) -> Result<Correspondence, TrackError> {
        let cell_dim = self.kind.cell_dim();
        let feature_dim = self.kind.feature_dim();
        let mut out = Correspondence::default();
        let cells: Vec<ElementId> = state.related.iter().copied().collect();

        for cell in cells {
            if !processed.cell_complete(self.mesh, cell_dim, cell) {
                out.incomplete += 1;
                continue;
            }
            let hits = cell_hits(self.mesh, cell_dim, cell, feature_dim, |id| {
                state.records.contains_key(id) || state.filtered.contains(id)
            })?;
            if hits.is_empty() {
                continue;
            }
            let ordered = if self.kind.produces_surfaces() {
                match hits.len() {
                    3..=5 => self.cyclic_order(&hits, cell_dim)?,
                    _ => None,
                }
            } else if hits.len() == 2 {
                Some(hits.clone())
            } else {
                None
            };

            let Some(ordered) = ordered else {
                if self.strict {
                    return Err(TrackError::IrregularCell {
                        cell,
                        dim: cell_dim,
                        hits: hits.len(),
                    });
                }
                log::warn!("skipping cell {cell} (dim {cell_dim}) with {} hits", hits.len());
                out.irregular += 1;
                continue;
            };

            let kept: Vec<ElementId> = ordered
                .into_iter()
                .filter(|id| state.records.contains_key(id))
                .collect();
            for w in kept.windows(2) {
                state.forest.unite(w[0], w[1]);
            }
            if self.kind.produces_surfaces() {
                for i in 1..kept.len().saturating_sub(1) {
                    out.triangles.push([kept[0], kept[i], kept[i + 1]]);
                }
            } else if let [a, b] = kept[..] {
                out.pairs.push((a, b));
            }
        }
        Ok(out)
    }

    /// Order hits around the polygon they bound. `None` if they do not form a
    /// single cycle.
    fn cyclic_order(
        &self,
        hits: &[ElementId],
        cell_dim: usize,
    ) -> Result<Option<Vec<ElementId>>, TrackError> {
        let feature_dim = self.kind.feature_dim();
        let verts: Vec<BTreeSet<_>> = hits
            .iter()
            .map(|&h| {
                self.mesh
                    .simplex_vertices(feature_dim, h)
                    .map(|v| v.into_iter().collect::<BTreeSet<_>>())
            })
            .collect::<Result<_, _>>()?;
        let adjacent = |a: usize, b: usize| verts[a].union(&verts[b]).count() <= cell_dim;

        let n = hits.len();
        let mut order = vec![0usize];
        let mut used = vec![false; n];
        used[0] = true;
        while order.len() < n {
            let last = order[order.len() - 1];
            match (0..n).find(|&k| !used[k] && adjacent(last, k)) {
                Some(k) => {
                    used[k] = true;
                    order.push(k);
                }
                None => return Ok(None),
            }
        }
        if !adjacent(order[n - 1], order[0]) {
            return Ok(None);
        }
        Ok(Some(order.into_iter().map(|k| hits[k]).collect()))
    }
}

/// Component index of every registered element, numbered by each set's
/// smallest element.
fn component_labels(forest: &mut SparseUnionFind<ElementId>) -> HashMap<ElementId, usize> {
    let mut labels = HashMap::new();
    for (c, set) in forest.get_sets().into_iter().enumerate() {
        for id in set {
            labels.insert(id, c);
        }
    }
    labels
}

/// Walk each connected component into polylines ordered by time.
pub fn build_trajectories(
    state: &mut DetectionState,
    pairs: &[(ElementId, ElementId)],
    config: &TrackerConfig,
) -> Vec<Trajectory> {
    let mut adj: HashMap<ElementId, Vec<ElementId>> = HashMap::new();
    for &(a, b) in pairs {
        adj.entry(a).or_default().push(b);
        adj.entry(b).or_default().push(a);
    }
    for list in adj.values_mut() {
        list.sort_unstable();
        list.dedup();
    }
    let degree = |id: &ElementId| adj.get(id).map_or(0, Vec::len);

    let mut out = Vec::new();
    for (component, set) in state.forest.get_sets().into_iter().enumerate() {
        let mut unvisited: BTreeSet<ElementId> = set;
        while !unvisited.is_empty() {
            let start = unvisited
                .iter()
                .copied()
                .find(|id| {
                    adj.get(id)
                        .map_or(0, |n| n.iter().filter(|m| unvisited.contains(m)).count())
                        <= 1
                })
                .or_else(|| unvisited.iter().next().copied());
            let Some(mut cur) = start else { break };
            let mut path = Vec::new();
            loop {
                unvisited.remove(&cur);
                path.push(cur);
                let next = adj
                    .get(&cur)
                    .and_then(|n| n.iter().copied().find(|m| unvisited.contains(m)));
                match next {
                    Some(n) => cur = n,
                    None => break,
                }
            }
            if degree(&path[0]) > 2 {
                log::warn!("component {component} branches at {}", path[0]);
            }

            let mut points: Vec<FeatureRecord> = path
                .iter()
                .filter_map(|id| state.records.get(id).cloned())
                .collect();
            if let (Some(first), Some(last)) = (points.first(), points.last()) {
                if first.t > last.t {
                    points.reverse();
                }
            }
            let mut traj = Trajectory { component, points };
            if traj.duration() < config.duration_pruning_threshold {
                continue;
            }
            if config.discard_interval_points {
                traj.points.retain(|p| p.ordinal);
            }
            if !traj.is_empty() {
                out.push(traj);
            }
        }
    }
    out
}

/// Relabel detections into a point list and triangle indices.
pub fn build_surface(state: &mut DetectionState, triangles: &[[ElementId; 3]]) -> FeatureSurface {
    let labels = component_labels(&mut state.forest);
    let mut index: HashMap<ElementId, usize> = HashMap::with_capacity(state.records.len());
    let mut surface = FeatureSurface::default();
    for (id, rec) in &state.records {
        index.insert(*id, surface.points.len());
        surface.points.push(rec.clone());
        surface.component.push(labels.get(id).copied().unwrap_or(0));
    }
    let mut seen = BTreeSet::new();
    for tri in triangles {
        let mut key = *tri;
        key.sort_unstable();
        if !seen.insert(key) {
            continue;
        }
        if let (Some(&a), Some(&b), Some(&c)) = (index.get(&tri[0]), index.get(&tri[1]), index.get(&tri[2])) {
            surface.triangles.push([a, b, c]);
        }
    }
    surface
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::feature::FeatureType;

    fn rec(id: u64, t: f64, ordinal: bool) -> FeatureRecord {
        FeatureRecord {
            x: [0.0; 3],
            t,
            scalar: 0.0,
            kind: FeatureType::Maximum,
            element: ElementId(id),
            ordinal,
            timestep: t as usize,
        }
    }

    fn state_with(records: &[FeatureRecord]) -> DetectionState {
        let mut st = DetectionState::default();
        for r in records {
            st.records.insert(r.element, r.clone());
            st.forest.add(r.element);
        }
        st
    }

    #[test]
    fn chain_walks_in_time_order() {
        let mut st = state_with(&[rec(30, 2.0, true), rec(10, 0.0, true), rec(20, 1.0, true), rec(15, 0.5, false)]);
        // pairs given out of order, path 30-20-15-10
        let pairs = [(20, 15), (30, 20), (15, 10)].map(|(a, b)| (ElementId(a), ElementId(b)));
        for &(a, b) in &pairs {
            st.forest.unite(a, b);
        }
        let trajs = build_trajectories(&mut st, &pairs, &TrackerConfig::default());
        assert_eq!(trajs.len(), 1);
        let ts: Vec<f64> = trajs[0].points.iter().map(|p| p.t).collect();
        assert_eq!(ts, vec![0.0, 0.5, 1.0, 2.0]);

        let cfg = TrackerConfig {
            discard_interval_points: true,
            ..TrackerConfig::default()
        };
        let trajs = build_trajectories(&mut st, &pairs, &cfg);
        assert_eq!(trajs[0].points.len(), 3);
    }

    #[test]
    fn short_trajectories_are_pruned() {
        let mut st = state_with(&[rec(1, 0.0, true), rec(2, 1.0, true), rec(3, 5.0, true)]);
        let pairs = [(ElementId(1), ElementId(2))];
        st.forest.unite(ElementId(1), ElementId(2));
        let cfg = TrackerConfig {
            duration_pruning_threshold: 0.5,
            ..TrackerConfig::default()
        };
        let trajs = build_trajectories(&mut st, &pairs, &cfg);
        assert_eq!(trajs.len(), 1);
        assert_eq!(trajs[0].points.len(), 2);
    }

    #[test]
    fn surface_relabels_and_dedups() {
        let mut st = state_with(&[rec(7, 0.0, true), rec(3, 0.0, true), rec(9, 0.0, true), rec(11, 0.0, true)]);
        st.forest.unite(ElementId(3), ElementId(7));
        st.forest.unite(ElementId(7), ElementId(9));
        let tris = [
            [ElementId(3), ElementId(7), ElementId(9)],
            [ElementId(9), ElementId(3), ElementId(7)],
        ];
        let s = build_surface(&mut st, &tris);
        assert_eq!(s.points.len(), 4);
        assert_eq!(s.triangles, vec![[0, 1, 2]]);
        assert_eq!(s.component, vec![0, 0, 0, 1]);
        assert_eq!(s.n_components(), 2);
    }
    use crate::algs::meshgen::structured_triangles_2d;
    use crate::topology::extruded::ExtrudedMesh;

    fn slab_mesh() -> ExtrudedMesh {
        ExtrudedMesh::new(structured_triangles_2d(1, 1, [0.0, 0.0], [1.0, 1.0]).unwrap())
    }

    fn first_slab() -> ProcessedSlabs {
        ProcessedSlabs {
            ordinal: [0, 1].into(),
            interval: [0].into(),
        }
    }

    /// First tetrahedron of slab 0 and its vertices.
    fn first_cell(mesh: &ExtrudedMesh) -> (ElementId, Vec<crate::topology::ids::VertexId>) {
        let cell = ElementId(mesh.interval_range(3, 0).unwrap().start);
        (cell, mesh.simplex_vertices(3, cell).unwrap())
    }

    fn faces(mesh: &ExtrudedMesh, cell: ElementId, dim: usize) -> Vec<ElementId> {
        mesh.simplex_vertices(3, cell)
            .unwrap()
            .into_iter()
            .combinations(dim + 1)
            .map(|f| mesh.element_id(&f).unwrap())
            .sorted()
            .collect()
    }

    fn state_on(cell: ElementId, hits: &[ElementId]) -> DetectionState {
        let recs: Vec<FeatureRecord> = hits.iter().map(|h| rec(h.0, 0.5, false)).collect();
        let mut st = state_with(&recs);
        st.related.insert(cell);
        st
    }

    #[test]
    fn trajectory_cell_needs_two_hits() {
        let mesh = slab_mesh();
        let (cell, _) = first_cell(&mesh);
        let tris = faces(&mesh, cell, 2);
        assert_eq!(tris.len(), 4);

        for n in [1, 3] {
            let strict = CorrespondenceBuilder::new(&mesh, FeatureKind::CriticalPoints, true);
            let mut st = state_on(cell, &tris[..n]);
            assert_eq!(
                strict.connect(&mut st, &first_slab()).unwrap_err(),
                TrackError::IrregularCell { cell, dim: 3, hits: n }
            );

            let lenient = CorrespondenceBuilder::new(&mesh, FeatureKind::CriticalPoints, false);
            let mut st = state_on(cell, &tris[..n]);
            let corr = lenient.connect(&mut st, &first_slab()).unwrap();
            assert_eq!(corr.irregular, 1);
            assert!(corr.pairs.is_empty());
            assert_eq!(st.forest.get_sets().len(), n);
        }

        let strict = CorrespondenceBuilder::new(&mesh, FeatureKind::CriticalPoints, true);
        let mut st = state_on(cell, &tris[1..3]);
        let corr = strict.connect(&mut st, &first_slab()).unwrap();
        assert_eq!(corr.pairs, vec![(tris[1], tris[2])]);
        assert!(st.forest.same_set(tris[1], tris[2]));
    }

    #[test]
    fn surface_cell_with_every_edge_hit_is_irregular() {
        let mesh = slab_mesh();
        let (cell, _) = first_cell(&mesh);
        let edges = faces(&mesh, cell, 1);
        assert_eq!(edges.len(), 6);

        let strict = CorrespondenceBuilder::new(&mesh, FeatureKind::Contours, true);
        let mut st = state_on(cell, &edges);
        assert!(matches!(
            strict.connect(&mut st, &first_slab()),
            Err(TrackError::IrregularCell { hits: 6, .. })
        ));

        let lenient = CorrespondenceBuilder::new(&mesh, FeatureKind::Contours, false);
        let mut st = state_on(cell, &edges);
        let corr = lenient.connect(&mut st, &first_slab()).unwrap();
        assert_eq!(corr.irregular, 1);
        assert!(corr.triangles.is_empty());
        assert_eq!(st.forest.get_sets().len(), 6);
    }

    #[test]
    fn unfinished_slab_is_incomplete_not_irregular() {
        let mesh = slab_mesh();
        let (cell, _) = first_cell(&mesh);
        let tris = faces(&mesh, cell, 2);
        let strict = CorrespondenceBuilder::new(&mesh, FeatureKind::CriticalPoints, true);
        let mut st = state_on(cell, &tris[..1]);
        let processed = ProcessedSlabs {
            ordinal: [0].into(),
            interval: [0].into(),
        };
        let corr = strict.connect(&mut st, &processed).unwrap();
        assert_eq!((corr.incomplete, corr.irregular), (1, 0));
    }

    #[test]
    fn filtered_hits_keep_cells_regular() {
        let mesh = slab_mesh();
        let (cell, v) = first_cell(&mesh);
        let tris = faces(&mesh, cell, 2);

        // the curve leaves the kept type inside this cell
        let strict = CorrespondenceBuilder::new(&mesh, FeatureKind::CriticalPoints, true);
        let mut st = state_on(cell, &tris[..1]);
        st.filtered.insert(tris[1]);
        let corr = strict.connect(&mut st, &first_slab()).unwrap();
        assert_eq!(corr.irregular, 0);
        assert!(corr.pairs.is_empty());

        // quad cross-section a-c, a-d, b-d, b-c with a-c filtered
        let edge = |x: usize, y: usize| mesh.element_id(&[v[x], v[y]]).unwrap();
        let quad = [edge(0, 2), edge(0, 3), edge(1, 3), edge(1, 2)];
        let strict = CorrespondenceBuilder::new(&mesh, FeatureKind::Contours, true);
        let mut st = state_on(cell, &quad[1..]);
        st.filtered.insert(quad[0]);
        let corr = strict.connect(&mut st, &first_slab()).unwrap();
        assert_eq!(corr.irregular, 0);
        assert_eq!(corr.triangles.len(), 1);
        assert!(corr.triangles[0].iter().all(|id| quad[1..].contains(id)));
        assert_eq!(st.forest.get_sets().len(), 1);
    }
}
