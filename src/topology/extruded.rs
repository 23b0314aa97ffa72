//! Staircase extrusion of a base complex through time.
//!
//! Every base vertex `u` gets one copy per timestep, `VertexId(u + t * n(0))`.
//! With sorted base vertices `u0 < u1 < ...`, the simplices of the slab
//! `t -> t+1` are
//!
//! * *full* simplices from a base `(d-1)`-simplex `u0..um` and a split `j` in
//!   `0..d`: `u0..=uj` at `t` and `uj..=um` at `t+1` (the vertical edge through
//!   `uj` is part of it);
//! * *shifted* simplices from a base `d`-simplex and a split `j` in `1..=d`:
//!   `u0..uj` at `t`, `uj..=ud` at `t+1`.
//!
//! Together with the ordinal copies of the base simplices this is a simplicial
//! complex: every prism `sigma x [t, t+1]` is cut into `dim(sigma) + 1`
//! simplices by the same rule, so neighbouring prisms agree on shared faces.
//!
//! Per-timestep block of `d`-simplices: `n_d` ordinal, then `d * n_{d-1}` full,
//! then `d * n_d` shifted.

use std::ops::Range;

use crate::topology::ids::{ElementId, VertexId};
use crate::topology::mesh::SpaceTimeMesh;
use crate::topology::simplicial::SimplicialMesh;
use crate::track_error::TrackError;

#[derive(Debug, Clone)]
pub struct ExtrudedMesh {
    base: SimplicialMesh,
    n_timesteps: Option<usize>,
    /// `counts[d]` = number of base `d`-simplices, for `d` in `0..=max_dim`.
    counts: Vec<u64>,
}

/// Where a local id falls inside a per-timestep block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Ordinal(usize),
    Full { base: usize, split: usize },
    Shifted { base: usize, split: usize },
}

impl ExtrudedMesh {
    pub fn new(base: SimplicialMesh) -> Self {
        let counts = (0..=base.dim() + 1).map(|d| base.n(d) as u64).collect();
        Self {
            base,
            n_timesteps: None,
            counts,
        }
    }

    /// Bound the mesh to timesteps `0..n`. Elements and vertices past the
    /// bound do not exist.
    pub fn with_timesteps(mut self, n: usize) -> Self {
        self.n_timesteps = Some(n);
        self
    }

    pub fn base(&self) -> &SimplicialMesh {
        &self.base
    }

    pub fn n_timesteps(&self) -> Option<usize> {
        self.n_timesteps
    }

    #[inline]
    fn count(&self, d: isize) -> u64 {
        if d < 0 {
            0
        } else {
            self.counts.get(d as usize).copied().unwrap_or(0)
        }
    }

    /// Number of `dim`-simplices per timestep block.
    pub fn block(&self, dim: usize) -> u64 {
        let d = dim as isize;
        self.count(d) + dim as u64 * self.count(d - 1) + dim as u64 * self.count(d)
    }

    #[inline]
    fn n0(&self) -> u64 {
        self.count(0)
    }

    pub fn vertex(&self, base: usize, t: usize) -> VertexId {
        VertexId(base as u64 + t as u64 * self.n0())
    }

    fn vertex_time_ok(&self, t: usize) -> bool {
        self.n_timesteps.is_none_or(|n| t < n)
    }

    fn check_dim(&self, dim: usize) -> Result<(), TrackError> {
        if dim > self.max_dim() {
            Err(TrackError::UnsupportedDimension(dim))
        } else {
            Ok(())
        }
    }

    fn slot(&self, dim: usize, local: u64) -> Slot {
        let d = dim as u64;
        let n_d = self.count(dim as isize);
        let n_f = self.count(dim as isize - 1);
        if local < n_d {
            Slot::Ordinal(local as usize)
        } else if local < n_d + d * n_f {
            let idx = local - n_d;
            Slot::Full {
                base: (idx / d) as usize,
                split: (idx % d) as usize,
            }
        } else {
            let idx = local - n_d - d * n_f;
            Slot::Shifted {
                base: (idx / d) as usize,
                split: 1 + (idx % d) as usize,
            }
        }
    }

    fn decompose(&self, dim: usize, id: ElementId) -> Result<(usize, Slot), TrackError> {
        self.check_dim(dim)?;
        let block = self.block(dim);
        if block == 0 {
            return Err(TrackError::InvalidElement { dim, id });
        }
        let t = (id.get() / block) as usize;
        let slot = self.slot(dim, id.get() % block);
        let last = if matches!(slot, Slot::Ordinal(_)) { t } else { t + 1 };
        if !self.vertex_time_ok(last) {
            return Err(TrackError::InvalidElement { dim, id });
        }
        Ok((t, slot))
    }

    fn id_of(&self, dim: usize, t: usize, local: u64) -> ElementId {
        ElementId(t as u64 * self.block(dim) + local)
    }

    /// Base vertices that can join `verts` in a coface.
    fn candidate_bases(&self, verts: &[VertexId]) -> Vec<usize> {
        let first = self.base_vertex(verts[0]);
        let mut out: Vec<usize> = verts.iter().map(|&v| self.base_vertex(v)).collect();
        out.extend(self.base.neighbors(first).iter().map(|&u| u as usize));
        out.sort_unstable();
        out.dedup();
        out
    }
}

impl SpaceTimeMesh for ExtrudedMesh {
    fn max_dim(&self) -> usize {
        self.base.dim() + 1
    }

    fn n(&self, dim: usize) -> usize {
        self.base.n(dim)
    }

    fn ordinal_range(&self, dim: usize, t: usize) -> Result<Range<u64>, TrackError> {
        self.check_dim(dim)?;
        if !self.vertex_time_ok(t) {
            return Ok(0..0);
        }
        let start = self.id_of(dim, t, 0).get();
        Ok(start..start + self.count(dim as isize))
    }

    fn interval_range(&self, dim: usize, t: usize) -> Result<Range<u64>, TrackError> {
        self.check_dim(dim)?;
        if !self.vertex_time_ok(t + 1) {
            return Ok(0..0);
        }
        let start = self.id_of(dim, t, 0).get();
        Ok(start + self.count(dim as isize)..start + self.block(dim))
    }

    fn is_ordinal(&self, dim: usize, id: ElementId) -> bool {
        let block = self.block(dim);
        block > 0 && id.get() % block < self.count(dim as isize)
    }

    fn element_timestep(&self, dim: usize, id: ElementId) -> usize {
        match self.block(dim) {
            0 => 0,
            b => (id.get() / b) as usize,
        }
    }

    fn simplex_vertices(&self, dim: usize, id: ElementId) -> Result<Vec<VertexId>, TrackError> {
        let (t, slot) = self.decompose(dim, id)?;
        let invalid = || TrackError::InvalidElement { dim, id };
        let mut verts: Vec<VertexId> = match slot {
            Slot::Ordinal(i) => {
                let s = self.base.try_simplex(dim, i).ok_or_else(invalid)?;
                s.iter().map(|&u| self.vertex(u as usize, t)).collect()
            }
            Slot::Full { base, split } => {
                let s = self.base.try_simplex(dim - 1, base).ok_or_else(invalid)?;
                let mut v: Vec<VertexId> =
                    s[..=split].iter().map(|&u| self.vertex(u as usize, t)).collect();
                v.extend(s[split..].iter().map(|&u| self.vertex(u as usize, t + 1)));
                v
            }
            Slot::Shifted { base, split } => {
                let s = self.base.try_simplex(dim, base).ok_or_else(invalid)?;
                let mut v: Vec<VertexId> =
                    s[..split].iter().map(|&u| self.vertex(u as usize, t)).collect();
                v.extend(s[split..].iter().map(|&u| self.vertex(u as usize, t + 1)));
                v
            }
        };
        verts.sort_unstable();
        Ok(verts)
    }

    fn sides(&self, dim: usize, id: ElementId) -> Result<Vec<ElementId>, TrackError> {
        if dim >= self.max_dim() {
            self.check_dim(dim)?;
            return Ok(Vec::new());
        }
        let verts = self.simplex_vertices(dim, id)?;
        let t_min = verts.iter().map(|&v| self.vertex_timestep(v)).min().unwrap_or(0);
        let t_max = verts.iter().map(|&v| self.vertex_timestep(v)).max().unwrap_or(0);
        let times = t_min.saturating_sub(1)..=t_max + 1;

        let mut out = Vec::new();
        let mut candidate = verts.clone();
        candidate.push(VertexId(0));
        for u in self.candidate_bases(&verts) {
            for tau in times.clone() {
                if !self.vertex_time_ok(tau) {
                    continue;
                }
                let w = self.vertex(u, tau);
                if verts.contains(&w) {
                    continue;
                }
                candidate[dim + 1] = w;
                if let Some(e) = self.element_id(&candidate) {
                    out.push(e);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }

    fn element_id(&self, vertices: &[VertexId]) -> Option<ElementId> {
        let dim = vertices.len().checked_sub(1)?;
        if dim > self.max_dim() {
            return None;
        }
        let mut pairs: Vec<(u32, usize)> = vertices
            .iter()
            .map(|&v| (self.base_vertex(v) as u32, self.vertex_timestep(v)))
            .collect();
        if pairs.iter().any(|&(_, tau)| !self.vertex_time_ok(tau)) {
            return None;
        }
        pairs.sort_unstable();
        if pairs.windows(2).any(|w| w[0] == w[1]) {
            return None;
        }
        let t = pairs.iter().map(|p| p.1).min()?;
        let t_hi = pairs.iter().map(|p| p.1).max()?;

        if t == t_hi {
            let base: Vec<u32> = pairs.iter().map(|p| p.0).collect();
            let i = self.base.find(&base)?;
            return Some(self.id_of(dim, t, i as u64));
        }
        if t_hi != t + 1 || pairs.windows(2).any(|w| w[0].1 > w[1].1) {
            return None;
        }

        let d = dim as u64;
        let repeats: Vec<usize> = pairs
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0].0 == w[1].0)
            .map(|(k, _)| k)
            .collect();
        let mut base: Vec<u32> = pairs.iter().map(|p| p.0).collect();
        base.dedup();
        match repeats.as_slice() {
            [] => {
                let split = pairs.iter().filter(|p| p.1 == t).count() as u64;
                let sigma = self.base.find(&base)? as u64;
                let local = self.count(dim as isize)
                    + d * self.count(dim as isize - 1)
                    + sigma * d
                    + (split - 1);
                Some(self.id_of(dim, t, local))
            }
            [k] => {
                let sigma = self.base.find(&base)? as u64;
                let local = self.count(dim as isize) + sigma * d + *k as u64;
                Some(self.id_of(dim, t, local))
            }
            _ => None,
        }
    }

    fn get_coords(&self, v: VertexId) -> [f64; 3] {
        self.base.coords(self.base_vertex(v))
    }

    fn vertex_timestep(&self, v: VertexId) -> usize {
        match self.n0() {
            0 => 0,
            n => (v.get() / n) as usize,
        }
    }

    fn base_vertex(&self, v: VertexId) -> usize {
        match self.n0() {
            0 => 0,
            n => (v.get() % n) as usize,
        }
    }

    fn periodic_planes(&self) -> Option<usize> {
        self.base.periodic_planes()
    }

    fn vertex_plane(&self, v: VertexId) -> Option<usize> {
        self.base.plane(self.base_vertex(v))
    }
}
