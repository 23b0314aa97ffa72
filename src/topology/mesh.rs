//! The space-time mesh contract consumed by traversal, location and correspondence.
//!
//! A space-time mesh numbers the simplices of every dimension with dense
//! [`ElementId`]s, `id = t * block(dim) + local`. Inside each block the first
//! `n(dim)` ids are *ordinal* (all vertices at timestep `t`) and the rest are
//! *interval* (vertices at `t` and `t+1`). The core only reads the mesh.

use std::ops::Range;

use itertools::Itertools;

use crate::topology::ids::{ElementId, VertexId};
use crate::track_error::TrackError;

pub trait SpaceTimeMesh: Sync {
    /// Highest simplex dimension of the space-time mesh.
    fn max_dim(&self) -> usize;

    /// Number of base (spatial) simplices of dimension `dim`.
    fn n(&self, dim: usize) -> usize;

    /// Ids of `dim`-simplices lying entirely in timestep `t`.
    fn ordinal_range(&self, dim: usize, t: usize) -> Result<Range<u64>, TrackError>;

    /// Ids of `dim`-simplices spanning `t -> t+1`.
    fn interval_range(&self, dim: usize, t: usize) -> Result<Range<u64>, TrackError>;

    fn is_ordinal(&self, dim: usize, id: ElementId) -> bool;

    /// Timestep of an element: `t` for ordinal ones, the slab start for interval ones.
    fn element_timestep(&self, dim: usize, id: ElementId) -> usize;

    /// Vertices of a `dim`-simplex, sorted by vertex id.
    fn simplex_vertices(&self, dim: usize, id: ElementId) -> Result<Vec<VertexId>, TrackError>;

    /// Fixed-size variant of [`simplex_vertices`](Self::simplex_vertices) for
    /// an `(N-1)`-simplex.
    fn get_simplex<const N: usize>(&self, id: ElementId) -> Result<[VertexId; N], TrackError>
    where
        Self: Sized,
    {
        let dim = N.checked_sub(1).ok_or(TrackError::UnsupportedDimension(0))?;
        let verts = self.simplex_vertices(dim, id)?;
        verts
            .try_into()
            .map_err(|_| TrackError::InvalidElement { dim, id })
    }

    /// Cofaces of dimension `dim + 1` of the `dim`-simplex `id`, sorted.
    fn sides(&self, dim: usize, id: ElementId) -> Result<Vec<ElementId>, TrackError>;

    /// Faces of dimension `dim - 1` of the `dim`-simplex `id`, sorted.
    fn faces(&self, dim: usize, id: ElementId) -> Result<Vec<ElementId>, TrackError> {
        if dim == 0 {
            return Ok(Vec::new());
        }
        let verts = self.simplex_vertices(dim, id)?;
        let mut out = Vec::with_capacity(dim + 1);
        for face in verts.iter().copied().combinations(dim) {
            let f = self
                .element_id(&face)
                .ok_or_else(|| TrackError::InvalidMesh(format!("face {face:?} of {id} not found")))?;
            out.push(f);
        }
        out.sort_unstable();
        Ok(out)
    }

    /// Look a simplex up by its vertices (any order).
    fn element_id(&self, vertices: &[VertexId]) -> Option<ElementId>;

    /// Spatial coordinates of a vertex.
    fn get_coords(&self, v: VertexId) -> [f64; 3];

    fn vertex_timestep(&self, v: VertexId) -> usize;

    /// Index of the base vertex a space-time vertex is a copy of.
    fn base_vertex(&self, v: VertexId) -> usize;

    /// Number of periodic planes when the base mesh is a toroidal stack.
    fn periodic_planes(&self) -> Option<usize> {
        None
    }

    /// Plane index of a vertex on a toroidal stack.
    fn vertex_plane(&self, _v: VertexId) -> Option<usize> {
        None
    }
}
