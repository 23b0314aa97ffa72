//! Base (spatial) simplicial complex.
//!
//! Built from top-dimensional cells; every face is enumerated once, stored
//! sorted and numbered in lexicographic order, so numbering is independent of
//! the input cell order. Faces are looked up by their sorted vertex tuple.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use itertools::Itertools;

use crate::track_error::TrackError;

const PAD: u32 = u32::MAX;

type FaceKey = [u32; 4];

fn face_key(sorted: &[u32]) -> FaceKey {
    let mut key = [PAD; 4];
    key[..sorted.len()].copy_from_slice(sorted);
    key
}

#[derive(Debug, Clone)]
pub struct SimplicialMesh {
    dim: usize,
    coords: Vec<[f64; 3]>,
    /// `simplices[d]` holds the sorted vertices of every `d`-simplex, stride `d + 1`.
    simplices: Vec<Vec<u32>>,
    lookup: Vec<HashMap<FaceKey, u32>>,
    /// `cofaces[d][i]`: ids of `(d+1)`-simplices containing `d`-simplex `i`.
    cofaces: Vec<Vec<Vec<u32>>>,
    neighbors: Vec<Vec<u32>>,
    planes: Option<Vec<usize>>,
    nphi: Option<usize>,
}

impl SimplicialMesh {
    /// Build the complex spanned by `cells`, each a `dim`-simplex given by
    /// `dim + 1` vertex indices into `coords`.
    pub fn from_cells(
        dim: usize,
        coords: Vec<[f64; 3]>,
        cells: &[Vec<u32>],
    ) -> Result<Self, TrackError> {
        if !(1..=3).contains(&dim) {
            return Err(TrackError::UnsupportedDimension(dim));
        }
        let nv = coords.len();
        if nv >= PAD as usize {
            return Err(TrackError::InvalidMesh(format!("{nv} vertices exceed u32 ids")));
        }
        let mut faces: Vec<BTreeSet<Vec<u32>>> = vec![BTreeSet::new(); dim + 1];
        for (ci, cell) in cells.iter().enumerate() {
            if cell.len() != dim + 1 {
                return Err(TrackError::InvalidMesh(format!(
                    "cell {ci} has {} vertices, expected {}",
                    cell.len(),
                    dim + 1
                )));
            }
            let mut sorted = cell.clone();
            sorted.sort_unstable();
            if sorted.windows(2).any(|w| w[0] == w[1]) {
                return Err(TrackError::InvalidMesh(format!("cell {ci} repeats a vertex")));
            }
            if let Some(&bad) = sorted.iter().find(|&&v| v as usize >= nv) {
                return Err(TrackError::InvalidMesh(format!(
                    "cell {ci} references vertex {bad}, only {nv} vertices"
                )));
            }
            for d in 1..=dim {
                for face in sorted.iter().copied().combinations(d + 1) {
                    faces[d].insert(face);
                }
            }
        }

        let mut simplices = Vec::with_capacity(dim + 1);
        let mut lookup = Vec::with_capacity(dim + 1);
        simplices.push((0..nv as u32).collect::<Vec<_>>());
        lookup.push(
            (0..nv as u32)
                .map(|v| (face_key(&[v]), v))
                .collect::<HashMap<_, _>>(),
        );
        for set in faces.iter().skip(1) {
            let mut flat = Vec::new();
            let mut map = HashMap::with_capacity(set.len());
            for (i, face) in set.iter().enumerate() {
                map.insert(face_key(face), i as u32);
                flat.extend_from_slice(face);
            }
            simplices.push(flat);
            lookup.push(map);
        }

        let mut mesh = Self {
            dim,
            coords,
            simplices,
            lookup,
            cofaces: Vec::new(),
            neighbors: Vec::new(),
            planes: None,
            nphi: None,
        };
        mesh.build_adjacency();
        Ok(mesh)
    }

    fn build_adjacency(&mut self) {
        let mut cofaces: Vec<Vec<Vec<u32>>> =
            (0..self.dim).map(|d| vec![Vec::new(); self.n(d)]).collect();
        for d in 1..=self.dim {
            for i in 0..self.n(d) {
                let verts: Vec<u32> = self.simplex(d, i).to_vec();
                for facet in verts.iter().copied().combinations(d) {
                    if let Some(f) = self.find(&facet) {
                        cofaces[d - 1][f].push(i as u32);
                    }
                }
            }
        }
        let mut neighbors = vec![Vec::new(); self.n(0)];
        for e in 0..self.n(1) {
            let s = self.simplex(1, e);
            neighbors[s[0] as usize].push(s[1]);
            neighbors[s[1] as usize].push(s[0]);
        }
        for list in &mut neighbors {
            list.sort_unstable();
        }
        self.cofaces = cofaces;
        self.neighbors = neighbors;
    }

    /// Attach a toroidal plane index to every vertex; `nphi` planes wrap around.
    pub fn with_planes(mut self, planes: Vec<usize>, nphi: usize) -> Result<Self, TrackError> {
        if planes.len() != self.n(0) {
            return Err(TrackError::InvalidMesh(format!(
                "{} plane indices for {} vertices",
                planes.len(),
                self.n(0)
            )));
        }
        if nphi < 3 || planes.iter().any(|&p| p >= nphi) {
            return Err(TrackError::InvalidMesh(format!(
                "plane indices must lie in 0..{nphi} with at least 3 planes"
            )));
        }
        self.planes = Some(planes);
        self.nphi = Some(nphi);
        Ok(self)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of `d`-simplices (0 above the complex dimension).
    pub fn n(&self, d: usize) -> usize {
        match self.simplices.get(d) {
            Some(flat) => flat.len() / (d + 1),
            None => 0,
        }
    }

    /// Sorted vertices of `d`-simplex `i`. Panics on out-of-range input; use
    /// [`SimplicialMesh::try_simplex`] for unchecked ids.
    pub fn simplex(&self, d: usize, i: usize) -> &[u32] {
        &self.simplices[d][i * (d + 1)..(i + 1) * (d + 1)]
    }

    pub fn try_simplex(&self, d: usize, i: usize) -> Option<&[u32]> {
        let flat = self.simplices.get(d)?;
        flat.get(i * (d + 1)..(i + 1) * (d + 1))
    }

    /// Id of the simplex with exactly these (sorted) vertices.
    pub fn find(&self, sorted: &[u32]) -> Option<usize> {
        if sorted.is_empty() || sorted.len() > self.dim + 1 {
            return None;
        }
        self.lookup[sorted.len() - 1]
            .get(&face_key(sorted))
            .map(|&i| i as usize)
    }

    /// `(d+1)`-simplices containing `d`-simplex `i`.
    pub fn cofaces(&self, d: usize, i: usize) -> &[u32] {
        self.cofaces
            .get(d)
            .and_then(|c| c.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Vertices sharing an edge with `v`, sorted.
    pub fn neighbors(&self, v: usize) -> &[u32] {
        self.neighbors.get(v).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn coords(&self, v: usize) -> [f64; 3] {
        self.coords.get(v).copied().unwrap_or([f64::NAN; 3])
    }

    pub fn plane(&self, v: usize) -> Option<usize> {
        self.planes.as_ref().and_then(|p| p.get(v).copied())
    }

    pub fn periodic_planes(&self) -> Option<usize> {
        self.nphi
    }
}
