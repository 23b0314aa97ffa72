//! Basic mesh generators for structured boxes and toroidal stacks.
//!
//! Every generator returns a [`SimplicialMesh`]; extrude it through time with
//! [`ExtrudedMesh`](crate::topology::extruded::ExtrudedMesh).

use crate::topology::simplicial::SimplicialMesh;
use crate::track_error::TrackError;

fn invalid_geometry(message: impl Into<String>) -> TrackError {
    TrackError::InvalidMesh(message.into())
}

/// Generate a structured 2D box mesh over `[min, max]` with `nx`×`ny` squares,
/// each split into two triangles along its `(0,0)-(1,1)` diagonal.
pub fn structured_triangles_2d(
    nx: usize,
    ny: usize,
    min: [f64; 2],
    max: [f64; 2],
) -> Result<SimplicialMesh, TrackError> {
    if nx == 0 || ny == 0 {
        return Err(invalid_geometry("nx and ny must be positive"));
    }
    if !(max[0] > min[0] && max[1] > min[1]) {
        return Err(invalid_geometry(format!("empty box {min:?}..{max:?}")));
    }

    let dx = (max[0] - min[0]) / nx as f64;
    let dy = (max[1] - min[1]) / ny as f64;
    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        let y = min[1] + dy * j as f64;
        for i in 0..=nx {
            let x = min[0] + dx * i as f64;
            vertices.push([x, y, 0.0]);
        }
    }

    let idx = |i: usize, j: usize| (j * (nx + 1) + i) as u32;
    let mut cells = Vec::with_capacity(2 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let v00 = idx(i, j);
            let v10 = idx(i + 1, j);
            let v01 = idx(i, j + 1);
            let v11 = idx(i + 1, j + 1);
            cells.push(vec![v00, v10, v11]);
            cells.push(vec![v00, v11, v01]);
        }
    }
    SimplicialMesh::from_cells(2, vertices, &cells)
}

/// Generate a structured 3D box mesh with `nx`×`ny`×`nz` cubes, each split
/// into six tetrahedra sharing the main diagonal.
pub fn structured_tetrahedra_3d(
    nx: usize,
    ny: usize,
    nz: usize,
    min: [f64; 3],
    max: [f64; 3],
) -> Result<SimplicialMesh, TrackError> {
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(invalid_geometry("nx, ny, and nz must be positive"));
    }
    if (0..3).any(|k| !(max[k] > min[k])) {
        return Err(invalid_geometry(format!("empty box {min:?}..{max:?}")));
    }

    let n = [nx, ny, nz];
    let h: [f64; 3] = std::array::from_fn(|k| (max[k] - min[k]) / n[k] as f64);
    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                vertices.push([
                    min[0] + h[0] * i as f64,
                    min[1] + h[1] * j as f64,
                    min[2] + h[2] * k as f64,
                ]);
            }
        }
    }

    let idx = |p: [usize; 3]| ((p[2] * (ny + 1) + p[1]) * (nx + 1) + p[0]) as u32;
    const AXIS_ORDERS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    let mut cells = Vec::with_capacity(6 * nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                for order in AXIS_ORDERS {
                    let mut p = [i, j, k];
                    let mut tet = vec![idx(p)];
                    for axis in order {
                        p[axis] += 1;
                        tet.push(idx(p));
                    }
                    cells.push(tet);
                }
            }
        }
    }
    SimplicialMesh::from_cells(3, vertices, &cells)
}

/// Stack copies of a 2D mesh on `nphi` periodic planes and connect plane `p`
/// to plane `(p + 1) % nphi` with three tetrahedra per triangle.
///
/// Vertex `u` of plane `p` becomes `u + p * n`, at coordinates `(x, y, p)`.
pub fn toroidal_stack(mesh2d: &SimplicialMesh, nphi: usize) -> Result<SimplicialMesh, TrackError> {
    if mesh2d.dim() != 2 {
        return Err(invalid_geometry(format!(
            "toroidal stack needs a triangle mesh, got dimension {}",
            mesh2d.dim()
        )));
    }
    if nphi < 3 {
        return Err(invalid_geometry(format!("need at least 3 planes, got {nphi}")));
    }
    let n = mesh2d.n(0);
    let id = |u: u32, plane: usize| u + (plane * n) as u32;

    let mut vertices = Vec::with_capacity(n * nphi);
    let mut planes = Vec::with_capacity(n * nphi);
    for p in 0..nphi {
        for u in 0..n {
            let [x, y, _] = mesh2d.coords(u);
            vertices.push([x, y, p as f64]);
            planes.push(p);
        }
    }

    let mut cells = Vec::with_capacity(3 * mesh2d.n(2) * nphi);
    for p in 0..nphi {
        let q = (p + 1) % nphi;
        for tri in 0..mesh2d.n(2) {
            let &[a, b, c] = mesh2d.simplex(2, tri) else {
                return Err(invalid_geometry(format!("triangle {tri} is malformed")));
            };
            cells.push(vec![id(a, p), id(b, p), id(c, p), id(c, q)]);
            cells.push(vec![id(a, p), id(b, p), id(b, q), id(c, q)]);
            cells.push(vec![id(a, p), id(a, q), id(b, q), id(c, q)]);
        }
    }
    SimplicialMesh::from_cells(3, vertices, &cells)?.with_planes(planes, nphi)
}
