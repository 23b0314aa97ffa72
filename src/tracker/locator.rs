//! Where inside a simplex a detected feature lies, and what it is.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::LocatorConfig;
use crate::data::feature::FeatureType;
use crate::numeric::classify::classify_jacobian;
use crate::numeric::interpolation::{
    barycentric_edge, barycentric_triangle, centroid, clamp_barycentric, lerp_array, lerp_matrix,
    lerp_scalar,
};
use crate::topology::ids::VertexId;
use crate::topology::mesh::SpaceTimeMesh;

/// Result of locating a feature inside one simplex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Located {
    pub x: [f64; 3],
    pub t: f64,
    pub scalar: f64,
    pub kind: FeatureType,
    pub mu_degenerate: bool,
}

#[derive(Debug)]
pub struct FeatureLocator {
    config: LocatorConfig,
    degenerate: AtomicUsize,
}

impl FeatureLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self {
            config,
            degenerate: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Number of locations that fell back to the centroid.
    pub fn degenerate_count(&self) -> usize {
        self.degenerate.load(Ordering::Relaxed)
    }

    /// `(x, y, z, t)` of each vertex. On a toroidal stack, a simplex touching
    /// both plane 0 and plane `nphi - 1` has its plane-0 vertices moved up by
    /// one period so the simplex is contiguous.
    pub fn vertex_coords<M: SpaceTimeMesh, const N: usize>(
        &self,
        mesh: &M,
        verts: &[VertexId; N],
    ) -> [[f64; 4]; N] {
        let mut out = [[0.0; 4]; N];
        for (slot, &v) in out.iter_mut().zip(verts) {
            let c = mesh.get_coords(v);
            *slot = [c[0], c[1], c[2], mesh.vertex_timestep(v) as f64];
        }
        if let Some(nphi) = self.config.periodic_planes {
            let planes: [Option<usize>; N] = std::array::from_fn(|k| mesh.vertex_plane(verts[k]));
            let low = planes.contains(&Some(0));
            let high = planes.contains(&Some(nphi - 1));
            if low && high {
                for (slot, plane) in out.iter_mut().zip(&planes) {
                    if *plane == Some(0) {
                        slot[2] += nphi as f64;
                    }
                }
            }
        }
        out
    }

    /// Locate the zero of a 2-vector field on a triangle.
    pub fn locate_triangle(
        &self,
        coords: &[[f64; 4]; 3],
        values: [[f64; 2]; 3],
        scalars: Option<[f64; 3]>,
        jacobians: Option<[[[f64; 2]; 2]; 3]>,
    ) -> Located {
        let (mu, mu_degenerate) = match barycentric_triangle(values) {
            Some(mut mu) => {
                clamp_barycentric(&mut mu);
                (mu, false)
            }
            None => (centroid(), true),
        };
        if mu_degenerate {
            self.degenerate.fetch_add(1, Ordering::Relaxed);
        }
        let p = lerp_array(&mu, coords);
        let scalar = scalars.map_or(0.0, |s| lerp_scalar(&mu, &s));
        let kind = match jacobians {
            Some(j) => classify_jacobian(lerp_matrix(&mu, &j), self.config.symmetric_jacobian),
            None => FeatureType::Unknown,
        };
        Located {
            x: [p[0], p[1], p[2]],
            t: p[3],
            scalar,
            kind,
            mu_degenerate,
        }
    }

    /// Locate the crossing of `level` along an edge.
    pub fn locate_edge(&self, coords: &[[f64; 4]; 2], values: [f64; 2], level: f64) -> Located {
        let (mu, mu_degenerate) = match barycentric_edge(values, level) {
            Some(mut mu) => {
                clamp_barycentric(&mut mu);
                (mu, false)
            }
            None => (centroid(), true),
        };
        if mu_degenerate {
            self.degenerate.fetch_add(1, Ordering::Relaxed);
        }
        let p = lerp_array(&mu, coords);
        Located {
            x: [p[0], p[1], p[2]],
            t: p[3],
            scalar: level,
            kind: FeatureType::Contour,
            mu_degenerate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_location_and_class() {
        let loc = FeatureLocator::new(LocatorConfig::default());
        let coords = [[0.0, 0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]];
        // grad of (x-0.25)^2 + (y-0.25)^2 up to a factor
        let values = [[-0.25, -0.25], [0.75, -0.25], [-0.25, 0.75]];
        let hess = [[[2.0, 0.0], [0.0, 2.0]]; 3];
        let l = loc.locate_triangle(&coords, values, Some([1.0, 2.0, 3.0]), Some(hess));
        assert!((l.x[0] - 0.25).abs() < 1e-12);
        assert!((l.x[1] - 0.25).abs() < 1e-12);
        assert!((l.scalar - 1.75).abs() < 1e-12);
        assert_eq!(l.kind, FeatureType::Minimum);
        assert!(!l.mu_degenerate);
    }

    #[test]
    fn degenerate_falls_back_to_centroid() {
        let loc = FeatureLocator::new(LocatorConfig::default());
        let coords = [[0.0, 0.0, 0.0, 0.0], [3.0, 0.0, 0.0, 0.0], [0.0, 3.0, 0.0, 3.0]];
        let l = loc.locate_triangle(&coords, [[0.0, 0.0]; 3], None, None);
        assert_eq!(l.x, [1.0, 1.0, 0.0]);
        assert_eq!(l.t, 1.0);
        assert_eq!(l.kind, FeatureType::Unknown);
        assert_eq!(loc.degenerate_count(), 1);
    }

    #[test]
    fn edge_crossing_is_a_contour() {
        let loc = FeatureLocator::new(LocatorConfig::default());
        let coords = [[0.0, 0.0, 0.0, 2.0], [2.0, 0.0, 0.0, 3.0]];
        let l = loc.locate_edge(&coords, [0.0, 1.0], 0.25);
        assert_eq!(l.kind, FeatureType::Contour);
        assert!((l.x[0] - 0.5).abs() < 1e-12);
        assert!((l.t - 2.25).abs() < 1e-12);
        assert_eq!(l.scalar, 0.25);
    }
    #[test]
    fn tetrahedron_across_the_seam_is_unwrapped() {
        use crate::algs::meshgen::{structured_triangles_2d, toroidal_stack};
        use crate::topology::extruded::ExtrudedMesh;

        let base = structured_triangles_2d(1, 1, [0.0, 0.0], [1.0, 1.0]).unwrap();
        let mesh = ExtrudedMesh::new(toroidal_stack(&base, 4).unwrap());
        let loc = FeatureLocator::new(LocatorConfig {
            periodic_planes: Some(4),
            ..LocatorConfig::default()
        });
        // three vertices on plane 3, one on plane 0
        let seam = [VertexId(12), VertexId(13), VertexId(15), VertexId(3)];
        let z: Vec<f64> = loc.vertex_coords(&mesh, &seam).iter().map(|c| c[2]).collect();
        assert_eq!(z, vec![3.0, 3.0, 3.0, 4.0]);

        let inner = [VertexId(0), VertexId(1), VertexId(3), VertexId(7)];
        let z: Vec<f64> = loc.vertex_coords(&mesh, &inner).iter().map(|c| c[2]).collect();
        assert_eq!(z, vec![0.0, 0.0, 0.0, 1.0]);
    }
}
