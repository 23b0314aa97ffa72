//! Inverse and forward linear interpolation on a simplex.

use crate::numeric::predicate::det2;

/// Barycentric coordinates of the zero of a linearly interpolated 2-vector
/// field on a triangle: `mu_i = det_i / sum det`, where `det_i` is the
/// determinant of the two values opposite vertex `i`.
///
/// `None` when the determinants sum to zero (the values are collinear).
pub fn barycentric_triangle(values: [[f64; 2]; 3]) -> Option<[f64; 3]> {
    let d = [
        det2(values[1], values[2]),
        det2(values[2], values[0]),
        det2(values[0], values[1]),
    ];
    let sum = d[0] + d[1] + d[2];
    if sum == 0.0 || !sum.is_finite() {
        return None;
    }
    Some([d[0] / sum, d[1] / sum, d[2] / sum])
}

/// Barycentric coordinates of the level crossing on an edge:
/// `mu_0 = (f1 - level) / (f1 - f0)`.
pub fn barycentric_edge(values: [f64; 2], level: f64) -> Option<[f64; 2]> {
    let denom = values[1] - values[0];
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let mu0 = (values[1] - level) / denom;
    Some([mu0, 1.0 - mu0])
}

/// Clamp into the simplex: each weight to `[0, 1]`, then renormalize.
pub fn clamp_barycentric<const N: usize>(mu: &mut [f64; N]) {
    for m in mu.iter_mut() {
        *m = if m.is_nan() { 0.0 } else { m.clamp(0.0, 1.0) };
    }
    let sum: f64 = mu.iter().sum();
    if sum > 0.0 {
        for m in mu.iter_mut() {
            *m /= sum;
        }
    } else {
        *mu = centroid();
    }
}

pub fn centroid<const N: usize>() -> [f64; N] {
    [1.0 / N as f64; N]
}

pub fn lerp_scalar<const N: usize>(mu: &[f64; N], values: &[f64; N]) -> f64 {
    mu.iter().zip(values).map(|(m, v)| m * v).sum()
}

pub fn lerp_array<const N: usize, const K: usize>(mu: &[f64; N], values: &[[f64; K]; N]) -> [f64; K] {
    let mut out = [0.0; K];
    for (m, v) in mu.iter().zip(values) {
        for k in 0..K {
            out[k] += m * v[k];
        }
    }
    out
}

pub fn lerp_matrix<const N: usize>(mu: &[f64; N], values: &[[[f64; 2]; 2]; N]) -> [[f64; 2]; 2] {
    let mut out = [[0.0; 2]; 2];
    for (m, j) in mu.iter().zip(values) {
        for r in 0..2 {
            for c in 0..2 {
                out[r][c] += m * j[r][c];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_known_weights() {
        let mu_star = [0.2, 0.3, 0.5];
        // Values chosen so the zero sits at mu_star.
        let v0 = [1.0, 2.0];
        let v1 = [-3.0, 0.5];
        let v2 = [
            -(mu_star[0] * v0[0] + mu_star[1] * v1[0]) / mu_star[2],
            -(mu_star[0] * v0[1] + mu_star[1] * v1[1]) / mu_star[2],
        ];
        let mu = barycentric_triangle([v0, v1, v2]).unwrap();
        for k in 0..3 {
            assert!((mu[k] - mu_star[k]).abs() < 1e-12);
        }
    }

    #[test]
    fn collinear_values_have_no_solution() {
        assert_eq!(barycentric_triangle([[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]), None);
        assert_eq!(barycentric_edge([1.0, 1.0], 0.0), None);
    }

    #[test]
    fn edge_crossing() {
        let mu = barycentric_edge([0.0, 4.0], 1.0).unwrap();
        assert_eq!(mu, [0.75, 0.25]);
        assert_eq!(lerp_scalar(&mu, &[0.0, 4.0]), 1.0);
    }

    #[test]
    fn clamping() {
        let mut mu = [1.2, -0.2, 0.0];
        clamp_barycentric(&mut mu);
        assert_eq!(mu, [1.0, 0.0, 0.0]);
        let mut mu = [-1.0, -2.0];
        clamp_barycentric(&mut mu);
        assert_eq!(mu, [0.5, 0.5]);
    }

    #[test]
    fn forward_interpolation() {
        let mu = [0.5, 0.25, 0.25];
        let x = lerp_array(&mu, &[[0.0, 0.0, 0.0, 0.0], [4.0, 0.0, 0.0, 1.0], [0.0, 4.0, 0.0, 1.0]]);
        assert_eq!(x, [1.0, 1.0, 0.0, 0.5]);
        let j = lerp_matrix(&[0.5, 0.5], &[[[1.0, 0.0], [0.0, 1.0]], [[3.0, 2.0], [2.0, 3.0]]]);
        assert_eq!(j, [[2.0, 1.0], [1.0, 2.0]]);
    }
}
