//! Sign decisions for feature detection with precision escalation.
//!
//! Inputs are first quantized to `i64` fixed point. Every 2x2 determinant is
//! then decided by the cheapest stage that is certain:
//!
//! 1. a float evaluation of the quantized values with a forward error bound,
//! 2. the exact `i128` determinant,
//! 3. Simulation of Simplicity when the exact value is zero.
//!
//! Each determinant depends only on its two rows and their vertex ids, so two
//! triangles sharing an edge see the same decision for that edge. A zero that
//! lies exactly on a shared edge therefore belongs to exactly one of them.

use std::sync::atomic::{AtomicUsize, Ordering};

use num_traits::ToPrimitive;

use crate::config::PredicateConfig;
use crate::track_error::TrackError;

/// Largest magnitude a quantized value may have; keeps products exact in `i128`
/// and conversions exact in `f64`.
const MAX_QUANTIZED: f64 = (1u64 << 53) as f64;

/// Counters of the stage that decided each determinant or level comparison.
#[derive(Debug, Default)]
pub struct PredicateStats {
    fast: AtomicUsize,
    exact: AtomicUsize,
    symbolic: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PredicateCounts {
    pub fast: usize,
    pub exact: usize,
    pub symbolic: usize,
}

impl PredicateStats {
    pub fn counts(&self) -> PredicateCounts {
        PredicateCounts {
            fast: self.fast.load(Ordering::Relaxed),
            exact: self.exact.load(Ordering::Relaxed),
            symbolic: self.symbolic.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
pub struct RobustPredicate {
    config: PredicateConfig,
    stats: PredicateStats,
}

impl RobustPredicate {
    pub fn new(config: PredicateConfig) -> Result<Self, TrackError> {
        let s = config.quantization_scale;
        if !(s.is_finite() && s > 0.0) {
            return Err(TrackError::InvalidConfig(format!(
                "quantization_scale must be positive and finite, got {s}"
            )));
        }
        Ok(Self {
            config,
            stats: PredicateStats::default(),
        })
    }

    pub fn config(&self) -> &PredicateConfig {
        &self.config
    }

    pub fn counts(&self) -> PredicateCounts {
        self.stats.counts()
    }

    /// Round `v * scale` to the nearest integer.
    pub fn quantize(&self, v: f64) -> Result<i64, TrackError> {
        let scale = self.config.quantization_scale;
        let overflow = || TrackError::QuantizationOverflow { value: v, scale };
        let q = (v * scale).round();
        if !q.is_finite() || q.abs() > MAX_QUANTIZED {
            return Err(overflow());
        }
        q.to_i64().ok_or_else(overflow)
    }

    fn quantize2(&self, v: [f64; 2]) -> Result<[i64; 2], TrackError> {
        Ok([self.quantize(v[0])?, self.quantize(v[1])?])
    }

    /// Does the 2-vector field vanish inside the triangle?
    ///
    /// `ids` are the global vertex ids used for symbolic tie-breaking; they
    /// must be distinct.
    pub fn vector_zero_in_triangle(
        &self,
        ids: [u64; 3],
        values: [[f64; 2]; 3],
    ) -> Result<bool, TrackError> {
        if !self.config.robust {
            let s = [
                det2(values[1], values[2]),
                det2(values[2], values[0]),
                det2(values[0], values[1]),
            ];
            if s.iter().any(|d| *d == 0.0 || d.is_nan()) {
                return Ok(false);
            }
            return Ok(s.iter().all(|d| *d > 0.0) || s.iter().all(|d| *d < 0.0));
        }
        let q = [
            self.quantize2(values[0])?,
            self.quantize2(values[1])?,
            self.quantize2(values[2])?,
        ];
        let s0 = self.det_sign((ids[1], q[1]), (ids[2], q[2]));
        let s1 = self.det_sign((ids[2], q[2]), (ids[0], q[0]));
        let s2 = self.det_sign((ids[0], q[0]), (ids[1], q[1]));
        Ok(s0 != 0 && s0 == s1 && s1 == s2)
    }

    /// Does the scalar cross the configured level along the edge?
    ///
    /// A value exactly at the level counts as above it.
    pub fn level_crossing_on_edge(&self, values: [f64; 2]) -> Result<bool, TrackError> {
        let level = self.config.level;
        if !self.config.robust {
            let a = values[0] - level;
            let b = values[1] - level;
            return Ok(a * b < 0.0);
        }
        let l = self.quantize(level)?;
        let above = |v: f64| -> Result<bool, TrackError> {
            let q = self.quantize(v)?;
            if q == l {
                self.stats.symbolic.fetch_add(1, Ordering::Relaxed);
            } else {
                self.stats.fast.fetch_add(1, Ordering::Relaxed);
            }
            Ok(q >= l)
        };
        Ok(above(values[0])? != above(values[1])?)
    }

    /// Sign of `det([a; b])` for quantized rows tagged with their vertex ids.
    pub fn det_sign(&self, a: (u64, [i64; 2]), b: (u64, [i64; 2])) -> i8 {
        let (ia, [a0, a1]) = a;
        let (ib, [b0, b1]) = b;

        let p = a0 as f64 * b1 as f64;
        let q = a1 as f64 * b0 as f64;
        let det = p - q;
        let bound = (3.0 * f64::EPSILON + 16.0 * f64::EPSILON * f64::EPSILON) * (p.abs() + q.abs());
        if det.abs() > bound {
            self.stats.fast.fetch_add(1, Ordering::Relaxed);
            return if det > 0.0 { 1 } else { -1 };
        }

        let exact = a0 as i128 * b1 as i128 - a1 as i128 * b0 as i128;
        if exact != 0 {
            self.stats.exact.fetch_add(1, Ordering::Relaxed);
            return exact.signum() as i8;
        }

        self.stats.symbolic.fetch_add(1, Ordering::Relaxed);
        sos_det2_sign(ia, [a0, a1], ib, [b0, b1])
    }
}

#[inline]
pub fn det2(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

/// Perturbation key of component `c` of vertex `i`; a smaller key is a larger
/// perturbation.
#[inline]
fn key(i: u64, c: u64) -> u128 {
    (i as u128) * 2 + c as u128
}

/// Sign of the symbolically perturbed determinant of rows `a` (vertex `ia`) and
/// `b` (vertex `ib`), given that the unperturbed determinant is zero.
///
/// Component `c` of vertex `i` is perturbed by `eps^(2^key(i, c))`. Expanding
///
/// ```text
/// (a0 + e_a0)(b1 + e_b1) - (a1 + e_a1)(b0 + e_b0)
/// ```
///
/// gives four linear monomials with coefficients from the rows and two
/// quadratic ones with coefficient `±1`. Monomials are visited from the
/// largest magnitude down; the first non-zero coefficient decides. Returns 0
/// only for identical vertex ids.
pub fn sos_det2_sign(ia: u64, a: [i64; 2], ib: u64, b: [i64; 2]) -> i8 {
    if ia == ib {
        return 0;
    }
    let (a0, a1, b0, b1) = (key(ia, 0), key(ia, 1), key(ib, 0), key(ib, 1));
    let mut terms: Vec<(Vec<u128>, i64)> = vec![
        (vec![a0], b[1]),
        (vec![a1], -b[0]),
        (vec![b0], -a[1]),
        (vec![b1], a[0]),
        (desc(a0, b1), 1),
        (desc(a1, b0), -1),
    ];
    // Exponent of a monomial is a sum of distinct powers of two; comparing
    // the descending key lists orders those sums.
    terms.sort_by(|x, y| x.0.cmp(&y.0));
    terms
        .into_iter()
        .map(|(_, c)| c.signum() as i8)
        .find(|&s| s != 0)
        .unwrap_or(0)
}

fn desc(x: u128, y: u128) -> Vec<u128> {
    if x > y { vec![x, y] } else { vec![y, x] }
}
