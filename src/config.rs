//! Tracker configuration.
//!
//! Every struct has a `Default` and deserializes with missing fields filled
//! from it, so a JSON file only needs the values it changes:
//!
//! ```
//! use spacetime_track::config::TrackerConfig;
//! let cfg = TrackerConfig::from_json_str(r#"{ "type_filter": "min|max" }"#).unwrap();
//! assert!(cfg.predicate.robust);
//! ```

use serde::{Deserialize, Serialize};

use crate::data::feature::{FeatureKind, FeatureTypeSet};
use crate::track_error::TrackError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumeratorConfig {
    /// Worker threads for traversal; `0` lets rayon decide.
    pub nthreads: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredicateConfig {
    /// Quantize and escalate on ambiguous signs. `false` uses plain float signs.
    pub robust: bool,
    /// Fixed-point scale applied before quantizing to `i64`.
    pub quantization_scale: f64,
    /// Level of the scalar contour.
    pub level: f64,
}

impl Default for PredicateConfig {
    fn default() -> Self {
        Self {
            robust: true,
            quantization_scale: (1u64 << 20) as f64,
            level: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Number of toroidal planes when the base mesh wraps around.
    pub periodic_planes: Option<usize>,
    /// Treat the per-vertex Jacobian as a Hessian (gradient fields).
    pub symmetric_jacobian: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            periodic_planes: None,
            symmetric_jacobian: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub kind: FeatureKind,
    pub enumerator: EnumeratorConfig,
    pub predicate: PredicateConfig,
    pub locator: LocatorConfig,
    /// Feature types kept; others are dropped before insertion.
    pub type_filter: FeatureTypeSet,
    /// Keep only ordinal points in trajectory output.
    pub discard_interval_points: bool,
    /// Drop trajectories shorter (in time) than this.
    pub duration_pruning_threshold: f64,
    /// Fail finalize on irregular cells instead of skipping them.
    pub strict_topology: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            kind: FeatureKind::default(),
            enumerator: EnumeratorConfig::default(),
            predicate: PredicateConfig::default(),
            locator: LocatorConfig::default(),
            type_filter: FeatureTypeSet::ALL,
            discard_interval_points: false,
            duration_pruning_threshold: 0.0,
            strict_topology: true,
        }
    }
}

impl TrackerConfig {
    pub fn for_kind(kind: FeatureKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, TrackError> {
        let cfg: TrackerConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), TrackError> {
        let scale = self.predicate.quantization_scale;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(TrackError::InvalidConfig(format!(
                "quantization_scale must be positive and finite, got {scale}"
            )));
        }
        if !self.predicate.level.is_finite() {
            return Err(TrackError::InvalidConfig("level must be finite".into()));
        }
        let d = self.duration_pruning_threshold;
        if !(d.is_finite() && d >= 0.0) {
            return Err(TrackError::InvalidConfig(format!(
                "duration_pruning_threshold must be non-negative, got {d}"
            )));
        }
        if let Some(n) = self.locator.periodic_planes {
            if n < 3 {
                return Err(TrackError::InvalidConfig(format!(
                    "periodic_planes must be at least 3, got {n}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::feature::FeatureType;

    #[test]
    fn defaults() {
        let cfg = TrackerConfig::default();
        assert_eq!(cfg.predicate.quantization_scale, 1048576.0);
        assert!(cfg.strict_topology);
        assert_eq!(cfg.type_filter, FeatureTypeSet::ALL);
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_json() {
        let cfg = TrackerConfig::from_json_str(
            r#"{
                "kind": "contours",
                "predicate": { "level": 0.5 },
                "type_filter": "contour",
                "enumerator": { "nthreads": 2 }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.kind, FeatureKind::Contours);
        assert_eq!(cfg.predicate.level, 0.5);
        assert!(cfg.predicate.robust);
        assert_eq!(cfg.enumerator.nthreads, 2);
        assert!(cfg.type_filter.contains(FeatureType::Contour));
        assert!(!cfg.type_filter.contains(FeatureType::Minimum));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            TrackerConfig::from_json_str(r#"{ "predicate": { "quantization_scale": 0.0 } }"#),
            Err(TrackError::InvalidConfig(_))
        ));
        assert!(matches!(
            TrackerConfig::from_json_str(r#"{ "type_filter": "spiral" }"#),
            Err(TrackError::InvalidConfig(_))
        ));
        assert!(matches!(
            TrackerConfig::from_json_str(r#"{ "locator": { "periodic_planes": 2 } }"#),
            Err(TrackError::InvalidConfig(_))
        ));
    }
}
