//! Field snapshots in, feature records out.

pub mod feature;
pub mod snapshot;

pub use feature::{FeatureKind, FeatureRecord, FeatureType, FeatureTypeSet, TrackingResult};
pub use snapshot::{FieldSnapshot, SnapshotWindow};
