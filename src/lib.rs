//! # spacetime-track
//!
//! spacetime-track extracts features from time-varying fields sampled on
//! simplicial meshes and follows them through time. Each pair of consecutive
//! timesteps is treated as a slab of a space-time mesh; features are detected
//! on individual simplices with robust sign predicates, located by inverse
//! interpolation and connected across shared cells with a sparse union-find.
//!
//! ## Features
//! - Critical point trajectories of 2D vector fields
//! - Contour surfaces of scalar fields and filament surfaces on 3D (toroidal) meshes
//! - Robust predicates: fixed-point quantization, exact `i128` escalation and
//!   Simulation of Simplicity tie-breaking
//! - Parallel traversal on a rayon pool with a single-lock detection map
//! - Distributed union-find with an all-to-all union exchange over a pluggable
//!   [`Communicator`](algs::communicator::Communicator)
//! - Threshold-based blob tracking, checkpoints and text output
//!
//! ## Determinism
//!
//! Detection sets do not depend on the pool size or on scheduling. Component
//! numbering follows the smallest element id of each component.
//!
//! ## Logging
//!
//! The crate logs through the `log` facade and installs no logger.

pub mod algs;
pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod io;
pub mod numeric;
pub mod topology;
pub mod track_error;
pub mod tracker;

pub use debug_invariants::DebugInvariants;
pub use track_error::TrackError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{CommTag, Communicator, NoComm, RayonComm, Wait};
    pub use crate::algs::meshgen::{structured_tetrahedra_3d, structured_triangles_2d, toroidal_stack};
    pub use crate::algs::union_exchange::{ExchangeConfig, ExchangeReport, exchange_unions};
    pub use crate::config::{EnumeratorConfig, LocatorConfig, PredicateConfig, TrackerConfig};
    pub use crate::data::feature::{
        FeatureKind, FeatureRecord, FeatureSurface, FeatureType, FeatureTypeSet, Trajectory,
        TrackingResult,
    };
    pub use crate::data::snapshot::{FieldSnapshot, SnapshotWindow};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::io::checkpoint::{DetectionCheckpoint, read_detections, write_detections};
    pub use crate::io::text::{write_points_text, write_trajectories_text};
    pub use crate::numeric::predicate::RobustPredicate;
    pub use crate::topology::distributed_union_find::{DistributedUnionFind, OwnershipEntry};
    pub use crate::topology::enumerator::ElementEnumerator;
    pub use crate::topology::extruded::ExtrudedMesh;
    pub use crate::topology::ids::{ElementId, VertexId};
    pub use crate::topology::mesh::SpaceTimeMesh;
    pub use crate::topology::simplicial::SimplicialMesh;
    pub use crate::topology::union_find::SparseUnionFind;
    pub use crate::track_error::TrackError;
    pub use crate::tracker::detection::Diagnostics;
    pub use crate::tracker::feature_tracker::FeatureTracker;
    pub use crate::tracker::locator::FeatureLocator;
    pub use crate::tracker::threshold::ThresholdTracker;
}
