//! TrackError: unified error type for spacetime-track public APIs
//!
//! Every fallible operation in the crate reports through this enum. Recoverable
//! anomalies (predicate escalations, irregular cells in non-strict mode) are not
//! errors; they are counted in [`Diagnostics`](crate::tracker::detection::Diagnostics).

use crate::topology::ids::{ElementId, VertexId};
use thiserror::Error;

/// Unified error type for feature extraction and tracking.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackError {
    /// Interval traversal needs the snapshots of both `t` and `t+1`.
    #[error("interval traversal requires two field snapshots, {held} held")]
    InsufficientSnapshots { held: usize },
    /// The snapshot window already holds the maximum number of snapshots.
    #[error("snapshot window is full ({capacity} snapshots retained)")]
    SnapshotWindowFull { capacity: usize },
    /// A snapshot array does not match the mesh vertex count.
    #[error("snapshot `{field}` has {actual} values, expected {expected}")]
    SnapshotShape {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The feature kind needs an array the snapshot does not carry.
    #[error("snapshot is missing the `{0}` field")]
    MissingField(&'static str),
    /// A space-time vertex refers to a timestep outside the snapshot window.
    #[error("vertex {vertex} lies at timestep {timestep}, outside the snapshot window")]
    VertexOutsideWindow { vertex: VertexId, timestep: usize },
    /// A value cannot be represented after fixed-point quantization.
    #[error("value {value} overflows fixed-point quantization (scale {scale})")]
    QuantizationOverflow { value: f64, scale: f64 },
    /// Element id does not exist in the mesh for the requested dimension.
    #[error("element {id} of dimension {dim} does not exist")]
    InvalidElement { dim: usize, id: ElementId },
    /// The requested simplex dimension is not supported by the mesh or kind.
    #[error("unsupported simplex dimension {0}")]
    UnsupportedDimension(usize),
    /// A cell crossed by features has a face hit count that violates the
    /// manifold assumption of the selected output mode.
    #[error("cell {cell} of dimension {dim} has {hits} feature hits")]
    IrregularCell {
        cell: ElementId,
        dim: usize,
        hits: usize,
    },
    /// Configured periodicity does not match the mesh topology.
    #[error("periodic configuration {configured:?} inconsistent with mesh periodicity {mesh:?}")]
    InconsistentPeriodicity {
        configured: Option<usize>,
        mesh: Option<usize>,
    },
    /// Malformed mesh input (bad cell, missing vertex, ...).
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Failed to build the worker pool.
    #[error("thread pool: {0}")]
    ThreadPool(String),
    /// Communication failure with a neighbor block.
    #[error("communication error with neighbor {neighbor}: {message}")]
    CommError { neighbor: usize, message: String },
    /// The union exchange did not reach a fixed point.
    #[error("union exchange did not converge after {rounds} rounds")]
    NotConverged { rounds: usize },
    /// A data structure invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    /// Checkpoint encode/decode failure.
    #[error("checkpoint: {0}")]
    Checkpoint(String),
    /// I/O failure while writing or reading outputs.
    #[error("i/o: {0}")]
    Io(String),
}

impl From<std::io::Error> for TrackError {
    fn from(e: std::io::Error) -> Self {
        TrackError::Io(e.to_string())
    }
}

impl From<bincode::Error> for TrackError {
    fn from(e: bincode::Error) -> Self {
        TrackError::Checkpoint(e.to_string())
    }
}

impl From<serde_json::Error> for TrackError {
    fn from(e: serde_json::Error) -> Self {
        TrackError::InvalidConfig(e.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for TrackError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        TrackError::ThreadPool(e.to_string())
    }
}
