//! Per-timestep field samples and the two-slot window traversal reads from.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::track_error::TrackError;

/// Field values at one timestep, indexed by base vertex.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub scalar: Option<Vec<f64>>,
    pub vector: Option<Vec<[f64; 2]>>,
    /// Row-major 2x2 Jacobian (or Hessian) per vertex.
    pub jacobian: Option<Vec<[[f64; 2]; 2]>>,
}

impl FieldSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, scalar: Vec<f64>) -> Self {
        self.scalar = Some(scalar);
        self
    }

    pub fn with_vector(mut self, vector: Vec<[f64; 2]>) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn with_jacobian(mut self, jacobian: Vec<[[f64; 2]; 2]>) -> Self {
        self.jacobian = Some(jacobian);
        self
    }

    /// Check every present array against the vertex count.
    pub fn validate(&self, n_vertices: usize) -> Result<(), TrackError> {
        fn check(field: &'static str, len: Option<usize>, expected: usize) -> Result<(), TrackError> {
            match len {
                Some(actual) if actual != expected => Err(TrackError::SnapshotShape {
                    field,
                    expected,
                    actual,
                }),
                _ => Ok(()),
            }
        }
        check("scalar", self.scalar.as_ref().map(Vec::len), n_vertices)?;
        check("vector", self.vector.as_ref().map(Vec::len), n_vertices)?;
        check("jacobian", self.jacobian.as_ref().map(Vec::len), n_vertices)?;
        Ok(())
    }

    pub fn scalar_at(&self, v: usize) -> Result<f64, TrackError> {
        self.scalar
            .as_ref()
            .ok_or(TrackError::MissingField("scalar"))?
            .get(v)
            .copied()
            .ok_or(TrackError::SnapshotShape {
                field: "scalar",
                expected: v + 1,
                actual: self.scalar.as_ref().map_or(0, Vec::len),
            })
    }

    pub fn vector_at(&self, v: usize) -> Result<[f64; 2], TrackError> {
        self.vector
            .as_ref()
            .ok_or(TrackError::MissingField("vector"))?
            .get(v)
            .copied()
            .ok_or(TrackError::SnapshotShape {
                field: "vector",
                expected: v + 1,
                actual: self.vector.as_ref().map_or(0, Vec::len),
            })
    }

    /// `None` when the snapshot carries no Jacobian.
    pub fn jacobian_at(&self, v: usize) -> Option<[[f64; 2]; 2]> {
        self.jacobian.as_ref().and_then(|j| j.get(v).copied())
    }
}

/// At most two snapshots, for consecutive timesteps `t` and `t+1`.
#[derive(Clone, Debug, Default)]
pub struct SnapshotWindow {
    slots: VecDeque<(usize, FieldSnapshot)>,
}

impl SnapshotWindow {
    pub const CAPACITY: usize = 2;

    pub fn new() -> Self {
        Self::default()
    }

    /// Append the snapshot of timestep `t`; it must directly follow the newest one.
    pub fn push(&mut self, t: usize, snapshot: FieldSnapshot) -> Result<(), TrackError> {
        if self.slots.len() >= Self::CAPACITY {
            return Err(TrackError::SnapshotWindowFull {
                capacity: Self::CAPACITY,
            });
        }
        if let Some(&(last, _)) = self.slots.back() {
            if t != last + 1 {
                return Err(TrackError::InvalidConfig(format!(
                    "snapshot for timestep {t} does not follow timestep {last}"
                )));
            }
        }
        self.slots.push_back((t, snapshot));
        Ok(())
    }

    /// Drop the oldest snapshot.
    pub fn pop(&mut self) -> Option<(usize, FieldSnapshot)> {
        self.slots.pop_front()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn first_timestep(&self) -> Option<usize> {
        self.slots.front().map(|(t, _)| *t)
    }

    pub fn get(&self, t: usize) -> Option<&FieldSnapshot> {
        self.slots.iter().find(|(ts, _)| *ts == t).map(|(_, s)| s)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
