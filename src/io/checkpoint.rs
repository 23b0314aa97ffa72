//! Binary dump and restore of tracker detections.
//!
//! A checkpoint carries the detection records plus the traversal progress, so a
//! run can resume at `current_timestep` once the snapshot for that timestep is
//! pushed again. Related cells and the forest are rebuilt on restore.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::data::feature::FeatureRecord;
use crate::topology::ids::ElementId;
use crate::track_error::TrackError;

pub const CHECKPOINT_VERSION: u32 = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionCheckpoint {
    pub version: u32,
    pub current_timestep: usize,
    /// Timesteps whose ordinal pass completed.
    pub ordinal_done: Vec<usize>,
    /// Slabs whose interval pass completed.
    pub interval_done: Vec<usize>,
    /// Records ordered by element id.
    pub records: Vec<FeatureRecord>,
    /// Elements whose feature the type filter dropped, sorted.
    pub filtered: Vec<ElementId>,
}

impl DetectionCheckpoint {
    pub fn new(current_timestep: usize, records: Vec<FeatureRecord>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            current_timestep,
            ordinal_done: Vec::new(),
            interval_done: Vec::new(),
            records,
            filtered: Vec::new(),
        }
    }
}

pub fn write_detections<W: Write>(writer: W, checkpoint: &DetectionCheckpoint) -> Result<(), TrackError> {
    bincode::serialize_into(writer, checkpoint)?;
    Ok(())
}

pub fn read_detections<R: Read>(reader: R) -> Result<DetectionCheckpoint, TrackError> {
    let cp: DetectionCheckpoint = bincode::deserialize_from(reader)?;
    if cp.version != CHECKPOINT_VERSION {
        return Err(TrackError::Checkpoint(format!(
            "unsupported checkpoint version {} (expected {CHECKPOINT_VERSION})",
            cp.version
        )));
    }
    Ok(cp)
}
