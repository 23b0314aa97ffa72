//! Checkpoints and text output.

pub mod checkpoint;
pub mod text;
