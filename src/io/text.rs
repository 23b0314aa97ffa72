//! Human-readable listings of trajectories and points.
//!
//! One line per point: `x y z t scalar type element ordinal`. Trajectories are
//! introduced by a `# trajectory <index> component <c> points <n>` header.

use std::io::Write;

use crate::data::feature::{FeatureRecord, Trajectory};
use crate::track_error::TrackError;

fn write_point<W: Write>(w: &mut W, p: &FeatureRecord) -> Result<(), TrackError> {
    writeln!(
        w,
        "{} {} {} {} {} {} {} {}",
        p.x[0],
        p.x[1],
        p.x[2],
        p.t,
        p.scalar,
        p.kind,
        p.element,
        u8::from(p.ordinal)
    )?;
    Ok(())
}

pub fn write_trajectories_text<W: Write>(mut w: W, trajectories: &[Trajectory]) -> Result<(), TrackError> {
    for (i, traj) in trajectories.iter().enumerate() {
        writeln!(
            w,
            "# trajectory {i} component {} points {}",
            traj.component,
            traj.len()
        )?;
        for p in &traj.points {
            write_point(&mut w, p)?;
        }
    }
    w.flush()?;
    Ok(())
}

pub fn write_points_text<W: Write>(mut w: W, points: &[FeatureRecord]) -> Result<(), TrackError> {
    for p in points {
        write_point(&mut w, p)?;
    }
    w.flush()?;
    Ok(())
}
