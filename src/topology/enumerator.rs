//! Parallel traversal of the ordinal and interval simplices of one timestep.
//!
//! The enumerator owns the worker pool and the snapshot window, and borrows
//! the mesh. Each call partitions a contiguous id range across the pool and
//! returns only after every callback finished. Callbacks return `Result`; the
//! first error wins and is reported once the traversal has drained.

use std::ops::Range;

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::config::EnumeratorConfig;
use crate::data::snapshot::{FieldSnapshot, SnapshotWindow};
use crate::topology::ids::ElementId;
use crate::topology::mesh::SpaceTimeMesh;
use crate::track_error::TrackError;

pub struct ElementEnumerator<'m, M: SpaceTimeMesh> {
    mesh: &'m M,
    pool: rayon::ThreadPool,
    window: SnapshotWindow,
}

impl<'m, M: SpaceTimeMesh> ElementEnumerator<'m, M> {
    pub fn new(mesh: &'m M, config: &EnumeratorConfig) -> Result<Self, TrackError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.nthreads)
            .thread_name(|i| format!("spacetime-track-{i}"))
            .build()?;
        Ok(Self {
            mesh,
            pool,
            window: SnapshotWindow::new(),
        })
    }

    pub fn mesh(&self) -> &'m M {
        self.mesh
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn window(&self) -> &SnapshotWindow {
        &self.window
    }

    /// Append the snapshot of timestep `t` to the window.
    pub fn push_snapshot(&mut self, t: usize, snapshot: FieldSnapshot) -> Result<(), TrackError> {
        snapshot.validate(self.mesh.n(0))?;
        self.window.push(t, snapshot)
    }

    pub fn pop_snapshot(&mut self) -> Option<(usize, FieldSnapshot)> {
        self.window.pop()
    }

    /// Call `f` once for every `dim`-simplex inside timestep `t`.
    /// Returns the number of elements visited.
    pub fn element_for_ordinal<F>(&self, dim: usize, t: usize, f: F) -> Result<usize, TrackError>
    where
        F: Fn(ElementId) -> Result<(), TrackError> + Sync + Send,
    {
        let range = self.mesh.ordinal_range(dim, t)?;
        log::debug!("ordinal traversal dim={dim} t={t}: {} elements", range_len(&range));
        self.dispatch(range, f)
    }

    /// Call `f` once for every `dim`-simplex spanning `t -> t+1`.
    ///
    /// Fails with [`TrackError::InsufficientSnapshots`] unless the window
    /// holds both snapshots.
    pub fn element_for_interval<F>(&self, dim: usize, t: usize, f: F) -> Result<usize, TrackError>
    where
        F: Fn(ElementId) -> Result<(), TrackError> + Sync + Send,
    {
        if self.window.len() < SnapshotWindow::CAPACITY {
            return Err(TrackError::InsufficientSnapshots {
                held: self.window.len(),
            });
        }
        let range = self.mesh.interval_range(dim, t)?;
        log::debug!("interval traversal dim={dim} t={t}: {} elements", range_len(&range));
        self.dispatch(range, f)
    }

    fn dispatch<F>(&self, range: Range<u64>, f: F) -> Result<usize, TrackError>
    where
        F: Fn(ElementId) -> Result<(), TrackError> + Sync + Send,
    {
        let first_err: Mutex<Option<TrackError>> = Mutex::new(None);
        let n = range_len(&range);
        self.pool.install(|| {
            range.into_par_iter().for_each(|raw| {
                if let Err(e) = f(ElementId(raw)) {
                    first_err.lock().get_or_insert(e);
                }
            })
        });
        match first_err.into_inner() {
            Some(e) => Err(e),
            None => Ok(n),
        }
    }
}

fn range_len(r: &Range<u64>) -> usize {
    r.end.saturating_sub(r.start) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::extruded::ExtrudedMesh;
    use crate::topology::simplicial::SimplicialMesh;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn mesh() -> ExtrudedMesh {
        let coords = vec![[0.0; 3]; 4];
        let base =
            SimplicialMesh::from_cells(2, coords, &[vec![0, 1, 2], vec![0, 2, 3]]).unwrap();
        ExtrudedMesh::new(base)
    }

    #[test]
    fn visits_each_ordinal_element_once() {
        let m = mesh();
        let e = ElementEnumerator::new(&m, &EnumeratorConfig { nthreads: 3 }).unwrap();
        assert_eq!(e.num_threads(), 3);
        let seen = Mutex::new(Vec::new());
        let n = e
            .element_for_ordinal(1, 2, |id| {
                seen.lock().push(id);
                Ok(())
            })
            .unwrap();
        let mut seen = seen.into_inner();
        seen.sort();
        assert_eq!(n, 5);
        let expected: Vec<ElementId> = m.ordinal_range(1, 2).unwrap().map(ElementId).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn interval_needs_two_snapshots() {
        let m = mesh();
        let mut e = ElementEnumerator::new(&m, &EnumeratorConfig::default()).unwrap();
        let r = e.element_for_interval(2, 0, |_| Ok(()));
        assert_eq!(r, Err(TrackError::InsufficientSnapshots { held: 0 }));
        e.push_snapshot(0, FieldSnapshot::new()).unwrap();
        e.push_snapshot(1, FieldSnapshot::new()).unwrap();
        let count = AtomicUsize::new(0);
        let n = e
            .element_for_interval(2, 0, |_| {
                count.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
            .unwrap();
        assert_eq!(n, count.load(Ordering::Relaxed));
        assert_eq!(n, 2 * 5 + 2 * 2);
    }

    #[test]
    fn first_error_is_reported_after_drain() {
        let m = mesh();
        let e = ElementEnumerator::new(&m, &EnumeratorConfig { nthreads: 2 }).unwrap();
        let visited = AtomicUsize::new(0);
        let r = e.element_for_ordinal(1, 0, |id| {
            visited.fetch_add(1, Ordering::Relaxed);
            Err(TrackError::InvalidElement { dim: 1, id })
        });
        assert!(matches!(r, Err(TrackError::InvalidElement { dim: 1, .. })));
        assert_eq!(visited.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn malformed_snapshot_is_rejected() {
        let m = mesh();
        let mut e = ElementEnumerator::new(&m, &EnumeratorConfig::default()).unwrap();
        let bad = FieldSnapshot::new().with_scalar(vec![0.0; 3]);
        assert!(matches!(
            e.push_snapshot(0, bad),
            Err(TrackError::SnapshotShape { .. })
        ));
    }
}
