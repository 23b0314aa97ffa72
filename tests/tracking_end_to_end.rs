use spacetime_track::prelude::*;

fn plane_mesh(n: usize) -> ExtrudedMesh {
    ExtrudedMesh::new(structured_triangles_2d(n, n, [0.0, 0.0], [1.0, 1.0]).unwrap())
}

fn center(t: usize) -> (f64, f64) {
    (0.2 + 0.061 * t as f64, 0.31 + 0.041 * t as f64)
}

/// Gradient and Hessian of `-(x - cx)^2 - (y - cy)^2`.
fn moving_maximum(mesh: &ExtrudedMesh, t: usize) -> FieldSnapshot {
    let (cx, cy) = center(t);
    let base = mesh.base();
    let n = base.n(0);
    let grad = (0..n)
        .map(|v| {
            let [x, y, _] = base.coords(v);
            [-2.0 * (x - cx), -2.0 * (y - cy)]
        })
        .collect();
    let scalar = (0..n)
        .map(|v| {
            let [x, y, _] = base.coords(v);
            -(x - cx).powi(2) - (y - cy).powi(2)
        })
        .collect();
    FieldSnapshot::new()
        .with_vector(grad)
        .with_scalar(scalar)
        .with_jacobian(vec![[[-2.0, 0.0], [0.0, -2.0]]; n])
}

fn run(mesh: &ExtrudedMesh, nthreads: usize) -> (TrackingResult, Vec<ElementId>, Diagnostics) {
    let cfg = TrackerConfig {
        enumerator: EnumeratorConfig { nthreads },
        ..TrackerConfig::default()
    };
    let mut tracker = FeatureTracker::new(mesh, cfg).unwrap();
    let result = tracker.track((0..10).map(|t| moving_maximum(mesh, t))).unwrap();
    (result, tracker.detections().element_ids(), tracker.diagnostics())
}

#[test]
fn moving_extremum_gives_one_trajectory() {
    let mesh = plane_mesh(8);
    let (result, _, diag) = run(&mesh, 2);
    let trajs = result.trajectories().unwrap();
    assert_eq!(trajs.len(), 1);
    let traj = &trajs[0];
    assert_eq!(traj.ordinal_points().count(), 10);
    assert!(traj.points.windows(2).all(|w| w[0].t <= w[1].t + 1e-12));
    assert!(traj.points[0].t.abs() < 1e-12);
    assert!((traj.duration() - 9.0).abs() < 1e-9);

    for p in traj.ordinal_points() {
        let (cx, cy) = center(p.timestep);
        assert!((p.x[0] - cx).abs() < 1e-9);
        assert!((p.x[1] - cy).abs() < 1e-9);
        assert!((p.t - p.timestep as f64).abs() < 1e-12);
        assert_eq!(p.kind, FeatureType::Maximum);
    }
    assert_eq!(diag.irregular_cells, 0);
    assert!(diag.incomplete_cells > 0);
    assert_eq!(diag.detections, traj.len());
}

#[test]
fn results_do_not_depend_on_pool_size() {
    let mesh = plane_mesh(8);
    let (r1, ids1, _) = run(&mesh, 1);
    let (r4, ids4, _) = run(&mesh, 4);
    assert_eq!(ids1, ids4);
    assert_eq!(r1, r4);
}

#[test]
fn interval_points_can_be_discarded() {
    let mesh = plane_mesh(8);
    let cfg = TrackerConfig {
        discard_interval_points: true,
        ..TrackerConfig::default()
    };
    let mut tracker = FeatureTracker::new(&mesh, cfg).unwrap();
    let result = tracker.track((0..10).map(|t| moving_maximum(&mesh, t))).unwrap();
    let trajs = result.trajectories().unwrap();
    assert_eq!(trajs[0].len(), 10);
    assert!(trajs[0].points.iter().all(|p| p.ordinal));
}

#[test]
fn short_trajectories_are_pruned() {
    let mesh = plane_mesh(8);
    let cfg = TrackerConfig {
        duration_pruning_threshold: 20.0,
        ..TrackerConfig::default()
    };
    let mut tracker = FeatureTracker::new(&mesh, cfg).unwrap();
    let result = tracker.track((0..10).map(|t| moving_maximum(&mesh, t))).unwrap();
    assert!(result.trajectories().unwrap().is_empty());
}

#[test]
fn checkpoint_resume_matches_uninterrupted_run() {
    let mesh = plane_mesh(8);
    let (expected, _, _) = run(&mesh, 2);

    let cfg = TrackerConfig {
        enumerator: EnumeratorConfig { nthreads: 2 },
        ..TrackerConfig::default()
    };
    let mut first = FeatureTracker::new(&mesh, cfg.clone()).unwrap();
    for t in 0..5 {
        first.push_snapshot(moving_maximum(&mesh, t)).unwrap();
        if t > 0 {
            first.update_timestep().unwrap();
            first.advance_timestep();
        }
    }
    let mut buf = Vec::new();
    write_detections(&mut buf, &first.checkpoint()).unwrap();
    drop(first);

    let cp = read_detections(buf.as_slice()).unwrap();
    assert_eq!(cp.current_timestep, 4);
    assert_eq!(cp.interval_done, vec![0, 1, 2, 3]);
    let mut second = FeatureTracker::new(&mesh, cfg).unwrap();
    second.restore_detections(cp).unwrap();
    assert_eq!(second.current_timestep(), 4);
    let resumed = second.track((4..10).map(|t| moving_maximum(&mesh, t))).unwrap();
    assert_eq!(resumed, expected);
}

#[test]
fn trajectories_render_as_text() {
    let mesh = plane_mesh(4);
    let mut tracker = FeatureTracker::new(&mesh, TrackerConfig::default()).unwrap();
    let result = tracker.track((0..3).map(|t| moving_maximum(&mesh, t))).unwrap();
    let mut out = Vec::new();
    write_trajectories_text(&mut out, result.trajectories().unwrap()).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("# trajectory 0 component 0 points "));
    assert_eq!(text.lines().filter(|l| l.ends_with(" 1")).count(), 3);
}

#[test]
fn type_filter_cuts_a_trajectory_that_changes_type() {
    let mesh = plane_mesh(8);
    let n = mesh.base().n(0);
    // same zero path, but the Hessian turns indefinite from t = 5 on
    let snapshots = (0..10).map(|t| {
        let hess = if t < 5 { [[-2.0, 0.0], [0.0, -2.0]] } else { [[-2.0, 0.0], [0.0, 2.0]] };
        moving_maximum(&mesh, t).with_jacobian(vec![hess; n])
    });
    let cfg = TrackerConfig {
        type_filter: FeatureTypeSet::EMPTY.with(FeatureType::Maximum),
        ..TrackerConfig::default()
    };
    let mut tracker = FeatureTracker::new(&mesh, cfg).unwrap();
    let result = tracker.track(snapshots).unwrap();
    let trajs = result.trajectories().unwrap();
    assert_eq!(trajs.len(), 1);
    assert_eq!(trajs[0].ordinal_points().count(), 5);
    assert!(trajs[0].points.iter().all(|p| p.kind == FeatureType::Maximum));
    assert!(trajs[0].points.iter().all(|p| p.t < 5.0));
    let diag = tracker.diagnostics();
    assert_eq!(diag.irregular_cells, 0);
    assert!(diag.filtered > 0);
}
