use serial_test::serial;
use spacetime_track::prelude::*;

/// Run `f` on `size` blocks, each on its own thread with its own communicator.
fn run_blocks<T, F>(comms: Vec<RayonComm>, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(RayonComm) -> T + Send + Sync + Copy + 'static,
{
    let handles: Vec<_> = comms
        .into_iter()
        .map(|comm| std::thread::spawn(move || f(comm)))
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
#[serial]
fn chain_split_over_three_blocks_converges() {
    // Block r knows r ~ r+1; together they form the chain 0-1-2-3.
    let comms: Vec<RayonComm> = (0..3).map(|r| RayonComm::new(r, 3)).collect();
    let results = run_blocks(comms, |comm| {
        let r = comm.rank() as u64;
        let mut uf = DistributedUnionFind::<ElementId>::new(comm.rank());
        uf.add_local(ElementId(r));
        uf.add(ElementId(r + 1), (comm.rank() + 1) % 3);
        uf.unite(ElementId(r), ElementId(r + 1));
        let report = exchange_unions(&mut uf, &comm, &ExchangeConfig::default()).unwrap();
        uf.validate_invariants().unwrap();
        (uf.get_sets(), report)
    });

    let expected: Vec<_> = vec![(0..4).map(ElementId).collect::<std::collections::BTreeSet<_>>()];
    for (sets, report) in &results {
        assert_eq!(sets, &expected);
        assert!(report.rounds >= 1);
        assert_eq!(report.changed_per_round.last(), Some(&0));
    }
}

#[test]
#[serial]
fn missing_unions_are_learned_in_one_cycle() {
    // Both blocks hold ids 1..=4; block 0 knows 1~2, block 1 knows 3~4 and 2~3.
    let comms: Vec<RayonComm> = (0..2).map(|r| RayonComm::new(r, 2)).collect();
    let results = run_blocks(comms, |comm| {
        let mut uf = DistributedUnionFind::<ElementId>::new(comm.rank());
        for id in 1..=4u64 {
            uf.add(ElementId(id), if id <= 2 { 0 } else { 1 });
        }
        if comm.rank() == 0 {
            uf.unite(ElementId(1), ElementId(2));
        } else {
            uf.unite(ElementId(3), ElementId(4));
            uf.unite(ElementId(2), ElementId(3));
        }
        let report = exchange_unions(&mut uf, &comm, &ExchangeConfig::default()).unwrap();
        let ghost = uf.is_ghost(&ElementId(4));
        (uf.get_sets(), report, ghost)
    });

    assert_eq!(results[0].0, results[1].0);
    assert_eq!(results[0].0.len(), 1);
    // one productive round, one confirming round
    assert_eq!(results[0].1.rounds, 2);
    assert_eq!(results[0].2, Some(true));
    assert_eq!(results[1].2, Some(false));
}

#[test]
#[serial]
fn too_few_rounds_is_reported() {
    let comms: Vec<RayonComm> = (0..2).map(|r| RayonComm::new(r, 2)).collect();
    let results = run_blocks(comms, |comm| {
        let r = comm.rank() as u64;
        let mut uf = DistributedUnionFind::<ElementId>::new(comm.rank());
        uf.add_local(ElementId(10 + r));
        uf.add_local(ElementId(20 + r));
        uf.unite(ElementId(10 + r), ElementId(20 + r));
        let cfg = ExchangeConfig {
            max_rounds: 1,
            ..ExchangeConfig::default()
        };
        exchange_unions(&mut uf, &comm, &cfg)
    });
    for r in results {
        assert_eq!(r.unwrap_err(), TrackError::NotConverged { rounds: 1 });
    }
}
