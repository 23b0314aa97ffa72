use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use spacetime_track::prelude::*;

fn random_triangles(m: usize, seed: u64) -> Vec<[[f64; 2]; 3]> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..m)
        .map(|_| std::array::from_fn(|_| [rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)]))
        .collect()
}

fn bench_predicate(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector_zero_in_triangle");
    let triangles = random_triangles(10_000, 7);

    for robust in [false, true] {
        let predicate = RobustPredicate::new(PredicateConfig {
            robust,
            ..PredicateConfig::default()
        })
        .unwrap();
        group.bench_with_input(
            BenchmarkId::new(if robust { "robust" } else { "float" }, triangles.len()),
            &triangles,
            |b, tris| {
                b.iter(|| {
                    let hits = tris
                        .iter()
                        .enumerate()
                        .filter(|(i, v)| {
                            let i = *i as u64 * 3;
                            predicate
                                .vector_zero_in_triangle([i, i + 1, i + 2], **v)
                                .unwrap_or(false)
                        })
                        .count();
                    black_box(hits);
                });
            },
        );
    }

    // all-integer values force the exact and symbolic paths
    let ties: Vec<[[f64; 2]; 3]> = (0..1_000)
        .map(|k| {
            let s = (k % 7) as f64;
            [[-s, 0.0], [s, 0.0], [0.0, s + 1.0]]
        })
        .collect();
    let predicate = RobustPredicate::new(PredicateConfig::default()).unwrap();
    group.bench_function("degenerate", |b| {
        b.iter(|| {
            for (i, v) in ties.iter().enumerate() {
                let i = i as u64 * 3;
                black_box(predicate.vector_zero_in_triangle([i, i + 1, i + 2], *v).ok());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_predicate);
criterion_main!(benches);
