use commonware_sieve::{Config, Engine, Isolated, Sequential, Shared, Strategy};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn run<S: Strategy>(strategy: &S, limit: u64, workers: usize) -> usize {
    let engine = Engine::new(Config::new(limit, workers), strategy.clone()).unwrap();
    engine.run().unwrap().sieve.count()
}

fn bench_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("sieve");
    group.sample_size(10);

    for &limit in &[100_000u64, 1_000_000, 10_000_000] {
        for &workers in &[1usize, 2, 4, 8] {
            let id = format!("limit={limit} workers={workers}");
            let shared = Shared::with_threads(workers).unwrap();

            group.bench_with_input(BenchmarkId::new("sequential", &id), &limit, |b, &limit| {
                b.iter(|| run(&Sequential, limit, workers));
            });
            group.bench_with_input(BenchmarkId::new("shared", &id), &limit, |b, &limit| {
                b.iter(|| run(&shared, limit, workers));
            });
            group.bench_with_input(BenchmarkId::new("isolated", &id), &limit, |b, &limit| {
                b.iter(|| run(&Isolated, limit, workers));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_models);
criterion_main!(benches);
