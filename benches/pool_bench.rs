use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use threadkit::ThreadPool;

const JOBS: usize = 100;

fn enqueue_drain_bench(c: &mut Criterion) {
    let _ = env_logger::try_init();
    let mut group = c.benchmark_group("enqueue_drain");

    for workers in [1usize, 4] {
        group.bench_function(format!("{workers}-workers"), |b| {
            b.iter_batched(
                || ThreadPool::new(workers, workers, Duration::from_secs(60)).unwrap(),
                |mut pool| {
                    let counter = Arc::new(AtomicUsize::new(0));
                    for _ in 0..JOBS {
                        let counter = counter.clone();
                        pool.enqueue(move || {
                            counter.fetch_add(1, Ordering::Relaxed);
                        })
                        .unwrap();
                    }
                    pool.wait_all().unwrap();
                    pool.terminate().unwrap();
                    assert_eq!(counter.load(Ordering::Relaxed), JOBS);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn elastic_growth_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("elastic_growth");

    group.bench_function("1-to-8-workers", |b| {
        b.iter_batched(
            || ThreadPool::new(1, 8, Duration::from_secs(60)).unwrap(),
            |mut pool| {
                let counter = Arc::new(AtomicUsize::new(0));
                for _ in 0..JOBS {
                    let counter = counter.clone();
                    pool.enqueue(move || {
                        counter.fetch_add(1, Ordering::Relaxed);
                    })
                    .unwrap();
                }
                pool.wait_all().unwrap();
                pool.terminate().unwrap();
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, enqueue_drain_bench, elastic_growth_bench);
criterion_main!(benches);
