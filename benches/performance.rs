//! Performance benchmarks for sources and derived chains.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tributary::{Draft, Manual, SourceExt};

/// Benchmark raw pushes into a hot root source
fn bench_manual_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("manual_push");

    for count in [100, 1000, 10000] {
        group.bench_with_input(BenchmarkId::new("count", count), &count, |b, &count| {
            b.iter(|| {
                let source: Manual<i32> = Manual::new();
                let _sub = source.sink();
                for i in 0..count {
                    source.push(black_box(i)).unwrap();
                }
            });
        });
    }

    group.finish();
}

/// Benchmark batched pushes coalesced into one event
fn bench_batched_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("batched_push");

    for count in [100, 1000, 10000] {
        group.bench_with_input(BenchmarkId::new("count", count), &count, |b, &count| {
            b.iter(|| {
                let source: Manual<i32> = Manual::new();
                let _sub = source.sink();
                source
                    .batch(|s| {
                        for i in 0..count {
                            s.push(black_box(i)).unwrap();
                        }
                    })
                    .unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark events flowing through filter -> map -> sort
fn bench_chain_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_throughput");

    for size in [100, 1000, 5000] {
        group.bench_with_input(BenchmarkId::new("size", size), &size, |b, &size| {
            let source = Manual::from_vec((0..size).collect::<Vec<i64>>());
            let view = source.filter(|n| n % 2 == 0).map(|n| n * 3).sort();
            let _sub = view.sink();
            let mut i = 0i64;

            b.iter(|| {
                i += 1;
                source.push(black_box(i * 7919 % 10007)).unwrap();
                source.remove_first().unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark draft coalescing of interleaved intents
fn bench_draft_commit(c: &mut Criterion) {
    c.bench_function("draft_commit_interleaved", |b| {
        b.iter(|| {
            let mut draft = Draft::new(1000);
            for i in 0..500usize {
                draft.append(vec![i]).unwrap();
                draft.assign(i % 1000, i).unwrap();
                draft.remove_first().unwrap();
            }
            black_box(draft.commit())
        });
    });
}

criterion_group!(
    benches,
    bench_manual_push,
    bench_batched_push,
    bench_chain_throughput,
    bench_draft_commit,
);
criterion_main!(benches);
