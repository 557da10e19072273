//! Cache benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use edusync_bench::{generate_ids, payload};
use edusync_core::{Cache, CacheKey, Category};

/// Benchmark writes of payloads of growing width.
fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_set");

    for fields in [1, 8, 64].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(fields), fields, |b, &fields| {
            let cache = Cache::new();
            let key = CacheKey::for_entity(Category::Progress, generate_ids(1).first());
            let value = payload(fields);
            b.iter(|| cache.set(key.clone(), black_box(value.clone())));
        });
    }
    group.finish();
}

/// Benchmark hits and misses against a populated cache.
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_get");

    for entries in [100, 10_000].iter() {
        let cache = Cache::new();
        let ids = generate_ids(*entries);
        for id in &ids {
            cache.set(CacheKey::for_entity(Category::Progress, Some(id)), payload(8));
        }
        let hit = CacheKey::for_entity(Category::Progress, ids.last());
        let miss = CacheKey::for_entity(Category::Dashboard, ids.last());

        group.bench_with_input(BenchmarkId::new("hit", entries), &hit, |b, key| {
            b.iter(|| black_box(cache.get(key)));
        });
        group.bench_with_input(BenchmarkId::new("miss", entries), &miss, |b, key| {
            b.iter(|| black_box(cache.get(key)));
        });
    }
    group.finish();
}

/// Benchmark the statistics scan.
fn bench_keys_matching(c: &mut Criterion) {

    let cache = Cache::new();
    for id in generate_ids(1_000) {
        cache.set(CacheKey::for_entity(Category::Progress, Some(&id)), payload(1));
        cache.set(CacheKey::for_entity(Category::Dashboard, Some(&id)), payload(1));
    }

    c.bench_function("cache_keys_matching", |b| {
        b.iter(|| black_box(cache.keys_matching(black_box("dashboard:"))));
    });
}

criterion_group!(benches, bench_set, bench_get, bench_keys_matching);
criterion_main!(benches);
