//! Event bus benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use edusync_bench::payload;
use edusync_core::{Category, Channel, EventBus, Notification, SyncEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Benchmark emission to a growing number of handlers.
fn bench_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("bus_emit");
    let channel = Channel::entity(Category::Progress, None);
    let notification = Notification::Update(Arc::new(SyncEvent::new(
        Category::Progress,
        payload(8),
        None,
        "bench",
    )));

    for handlers in [1, 10, 100].iter() {
        group.throughput(Throughput::Elements(*handlers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(handlers), handlers, |b, &handlers| {
            let bus = EventBus::new();
            let seen = Arc::new(AtomicU64::new(0));
            let _subs: Vec<_> = (0..handlers)
                .map(|_| {
                    let seen = Arc::clone(&seen);
                    bus.subscribe(channel.clone(), move |_| {
                        seen.fetch_add(1, Ordering::Relaxed);
                    })
                })
                .collect();

            b.iter(|| black_box(bus.emit(&channel, black_box(&notification))));
        });
    }
    group.finish();
}

/// Benchmark subscribe followed by drop.
fn bench_subscribe(c: &mut Criterion) {
    let bus = EventBus::new();
    let channel = Channel::Global;
    c.bench_function("bus_subscribe_drop", |b| {
        b.iter(|| {
            let sub = bus.subscribe(channel.clone(), |_| {});
            drop(black_box(sub));
        });
    });
}

criterion_group!(benches, bench_emit, bench_subscribe);
criterion_main!(benches);
