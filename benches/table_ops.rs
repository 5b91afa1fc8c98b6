//! Microbenchmarks for the frequency-monitor hot path
//!
//! The per-event budget matters: the monitor runs once per exec on the
//! host. Covers the three costs that differ by an order of magnitude:
//! counter increment (common case), fresh insert, and the full-table
//! eviction scan.

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;

use binwarm::freq_table::FreqTable;
use binwarm::monitor::ExecMonitor;
use binwarm::params::MAX_ENTRIES;

fn bench_increment_hit(c: &mut Criterion) {
    let monitor = ExecMonitor::new(Arc::new(FreqTable::new()));
    monitor.observe(b"/usr/bin/bash");

    c.bench_function("observe_increment_hit", |b| {
        b.iter(|| monitor.observe(black_box(b"/usr/bin/bash")));
    });
}

fn bench_prefix_miss(c: &mut Criterion) {
    let monitor = ExecMonitor::new(Arc::new(FreqTable::new()));

    c.bench_function("observe_prefix_miss", |b| {
        b.iter(|| monitor.observe(black_box(b"/opt/elsewhere/tool")));
    });
}

fn bench_eviction_scan(c: &mut Criterion) {
    let monitor = ExecMonitor::new(Arc::new(FreqTable::new()));
    for i in 0..MAX_ENTRIES {
        let path = format!("/usr/bin/warm{:03}", i);
        monitor.observe(path.as_bytes());
        monitor.observe(path.as_bytes());
    }

    // Table stays full; every fresh name takes the evict-and-replace path
    let mut n = 0u64;
    c.bench_function("observe_evict_and_replace", |b| {
        b.iter(|| {
            n += 1;
            let path = format!("/usr/bin/cold{}", n);
            monitor.observe(black_box(path.as_bytes()));
        });
    });
}

criterion_group!(
    benches,
    bench_increment_hit,
    bench_prefix_miss,
    bench_eviction_scan
);
criterion_main!(benches);
