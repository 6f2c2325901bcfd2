//! Criterion benchmarks for the detector hot path.
//!
//! Benchmarks the full per-bar driver loop over synthetic oscillating
//! streams at three history lengths. The oscillation keeps both candidate
//! slots busy so the rule batteries and history scans actually run.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use trendstart_core::domain::Bar;
use trendstart_core::engine::TrendEngine;

fn make_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            let open = close - 0.3;
            let high = close + 1.5;
            let low = open - 1.5;
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                index: i + 1,
                open,
                high,
                low,
                close,
                volume: 1_000_000.0 + (i % 500_000) as f64,
            }
        })
        .collect()
}

fn bench_bar_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("bar_loop");

    for &bar_count in &[252, 1260, 2520] {
        let bars = make_bars(bar_count);
        group.bench_with_input(
            BenchmarkId::new("process_new_bar", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| {
                    let mut engine = TrendEngine::new("BENCH", "1D");
                    for bar in &bars {
                        let events = engine.process_new_bar(*bar).unwrap();
                        black_box(events);
                    }
                    black_box(engine.all_signals())
                });
            },
        );
    }

    group.finish();
}

fn bench_all_signals(c: &mut Criterion) {
    let bars = make_bars(1260);
    let mut engine = TrendEngine::new("BENCH", "1D");
    for bar in &bars {
        engine.process_new_bar(*bar).unwrap();
    }

    c.bench_function("all_signals_1260_bars", |b| {
        b.iter(|| black_box(engine.all_signals()));
    });
}

criterion_group!(benches, bench_bar_loop, bench_all_signals);
criterion_main!(benches);
