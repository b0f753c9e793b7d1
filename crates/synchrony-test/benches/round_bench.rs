//! Benchmarks for protocol clock queries

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use synchrony_core::{RoundSchedule, SynchronyBound};
use synchrony_time::{ClockConfig, ManualTimeSource, SynchronyClock};

fn started_clock() -> SynchronyClock {
    let clock = SynchronyClock::new(SynchronyBound::default());
    let _ = clock.on_start_signal();
    clock
}

fn bench_current_round(c: &mut Criterion) {
    let clock = started_clock();

    c.bench_function("clock_current_round", |b| b.iter(|| black_box(clock.current_round())));
}

fn bench_is_send_window(c: &mut Criterion) {
    let clock = started_clock();

    c.bench_function("clock_is_send_window", |b| b.iter(|| black_box(clock.is_send_window())));
}

fn bench_status_manual_source(c: &mut Criterion) {
    let source = Arc::new(ManualTimeSource::new());
    let clock = SynchronyClock::with_source(ClockConfig::default(), source.clone());
    let _ = clock.on_start_signal();

    c.bench_function("clock_status_manual_source", |b| {
        b.iter(|| {
            source.advance(Duration::from_millis(10));
            black_box(clock.status())
        })
    });
}

fn bench_schedule_position(c: &mut Criterion) {
    let schedule = RoundSchedule::new(SynchronyBound::default());

    c.bench_function("schedule_position_at", |b| {
        let mut elapsed = Duration::ZERO;
        b.iter(|| {
            elapsed += Duration::from_micros(1337);
            black_box(schedule.position_at(black_box(elapsed)))
        })
    });
}

criterion_group!(
    benches,
    bench_current_round,
    bench_is_send_window,
    bench_status_manual_source,
    bench_schedule_position
);
criterion_main!(benches);
