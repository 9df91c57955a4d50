use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sleeprs::models::{NamedPhases, PhaseWindow, SleepPhase, StateInterval};
use sleeprs::scoring::SleepScorer;
use sleeprs::timeline::{fill_interval_phases, fill_named_phases, interval_segments};

/// Benchmarks for the minute-bucket timeline expansion and scoring
///
/// Inputs are synthetic nights of the given length, split into
/// alternating phases of 5 to 25 minutes.

const NIGHT_START: i64 = 1_709_330_400;

fn create_intervals(hours: i64) -> Vec<StateInterval> {
    let end = NIGHT_START + hours * 3600;
    let mut intervals = Vec::new();
    let mut cursor = NIGHT_START;
    let mut i = 0;
    while cursor < end {
        let length = (5 + (i * 7) % 21) * 60;
        let next = (cursor + length).min(end);
        intervals.push(StateInterval::new(cursor, next, (i % 4) as u8));
        cursor = next;
        i += 1;
    }
    intervals
}

fn create_named_phases(hours: i64) -> NamedPhases {
    let mut phases = NamedPhases::new();
    for interval in create_intervals(hours) {
        let phase = SleepPhase::ALL[interval.state as usize % SleepPhase::ALL.len()];
        phases.entry(phase).or_default().push(PhaseWindow {
            start_time: interval.start,
            end_time: interval.end,
        });
    }
    phases
}

fn bench_interval_phases(c: &mut Criterion) {
    let mut group = c.benchmark_group("Interval Phases");

    for &hours in &[1, 8, 24] {
        let intervals = create_intervals(hours);
        group.throughput(Throughput::Elements(intervals.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("fill_interval_phases", hours),
            &intervals,
            |b, intervals| b.iter(|| fill_interval_phases(black_box(intervals))),
        );
        group.bench_with_input(
            BenchmarkId::new("interval_segments_count", hours),
            &intervals,
            |b, intervals| b.iter(|| interval_segments(black_box(intervals)).count()),
        );
    }

    group.finish();
}

fn bench_named_phases(c: &mut Criterion) {
    let mut group = c.benchmark_group("Named Phases");

    for &hours in &[1, 8, 24] {
        let phases = create_named_phases(hours);
        group.bench_with_input(
            BenchmarkId::new("fill_named_phases", hours),
            &phases,
            |b, phases| b.iter(|| fill_named_phases(black_box(phases))),
        );
    }

    group.finish();
}

fn bench_scoring(c: &mut Criterion) {
    let scorer = SleepScorer::new();
    let scores: Vec<f64> = (0..365)
        .map(|d| scorer.score(25_000 + d * 20, 5_000 + d * 3, 3_000 + d * 2))
        .collect();

    c.bench_function("day_score_365", |b| {
        b.iter(|| scorer.day_score(black_box(&scores)))
    });
}

criterion_group!(benches, bench_interval_phases, bench_named_phases, bench_scoring);
criterion_main!(benches);
