//! Temporal engine benchmarks for rtempo-eval.
//!
//! Measures per-kind delivery cost, broadcast throughput across many
//! patterns, and contention when several threads feed the same pattern.

mod datagen;

use std::thread;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rtempo_eval::{CorrelationFilters, Event, TemporalEngine};
use rtempo_spec::{FilterSpec, parse_pattern_yaml};

fn engine_with(n_patterns: usize) -> TemporalEngine {
    let collection = parse_pattern_yaml(&datagen::gen_patterns(n_patterns)).unwrap();
    let engine = TemporalEngine::default();
    engine.add_collection(&collection).unwrap();
    engine
}

// ---------------------------------------------------------------------------
// Benchmark: single-pattern delivery per kind
// ---------------------------------------------------------------------------

fn bench_deliver_by_kind(c: &mut Criterion) {
    let mut group = c.benchmark_group("deliver_by_kind");

    let event_values = datagen::gen_event_values(1_000);
    let events: Vec<Event> = event_values.iter().map(Event::from_value).collect();
    group.throughput(Throughput::Elements(events.len() as u64));

    let engine = TemporalEngine::default();
    engine
        .compile_sequence_pattern(
            "sequence",
            vec![FilterSpec::eq("type", "login"), FilterSpec::eq("type", "process_create")],
            30_000,
        )
        .unwrap();
    engine
        .compile_frequency_pattern("frequency", FilterSpec::eq("type", "login_failed"), 5, 10_000)
        .unwrap();
    engine
        .compile_correlation_pattern(
            "correlation",
            CorrelationFilters {
                trigger: FilterSpec::eq("type", "alert"),
                response: FilterSpec::eq("type", "ack"),
            },
            60_000,
        )
        .unwrap();

    for id in ["sequence", "frequency", "correlation"] {
        group.bench_with_input(BenchmarkId::from_parameter(id), &events, |b, events| {
            let mut ts = 0i64;
            b.iter(|| {
                for event in events {
                    ts += 7;
                    black_box(engine.deliver_event(id, black_box(event), ts));
                }
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: broadcast across many patterns
// ---------------------------------------------------------------------------

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");
    group.sample_size(20);

    let event_values = datagen::gen_event_values(500);
    let events: Vec<Event> = event_values.iter().map(Event::from_value).collect();
    group.throughput(Throughput::Elements(events.len() as u64));

    for n in [10, 100, 500] {
        let engine = engine_with(n);
        group.bench_with_input(BenchmarkId::new("patterns", n), &events, |b, events| {
            let mut ts = 0i64;
            b.iter(|| {
                for event in events {
                    ts += 13;
                    black_box(engine.broadcast_event(black_box(event), ts));
                }
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: contention on one pattern
// ---------------------------------------------------------------------------

fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");
    group.sample_size(20);

    let event_values = datagen::gen_event_values(1_000);

    for threads in [1, 4, 8] {
        let engine = TemporalEngine::default();
        engine
            .compile_frequency_pattern("hot", FilterSpec::exists("type"), 100, 1_000)
            .unwrap();

        group.throughput(Throughput::Elements((threads * event_values.len()) as u64));
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &threads| {
            b.iter(|| {
                thread::scope(|s| {
                    for _ in 0..threads {
                        s.spawn(|| {
                            for (i, v) in event_values.iter().enumerate() {
                                let event = Event::from_value(v);
                                black_box(engine.deliver_event("hot", &event, i as i64));
                            }
                        });
                    }
                });
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_deliver_by_kind, bench_broadcast, bench_contention);
criterion_main!(benches);
