//! # autoqueue Performance Benchmarks
//!
//! - **Recording**: profile updates per listening event
//! - **Scoring**: six-part scorer over a candidate pool
//! - **Recommendation**: full rank, partition and blend
//! - **Export/Import**: profile blob round trip
//!
//! ```bash
//! cargo bench
//! cargo bench recommend
//! ```

use autoqueue::{Action, ListeningEvent, RecommendationEngine, SessionContext, Track};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::hint::black_box;

fn warmed_engine() -> RecommendationEngine {
    let mut engine = RecommendationEngine::new();
    let actions = [Action::Play, Action::Like, Action::Skip, Action::FullListen, Action::Replay];
    for i in 0..200 {
        let track = Track::new(format!("seed-{i}"), format!("Artist {}", i % 40))
            .with_genre(format!("genre-{}", i % 12));
        engine.record_event(
            ListeningEvent::new(&track, actions[i % actions.len()]).with_durations(90.0, 200.0),
        );
    }
    engine
}

fn candidate_pool(size: usize) -> Vec<Track> {
    (0..size)
        .map(|i| {
            Track::new(format!("cand-{i}"), format!("Artist {}", i % 60))
                .with_genre(format!("genre-{}", i % 15))
                .with_views((i as u64) * 37_000)
        })
        .collect()
}

fn bench_record(c: &mut Criterion) {
    let track = Track::new("bench", "Bench Artist").with_genre("bench");
    c.bench_function("record_event", |b| {
        b.iter_batched(
            warmed_engine,
            |mut engine| {
                engine.record_event(ListeningEvent::new(&track, Action::FullListen));
                black_box(engine)
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_score(c: &mut Criterion) {
    let engine = warmed_engine();
    let pool = candidate_pool(300);
    let context = SessionContext::default().with_current(Track::new("now", "Artist 3"));
    c.bench_function("score_300", |b| {
        b.iter(|| {
            for track in &pool {
                black_box(engine.score(track, &context));
            }
        });
    });
}

fn bench_recommend(c: &mut Criterion) {
    let engine = warmed_engine();
    let context = SessionContext::default();
    let mut group = c.benchmark_group("recommend");
    for size in [10, 100, 500] {
        let pool = candidate_pool(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &pool, |b, pool| {
            b.iter(|| black_box(engine.recommend(pool, &context, 10)));
        });
    }
    group.finish();
}

fn bench_export_import(c: &mut Criterion) {
    let engine = warmed_engine();
    let blob = engine.export_profile();
    c.bench_function("export_profile", |b| b.iter(|| black_box(engine.export_profile())));
    c.bench_function("import_profile", |b| {
        b.iter_batched(
            RecommendationEngine::new,
            |mut fresh| {
                fresh.import_profile(&blob);
                black_box(fresh)
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_record, bench_score, bench_recommend, bench_export_import);
criterion_main!(benches);
