//! Criterion benchmarks for the waypoint sequencer.
//!
//! Measures sequencing time for exhaustive search (up to eight pickups) and
//! for the nearest-neighbour and 2-opt heuristic on larger groups.
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench --package carpool-solver
//! ```

// Criterion macros generate code that triggers missing_docs warnings.
#![allow(missing_docs, reason = "Criterion macros generate undocumented code")]

use std::time::Duration;

use carpool_core::{HaversineEstimator, Sequencer};
use carpool_solver::{SequencerConfig, WaypointSequencer};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};


use bench_support::{BENCHMARK_SEED, generate_request};

/// Pickup counts solved exhaustively.
const EXHAUSTIVE_SIZES: &[usize] = &[4, 6, 8];

/// Pickup counts solved heuristically.
const HEURISTIC_SIZES: &[usize] = &[12, 25, 50];

fn bench_group(c: &mut Criterion, name: &str, sizes: &[usize], config: SequencerConfig) {
    let mut group = c.benchmark_group(name);
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(5));

    let sequencer = WaypointSequencer::with_config(HaversineEstimator::default(), config);
    for &size in sizes {
        let request = generate_request(size, BENCHMARK_SEED);
        let throughput_size = u64::try_from(size).unwrap_or(u64::MAX);
        group.throughput(Throughput::Elements(throughput_size));
        group.bench_with_input(BenchmarkId::new("pickups", size), &request, |b, request| {
            b.iter(|| {
                #[expect(
                    clippy::let_underscore_must_use,
                    reason = "Benchmarking sequencing performance, result is intentionally discarded"
                )]
                let _ = sequencer.sequence(request);
            });
        });
    }

    group.finish();
}

fn bench_exhaustive(c: &mut Criterion) {
    bench_group(c, "exhaustive", EXHAUSTIVE_SIZES, SequencerConfig::default());
}

fn bench_heuristic(c: &mut Criterion) {
    bench_group(
        c,
        "nearest_neighbour_two_opt",
        HEURISTIC_SIZES,
        SequencerConfig::default().with_exhaustive_limit(0),
    );
}

criterion_group!(benches, bench_exhaustive, bench_heuristic);
criterion_main!(benches);
