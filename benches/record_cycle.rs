//! Criterion benchmarks for the per-cycle hot path.
//!
//! Every control cycle pays for `update_topics` plus `log`, so these measure a
//! full cycle for a growing number of columns, plain and gzip-compressed.
//!
//! Run with: cargo bench --bench record_cycle

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use topic_log::{InferMode, Recorder, RecorderOptions};

fn build_recorder(path: &std::path::Path, columns: usize, compressed: bool) -> Recorder {
    let options = RecorderOptions::default().with_compression(compressed);
    let mut recorder = Recorder::open(path, options).unwrap();
    for i in 0..columns {
        match i % 3 {
            0 => {
                recorder
                    .register_queried_numeric(&format!("sensor_{i}"), move || i as f64 * 0.5)
                    .unwrap();
            }
            1 => {
                recorder
                    .register_subscribed_topic(&format!("event_{i}"), InferMode::Last)
                    .unwrap();
            }
            _ => {
                recorder
                    .register_constant_value(&format!("const_{i}"), "1,2")
                    .unwrap();
            }
        }
    }
    recorder.finish_initialization().unwrap();
    recorder
}

fn record_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_cycle");

    for columns in [8usize, 64, 256] {
        for compressed in [false, true] {
            let temp_dir = tempfile::tempdir().unwrap();
            let path = temp_dir.path().join("bench.csv");
            let mut recorder = build_recorder(&path, columns, compressed);
            let label = if compressed { "gzip" } else { "plain" };

            group.throughput(Throughput::Elements(columns as u64));
            group.bench_with_input(BenchmarkId::new(label, columns), &columns, |b, _| {
                b.iter(|| {
                    recorder.publish_numeric("event_1", black_box(3.25)).unwrap();
                    recorder.update_topics().unwrap();
                    black_box(recorder.log().unwrap());
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, record_cycle);
criterion_main!(benches);
