//! # Encoder Benchmarks
//!
//! Feature encoding throughput for the widest standard feature set.
//!
//! Run with: `cargo bench -p stabilis-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use stabilis_core::encoder::{FeatureGroup, encode_groups};
use stabilis_core::{AminoAcid, NumericRecord};
use std::hint::black_box;

/// Records carrying every key the window, frequency and structure groups read.
fn create_records(count: usize) -> Vec<NumericRecord> {
    (0..count)
        .map(|i| {
            let mut record = NumericRecord::new();
            record.insert("oldAA".to_string(), (i % 20 + 1) as f64);
            record.insert("newAA".to_string(), ((i + 7) % 20 + 1) as f64);
            record.insert("struc".to_string(), (i % 8) as f64);
            record.insert("asa".to_string(), (i % 100) as f64 / 100.0);
            for j in 1..=10 {
                record.insert(format!("prevAA{}", j), ((i + j) % 21) as f64);
                record.insert(format!("nextAA{}", j), ((i * 3 + j) % 21) as f64);
            }
            for aa in AminoAcid::ALL {
                record.insert(format!("3D_freq_{}", aa.letter()), 0.05);
            }
            record
        })
        .collect()
}

fn bench_encode(c: &mut Criterion) {
    let groups = vec![
        FeatureGroup::Scalar("asa".to_string()),
        FeatureGroup::Structure,
        FeatureGroup::SpatialFrequency,
        FeatureGroup::Window(10),
    ];

    let mut group = c.benchmark_group("encode");
    for size in [100, 1_000, 5_000] {
        let records = create_records(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| encode_groups(black_box(records), black_box(&groups)).expect("encode"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode);
criterion_main!(benches);
