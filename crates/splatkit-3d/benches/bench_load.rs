use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;

use splatkit_3d::{
    covariance::covariance_from_rotation_scale,
    io::splat::{decode_splat_records, RECORD_SIZE},
    parallel::ExecutionStrategy,
    splats::SplatAttributes,
};

fn random_packed(num_splats: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = Vec::with_capacity(num_splats * RECORD_SIZE);
    for _ in 0..num_splats {
        for _ in 0..6 {
            bytes.extend_from_slice(&rng.random_range(-10.0f32..10.0).to_le_bytes());
        }
        for _ in 0..8 {
            bytes.push(rng.random());
        }
    }
    bytes
}

fn bench_decode_splat_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_splat_records");

    for num_splats in [1_000, 100_000, 1_000_000] {
        let bytes = random_packed(num_splats);
        group.throughput(criterion::Throughput::Bytes(bytes.len() as u64));

        for (name, strategy) in [
            ("serial", ExecutionStrategy::Serial),
            ("parallel", ExecutionStrategy::ParallelElements),
        ] {
            group.bench_with_input(BenchmarkId::new(name, num_splats), &bytes, |b, bytes| {
                b.iter(|| black_box(decode_splat_records(bytes, strategy)))
            });
        }
    }
    group.finish();
}

fn bench_from_attributes(c: &mut Criterion) {
    let mut group = c.benchmark_group("covariance");

    let mut rng = rand::rng();
    let attributes = (0..100_000)
        .map(|_| SplatAttributes {
            position: [rng.random(), rng.random(), rng.random()],
            scale: [rng.random(), rng.random(), rng.random()],
            rotation: [1.0, 0.0, 0.0, 0.0],
            color: [0.5; 3],
            opacity: 1.0,
        })
        .collect::<Vec<_>>();

    group.bench_function("covariance_from_rotation_scale", |b| {
        let rotation = [0.9238795, 0.0, 0.3826834, 0.0];
        let scale = [0.1, 0.2, 0.3];
        b.iter(|| black_box(covariance_from_rotation_scale(&rotation, &scale)))
    });

    for (name, strategy) in [
        ("from_attributes_serial", ExecutionStrategy::Serial),
        ("from_attributes_parallel", ExecutionStrategy::ParallelElements),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                black_box(splatkit_3d::splats::SplatCloud::from_attributes(
                    &attributes,
                    strategy,
                ))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode_splat_records, bench_from_attributes);
criterion_main!(benches);
