//! MUSIC pipeline benchmarks
//!
//! Run with: cargo bench -p doa-core --bench music_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use doa_core::{
    CovarianceEstimator, CsiBuffer, FrameDecoder, HeaderLayout, MusicEstimator, SubspaceSeparator,
};
use doa_sim::{PlaneWave, PlaneWaveConfig};

const ANTENNAS: [usize; 3] = [4, 8, 16];

fn wave(antennas: usize) -> PlaneWave {
    PlaneWave::new(PlaneWaveConfig {
        antennas,
        subcarriers: 64,
        measurements: 4,
        angle_deg: 30.0,
        snr_db: Some(20.0),
        seed: 1,
        ..Default::default()
    })
}

fn buffer(antennas: usize) -> CsiBuffer {
    let frame = wave(antennas).generate().expect("frame");
    CsiBuffer::from_frame(frame).expect("buffer")
}

// ============================================================================
// Frame decoding
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");
    let decoder = FrameDecoder::default();

    for &a in ANTENNAS.iter() {
        let msg = wave(a).encode(HeaderLayout::Batched).expect("message");
        group.throughput(Throughput::Bytes(msg.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(a), &msg, |b, msg| {
            b.iter(|| decoder.decode(black_box(msg)))
        });
    }

    group.finish();
}

// ============================================================================
// Covariance and eigendecomposition
// ============================================================================

fn bench_covariance(c: &mut Criterion) {
    let mut group = c.benchmark_group("covariance");

    for &a in ANTENNAS.iter() {
        let buf = buffer(a);
        group.throughput(Throughput::Elements(CovarianceEstimator.observations(&buf) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(a), &buf, |b, buf| {
            b.iter(|| CovarianceEstimator.estimate(black_box(buf)))
        });
    }

    group.finish();
}

fn bench_eigen(c: &mut Criterion) {
    let mut group = c.benchmark_group("subspace_separation");
    let separator = SubspaceSeparator::default();

    for &a in ANTENNAS.iter() {
        let r = CovarianceEstimator.estimate(&buffer(a)).expect("covariance");
        group.bench_with_input(BenchmarkId::from_parameter(a), &r, |b, r| {
            b.iter(|| separator.separate(black_box(r)))
        });
    }

    group.finish();
}

// ============================================================================
// Full refresh
// ============================================================================

fn bench_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh");

    for &a in ANTENNAS.iter() {
        let mut est = MusicEstimator::default();
        est.ingest_batch(wave(a).messages(2, HeaderLayout::Batched).expect("messages"));
        group.bench_function(BenchmarkId::from_parameter(a), |b| b.iter(|| est.refresh()));
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_covariance, bench_eigen, bench_refresh);
criterion_main!(benches);
