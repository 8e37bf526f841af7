//! SD2SNES compiler benchmark suite.
//!
//! Benchmarks compiling write batches at different scales:
//! - Batch payload sizes: 1, 64, 1024, 8192 bytes
//! - Single large write vs. many one-byte writes
//!
//! Run with: cargo bench --bench sd2snes_compile
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use qusb2snes_client::{WRAM_START, WriteOp, sd2snes};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const PAYLOAD_SIZES: &[usize] = &[1, 64, 1024, 8192];

// ============================================================================
// Benchmark: Compile
// ============================================================================

fn bench_single_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_single_write");

    for &size in PAYLOAD_SIZES {
        let writes = vec![WriteOp::new(WRAM_START, vec![0xA5; size])];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &writes, |b, writes| {
            b.iter(|| sd2snes::compile(black_box(writes)));
        });
    }

    group.finish();
}

fn bench_scattered_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_scattered_writes");

    for &size in PAYLOAD_SIZES {
        let writes: Vec<WriteOp> = (0..size as u32)
            .map(|i| WriteOp::new(WRAM_START + i * 7, [i as u8]))
            .collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &writes, |b, writes| {
            b.iter(|| sd2snes::compile(black_box(writes)));
        });
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let writes: Vec<WriteOp> = (0..1024u32)
        .map(|i| WriteOp::new(WRAM_START + i * 16, [0; 16]))
        .collect();

    c.bench_function("validate_1024_writes", |b| {
        b.iter(|| sd2snes::validate(black_box(&writes)));
    });
}

criterion_group!(
    benches,
    bench_single_write,
    bench_scattered_writes,
    bench_validate
);
criterion_main!(benches);
