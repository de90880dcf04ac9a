//! Бенчмарки перестановки байт и конвертации отсчётов.
//!
//! Запуск: cargo bench -p cphd-benchmark --bench codec_bench

use std::hint::black_box;

use cphd_core::{byte_swap, codec};
use cphd_types::{Dims, SignalFormat};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use num_complex::Complex32;
use rand::{rngs::StdRng, Rng, SeedableRng};

const ROWS: usize = 512;
const COLS: usize = 2048;

fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..len).map(|_| rng.gen()).collect()
}

fn bench_byte_swap(c: &mut Criterion) {
    let mut group = c.benchmark_group("byte_swap");

    for element_size in [2usize, 4, 8] {
        let num_elements = ROWS * COLS * 2;
        let mut buffer = random_bytes(num_elements * element_size);
        group.throughput(Throughput::Bytes(buffer.len() as u64));

        for threads in [1usize, 4] {
            group.bench_with_input(
                BenchmarkId::new(format!("width_{element_size}"), threads),
                &threads,
                |b, &threads| {
                    b.iter(|| byte_swap(black_box(&mut buffer), element_size, num_elements, threads))
                },
            );
        }
    }

    group.finish();
}

fn bench_promote(c: &mut Criterion) {
    let mut group = c.benchmark_group("promote");
    let dims = Dims::new(ROWS, COLS);
    let mut output = vec![Complex32::default(); dims.area()];

    group.throughput(Throughput::Elements(dims.area() as u64));

    // Случайные байты: для CF8 возможны NaN, на скорость это не влияет
    for format in [SignalFormat::CI2, SignalFormat::CI4, SignalFormat::CF8] {
        let input = random_bytes(dims.area() * format.bytes_per_sample());

        for threads in [1usize, 4] {
            group.bench_with_input(
                BenchmarkId::new(format.as_str(), threads),
                &threads,
                |b, &threads| {
                    b.iter(|| codec::promote(black_box(&input), format, dims, threads, &mut output))
                },
            );
        }
    }

    group.finish();
}

fn bench_scale(c: &mut Criterion) {
    let mut group = c.benchmark_group("scale");
    let dims = Dims::new(ROWS, COLS);
    let factors: Vec<f64> = (0..ROWS).map(|r| 1.0 + r as f64 * 1e-3).collect();
    let input = random_bytes(dims.area() * SignalFormat::CI4.bytes_per_sample());
    let mut output = vec![Complex32::default(); dims.area()];

    group.throughput(Throughput::Elements(dims.area() as u64));

    for threads in [1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::new("CI4", threads), &threads, |b, &threads| {
            b.iter(|| {
                codec::scale(
                    black_box(&input),
                    SignalFormat::CI4,
                    dims,
                    &factors,
                    threads,
                    &mut output,
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_byte_swap, bench_promote, bench_scale);
criterion_main!(benches);
