//! Throughput benchmarks for [`ds_core::Ring`].
//!
//! Run with: `cargo bench --bench ring_throughput`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ds_core::Ring;
use std::sync::Arc;
use std::thread;

const BYTES: u64 = 64 * 1024 * 1024;

/// Single-threaded write-then-read cycle: isolates per-call overhead from
/// any cross-core cache traffic.
fn bench_single_threaded_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_thread");
    group.throughput(Throughput::Bytes(BYTES));

    for chunk_size in [16usize, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                let ring = Ring::new(65536);
                let payload = vec![0xABu8; chunk_size];
                let mut out = vec![0u8; chunk_size];
                let iterations = BYTES / chunk_size as u64;

                b.iter(|| {
                    for _ in 0..iterations {
                        while ring.write(&payload) == 0 {
                            ring.read(&mut out);
                        }
                        while ring.read_space() >= chunk_size as u32 {
                            ring.read(&mut out);
                        }
                        black_box(&out);
                    }
                });
            },
        );
    }

    group.finish();
}

/// Two-thread SPSC throughput: a writer spins on `write`, a reader drains
/// with `read`, matching the ring's actual SPSC concurrency model.
fn bench_spsc_threaded(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.throughput(Throughput::Bytes(BYTES));

    group.bench_function("64k_ring_256b_chunks", |b| {
        b.iter(|| {
            let ring = Arc::new(Ring::new(65536));
            let writer_ring = Arc::clone(&ring);
            let chunk = 256usize;
            let total = BYTES as usize;

            let writer = thread::spawn(move || {
                let payload = vec![0x11u8; chunk];
                let mut sent = 0usize;
                while sent < total {
                    let n = writer_ring.write(&payload);
                    if n > 0 {
                        sent += n as usize;
                    } else {
                        std::hint::spin_loop();
                    }
                }
            });

            let mut received = 0usize;
            let mut buf = vec![0u8; chunk];
            while received < total {
                let n = ring.read(&mut buf);
                if n > 0 {
                    black_box(&buf);
                    received += n as usize;
                } else {
                    std::hint::spin_loop();
                }
            }

            writer.join().unwrap();
        });
    });

    group.finish();
}

/// Transactional multi-part write vs. a single `write` call of the same
/// total size, to measure the overhead (if any) of composing amendments.
fn bench_transactional_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("transactional");
    let total = 4096usize;
    group.throughput(Throughput::Bytes(total as u64));

    group.bench_function("single_write", |b| {
        let ring = Ring::new(8192);
        let payload = vec![0u8; total];
        let mut out = vec![0u8; total];
        b.iter(|| {
            ring.write(&payload);
            ring.read(&mut out);
            black_box(&out);
        });
    });

    group.bench_function("four_part_transaction", |b| {
        let ring = Ring::new(8192);
        let part = vec![0u8; total / 4];
        let mut out = vec![0u8; total];
        b.iter(|| {
            let mut tx = ring.begin_write();
            for _ in 0..4 {
                ring.amend_write(&mut tx, &part).unwrap();
            }
            ring.commit_write(tx);
            ring.read(&mut out);
            black_box(&out);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_threaded_round_trip,
    bench_spsc_threaded,
    bench_transactional_write
);
criterion_main!(benches);
