//! Round-trip latency of a single rendezvous: one writer thread, one reader
//! thread, `N` handoffs, across the blocking and busy transports.

use std::thread;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use csp_core::channel::{blocking, busy};

fn ping_pong_blocking(n: u64) {
    let out = blocking::channel::<u64>();
    let back = blocking::channel::<u64>();
    let (reader_out, writer_out) = (out.r#in(), out.out());
    let (reader_back, writer_back) = (back.r#in(), back.out());
    let h = thread::spawn(move || {
        for _ in 0..n {
            let v = reader_out.read().unwrap();
            writer_back.write(v).unwrap();
        }
    });
    for i in 0..n {
        writer_out.write(i).unwrap();
        reader_back.read().unwrap();
    }
    h.join().unwrap();
}

fn ping_pong_busy(n: u64) {
    let out = busy::channel::<u64>();
    let back = busy::channel::<u64>();
    let (reader_out, writer_out) = (out.r#in(), out.out());
    let (reader_back, writer_back) = (back.r#in(), back.out());
    let h = thread::spawn(move || {
        for _ in 0..n {
            let v = reader_out.read().unwrap();
            writer_back.write(v).unwrap();
        }
    });
    for i in 0..n {
        writer_out.write(i).unwrap();
        reader_back.read().unwrap();
    }
    h.join().unwrap();
}

fn bench_channel_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("Channel rendezvous round trip");
    for n in [1u64, 10, 100] {
        group.bench_with_input(BenchmarkId::new("Blocking", n), &n, |b, i| {
            b.iter(|| ping_pong_blocking(*i))
        });
        group.bench_with_input(BenchmarkId::new("Busy", n), &n, |b, i| {
            b.iter(|| ping_pong_busy(*i))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_channel_latency);
criterion_main!(benches);
