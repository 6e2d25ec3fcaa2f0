use std::time::{Duration, Instant};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use csp_core::barrier::{blocking, busy};

trait BarrierLike: Clone + Send {
    fn enroll(&self);
    fn sync(&self);
}

impl BarrierLike for blocking::Barrier {
    fn enroll(&self) {
        blocking::Barrier::enroll(self);
    }
    fn sync(&self) {
        blocking::Barrier::sync(self);
    }
}

impl BarrierLike for busy::Barrier {
    fn enroll(&self) {
        busy::Barrier::enroll(self);
    }
    fn sync(&self) {
        busy::Barrier::sync(self);
    }
}

fn recurse_barrier<B: BarrierLike + 'static>(n_child: usize, rem_depth: usize, b: B) {
    if rem_depth == 0 {
        b.sync();
        return;
    }
    let mut handles = Vec::new();
    for _i in 0..n_child {
        let child = b.clone();
        child.enroll();
        handles.push(std::thread::spawn(move || {
            recurse_barrier(n_child, rem_depth - 1, child)
        }));
    }
    b.sync();
    for h in handles {
        h.join().unwrap();
    }
}

const N_CHILD: usize = 2;

fn bench_blocking(depth: usize) -> Duration {
    let start = Instant::now();
    let b = blocking::Barrier::new(1);
    recurse_barrier(N_CHILD, depth, b);
    start.elapsed()
}

fn bench_busy(depth: usize) -> Duration {
    let start = Instant::now();
    let b = busy::Barrier::new(1);
    recurse_barrier(N_CHILD, depth, b);
    start.elapsed()
}

fn recurse_thread(n_child: usize, rem_depth: usize) {
    if rem_depth == 0 {
        return;
    }
    let mut handles = Vec::new();
    for _i in 0..n_child {
        let h = std::thread::spawn(move || recurse_thread(n_child, rem_depth - 1));
        handles.push(h);
    }
    for h in handles {
        h.join().unwrap();
    }
}

fn bench_threads(depth: usize) -> Duration {
    let start = Instant::now();
    recurse_thread(N_CHILD, depth);
    start.elapsed()
}

fn bench_power_2(c: &mut Criterion) {
    let mut group = c.benchmark_group("Thread tree (2 children)");
    for depth in 1..=10 {
        group.bench_with_input(BenchmarkId::new("BlockingBarrier", depth), &depth, |b, i| {
            b.iter(|| bench_blocking(*i))
        });
        group.bench_with_input(BenchmarkId::new("BusyBarrier", depth), &depth, |b, i| {
            b.iter(|| bench_busy(*i))
        });
        group.bench_with_input(BenchmarkId::new("ThreadsOnly", depth), &depth, |b, i| {
            b.iter(|| bench_threads(*i))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_power_2);
criterion_main!(benches);
