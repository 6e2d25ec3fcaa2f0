//! Exercises every primitive in the kernel under real thread contention,
//! not just the one barrier the crate started life benchmarking.

use std::thread;
use std::time::Duration;

use csp_core::barrier::blocking::Barrier;
use csp_core::channel::blocking;
use csp_core::channel::data_store::OverwriteOldest;
use csp_core::channel::{buffered, busy};
use csp_core::parallel::{par_for_n, Parallel};

/// Recurses into a tree of threads `n_child` wide and `rem_depth` deep, all
/// enrolled in the same barrier. Every node, leaf or internal, calls `sync`
/// exactly once, so the whole tree arrives together.
fn barrier_tree(id: String, n_child: usize, rem_depth: usize, b: Barrier) {
    println!("{id}");
    if rem_depth == 0 {
        b.sync();
        return;
    }
    let mut handles = Vec::new();
    for i in 0..n_child {
        let id_child = format!("{id}-{i}");
        let b_child = b.clone();
        b_child.enroll();
        handles.push(thread::spawn(move || {
            barrier_tree(id_child, n_child, rem_depth - 1, b_child)
        }));
    }
    b.sync();
    for h in handles {
        h.join().unwrap();
    }
}

fn stress_barrier_tree() {
    println!("== barrier tree ==");
    let b = Barrier::new(1);
    barrier_tree("root".into(), 2, 5, b);
}

/// Floods a blocking channel and a busy channel with many messages across
/// several writer threads, checking the running sum matches expectation.
fn stress_channels() {
    println!("== channel flood ==");
    const WRITERS: i64 = 8;
    const PER_WRITER: i64 = 2000;

    for label in ["blocking", "busy"] {
        let chan = if label == "blocking" {
            blocking::channel::<i64>()
        } else {
            busy::channel::<i64>()
        };
        let reader = chan.r#in();
        let writers: Vec<_> = (0..WRITERS)
            .map(|_| {
                let writer = chan.out();
                thread::spawn(move || {
                    for v in 0..PER_WRITER {
                        writer.write(v).unwrap();
                    }
                })
            })
            .collect();
        let mut sum = 0i64;
        for _ in 0..(WRITERS * PER_WRITER) {
            sum += reader.read().unwrap();
        }
        for w in writers {
            w.join().unwrap();
        }
        let expected = WRITERS * (0..PER_WRITER).sum::<i64>();
        println!("{label}: sum={sum} expected={expected}");
        assert_eq!(sum, expected);
    }
}

/// A bounded-capacity buffered channel under one writer flooding faster
/// than the reader drains, an overwrite-oldest channel under the same.
fn stress_buffered() {
    println!("== buffered channel ==");
    let chan = buffered::channel::<i64>(Box::new(OverwriteOldest::new(16)));
    let reader = chan.r#in();
    let writer = chan.out();
    let h = thread::spawn(move || {
        for v in 0..5000i64 {
            writer.write(v).unwrap();
        }
    });
    let mut last = -1i64;
    let mut seen = 0usize;
    while seen < 500 {
        if let Ok(v) = reader.read() {
            assert!(v >= last);
            last = v;
            seen += 1;
        }
    }
    h.join().unwrap();
    println!("overwrite-oldest: observed {seen} monotonically increasing values");
}

/// Runs `par_for_n` a few thousand times, stressing the worker pool's
/// reuse-and-resize path under a changing process count.
fn stress_parallel() {
    println!("== parallel ==");
    for round in 0..50 {
        let n = 2 + (round % 5);
        par_for_n(n, |i| {
            thread::sleep(Duration::from_micros(50));
            let _ = i;
        })
        .unwrap();
    }

    let processes: Vec<Box<dyn csp_core::parallel::Process>> = (0..4)
        .map(|_| Box::new(|| {}) as Box<dyn csp_core::parallel::Process>)
        .collect();
    let par = Parallel::new(processes);
    for _ in 0..1000 {
        par.run().unwrap();
    }
    println!("parallel: 1000 rounds of 4 processes completed");
}

fn main() {
    stress_barrier_tree();
    stress_channels();
    stress_buffered();
    stress_parallel();
    println!("all stress scenarios completed");
}
