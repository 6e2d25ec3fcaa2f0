//! End-to-end scenarios exercising several primitives together, rather
//! than one module in isolation (spec.md §8's S1–S6).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use csp_core::alt::{Alt, Guard};
use csp_core::alting_barrier::AltingBarrier;
use csp_core::barrier::blocking::Barrier;
use csp_core::channel::data_store::Bounded;
use csp_core::channel::{blocking, buffered};
use csp_core::error::Error;
use csp_core::parallel::{Parallel, Process};

/// S1 — Commstime ring: `Prefix(0) -> Delta -> Successor -> Prefix`, with
/// `Delta` fanning out to a consumer. The consumer must observe
/// `0, 1, 2, ...` monotonically.
#[test]
fn s1_commstime_ring_produces_monotonic_sequence() {
    let loop_back = blocking::channel::<i64>();
    let prefix_to_delta = blocking::channel::<i64>();
    let delta_to_successor = blocking::channel::<i64>();
    let delta_to_consumer = blocking::channel::<i64>();

    // Prefix: emits the seed value, then forwards whatever comes back
    // around the loop.
    {
        let reader = loop_back.r#in();
        let writer = prefix_to_delta.out();
        thread::spawn(move || {
            writer.write(0).unwrap();
            loop {
                let v = match reader.read() {
                    Ok(v) => v,
                    Err(_) => return,
                };
                if writer.write(v).is_err() {
                    return;
                }
            }
        });
    }

    // Delta: duplicates every value to the successor and the consumer.
    {
        let reader = prefix_to_delta.r#in();
        let to_successor = delta_to_successor.out();
        let to_consumer = delta_to_consumer.out();
        thread::spawn(move || loop {
            let v = match reader.read() {
                Ok(v) => v,
                Err(_) => return,
            };
            if to_successor.write(v).is_err() || to_consumer.write(v).is_err() {
                return;
            }
        });
    }

    // Successor: increments and feeds back to Prefix.
    {
        let reader = delta_to_successor.r#in();
        let writer = loop_back.out();
        thread::spawn(move || loop {
            let v = match reader.read() {
                Ok(v) => v,
                Err(_) => return,
            };
            if writer.write(v + 1).is_err() {
                return;
            }
        });
    }

    let consumer = delta_to_consumer.r#in();
    let mut last = -1i64;
    const N: usize = 500;
    for _ in 0..N {
        let v = consumer.read().unwrap();
        assert_eq!(v, last + 1);
        last = v;
    }
    assert_eq!(last, (N - 1) as i64);
}

/// S2 — Stressed select: a reader runs `fair_select` over `K` channels,
/// each fed by `W` writers sending `(writer_id, seq)` pairs. Every pair's
/// sequence must be strictly increasing, and by message conservation every
/// channel's final tally must equal exactly `W` times its writers'
/// message count (no loss, no duplication, no starvation).
#[test]
fn s2_fair_select_drains_every_writer_in_order() {
    const K: usize = 3;
    const W: usize = 2;
    const MSGS: i64 = 20;

    let chans: Vec<_> = (0..K).map(|_| blocking::channel::<(usize, i64)>()).collect();
    let guards: Vec<_> = chans.iter().map(|c| c.r#in().guarded()).collect();

    let mut writer_handles = Vec::new();
    for (ch_idx, chan) in chans.iter().enumerate() {
        for writer_id in 0..W {
            let writer = chan.out();
            writer_handles.push(thread::spawn(move || {
                for seq in 0..MSGS {
                    writer.write((writer_id, seq)).unwrap();
                }
                ch_idx
            }));
        }
    }

    let mut alt = Alt::new(
        guards
            .iter()
            .cloned()
            .map(|g| Box::new(g) as Box<dyn Guard>)
            .collect(),
    );

    let mut last_seq: HashMap<(usize, usize), i64> = HashMap::new();
    let mut per_channel_count = vec![0usize; K];
    let total = K * W * MSGS as usize;
    for _ in 0..total {
        let selected = alt.fair_select().unwrap();
        let (writer_id, seq) = guards[selected].read().unwrap();
        per_channel_count[selected] += 1;
        let key = (selected, writer_id);
        if let Some(&prev) = last_seq.get(&key) {
            assert!(seq > prev, "sequence must strictly increase per writer");
        }
        last_seq.insert(key, seq);
    }

    for count in per_channel_count {
        assert_eq!(count, W * MSGS as usize);
    }
    for h in writer_handles {
        h.join().unwrap();
    }
}

/// S3 — Dining philosophers with a security guard limiting at most `N-1`
/// seated diners at once, demonstrating no deadlock and no starvation.
#[test]
fn s3_dining_philosophers_with_security_guard_avoid_deadlock() {
    const N: usize = 5;
    const ROUNDS: usize = 30;

    let forks: Vec<_> = (0..N)
        .map(|_| {
            let fork = blocking::channel::<()>();
            fork.write(()).unwrap();
            fork
        })
        .collect();

    let security = buffered::channel::<()>(Box::new(Bounded::new(N - 1)));
    for _ in 0..(N - 1) {
        security.write(()).unwrap();
    }

    let currently_seated = Arc::new(AtomicUsize::new(0));
    let observed_max = Arc::new(AtomicUsize::new(0));
    let eat_counts: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(vec![0; N]));

    let mut handles = Vec::new();
    for i in 0..N {
        let left = forks[i].clone();
        let right = forks[(i + 1) % N].clone();
        let security = security.clone();
        let currently_seated = Arc::clone(&currently_seated);
        let observed_max = Arc::clone(&observed_max);
        let eat_counts = Arc::clone(&eat_counts);
        handles.push(thread::spawn(move || {
            for _ in 0..ROUNDS {
                let seat = security.read().unwrap();
                let left_fork = left.read().unwrap();
                let right_fork = right.read().unwrap();

                let seated = currently_seated.fetch_add(1, Ordering::SeqCst) + 1;
                observed_max.fetch_max(seated, Ordering::SeqCst);
                thread::sleep(Duration::from_micros(50));
                currently_seated.fetch_sub(1, Ordering::SeqCst);
                eat_counts.lock().unwrap()[i] += 1;

                right.write(right_fork).unwrap();
                left.write(left_fork).unwrap();
                security.write(seat).unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert!(observed_max.load(Ordering::SeqCst) <= N - 1);
    for count in eat_counts.lock().unwrap().iter() {
        assert_eq!(*count, ROUNDS);
    }
}

/// S4 — Poison propagation: a three-stage pipeline `A -> B -> C`; poisoning
/// `C`'s input eventually poisons `B`'s write, then `A`'s write, and every
/// end subsequently raises the same poison strength.
#[test]
fn s4_poison_propagates_back_through_the_pipeline() {
    let ab = blocking::channel::<i64>();
    let bc = blocking::channel::<i64>();

    let ab_check = ab.out();
    let bc_check = bc.r#in();

    let a_error: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));
    let a_error_for_thread = Arc::clone(&a_error);
    let a_writer = ab.out();
    let a = thread::spawn(move || {
        for i in 0.. {
            if let Err(e) = a_writer.write(i) {
                *a_error_for_thread.lock().unwrap() = Some(e);
                return;
            }
        }
    });

    let b_error: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));
    let b_error_for_thread = Arc::clone(&b_error);
    let ab_reader = ab.r#in();
    let bc_writer = bc.out();
    let b = thread::spawn(move || loop {
        let v = match ab_reader.read() {
            Ok(v) => v,
            Err(e) => {
                *b_error_for_thread.lock().unwrap() = Some(e);
                return;
            }
        };
        if let Err(Error::Poisoned(strength)) = bc_writer.write(v) {
            ab_reader.poison(strength);
            *b_error_for_thread.lock().unwrap() = Some(Error::Poisoned(strength));
            return;
        }
    });

    let c_reader = bc.r#in();
    for _ in 0..5 {
        c_reader.read().unwrap();
    }
    c_reader.poison(1);
    assert_eq!(c_reader.read(), Err(Error::Poisoned(1)));

    a.join().unwrap();
    b.join().unwrap();

    assert_eq!(*a_error.lock().unwrap(), Some(Error::Poisoned(1)));
    assert_eq!(*b_error.lock().unwrap(), Some(Error::Poisoned(1)));
    assert_eq!(ab_check.write(0), Err(Error::Poisoned(1)));
    assert_eq!(bc_check.read(), Err(Error::Poisoned(1)));
}

/// S5 — Barrier reset across parallel runs: a `Parallel` of 4 processes,
/// each doing 100 syncs on a shared 4-party barrier, run 5 times in a row.
#[test]
fn s5_barrier_resets_cleanly_across_repeated_parallel_runs() {
    let barrier = Barrier::new(4);
    let total_syncs = Arc::new(AtomicUsize::new(0));

    let processes: Vec<Box<dyn Process>> = (0..4)
        .map(|_| {
            let barrier = barrier.clone();
            let total_syncs = Arc::clone(&total_syncs);
            Box::new(move || {
                for _ in 0..100 {
                    barrier.sync();
                    total_syncs.fetch_add(1, Ordering::SeqCst);
                }
            }) as Box<dyn Process>
        })
        .collect();

    let par = Parallel::new(processes);
    for _ in 0..5 {
        par.run().unwrap();
    }

    assert_eq!(total_syncs.load(Ordering::SeqCst), 5 * 4 * 100);
    assert_eq!(barrier.enrolled(), 4);
}

/// S6 — Alting-barrier race: three front-ends of the same alting barrier.
/// `pri_select_with_skip_never_picks_the_barrier` (in
/// `alting_barrier::tests`) covers the priority half; this covers the fair
/// half, where all three front-ends commit to the same firing.
#[test]
fn s6_fair_select_over_a_lone_alting_barrier_guard_commits_together() {
    let fronts = AltingBarrier::create(3);
    let handles: Vec<_> = fronts
        .into_iter()
        .map(|front| {
            thread::spawn(move || {
                front.mark().unwrap();
                let mut alt = Alt::new(vec![Box::new(front)]);
                alt.fair_select().unwrap()
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 0);
    }
}
