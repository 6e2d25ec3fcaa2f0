//! Busy variant of the multiway barrier (spec.md §4.6). Releases arriving
//! participants by bumping an atomic iteration counter and waking everyone
//! parked on it, rather than notifying a condvar — the same technique
//! `examples/krtab-rendezvous` uses for its one-shot `Rendezvous::wait`,
//! generalized here to a reusable, multi-round barrier. Valid only under
//! preemptive scheduling, same caveat as [`crate::channel::busy`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use cache_padded::CachePadded;

struct Inner {
    enrolled: u32,
    countdown: u32,
}

/// A multiway rendezvous that releases arriving participants by parking on
/// an atomic iteration counter (`atomic_wait::wait`/`wake_all`) instead of a
/// condvar.
#[derive(Clone)]
pub struct Barrier {
    inner: Arc<Mutex<Inner>>,
    iteration: Arc<CachePadded<AtomicU32>>,
    enrolled_hint: Arc<CachePadded<AtomicU32>>,
}

impl Barrier {
    pub fn new(enrolled: u32) -> Self {
        Barrier {
            inner: Arc::new(Mutex::new(Inner {
                enrolled,
                countdown: enrolled,
            })),
            iteration: Arc::new(CachePadded::new(AtomicU32::new(0))),
            enrolled_hint: Arc::new(CachePadded::new(AtomicU32::new(enrolled))),
        }
    }

    /// Blocks until every enrolled participant has arrived this round.
    pub fn sync(&self) {
        let observed = self.iteration.load(Ordering::Acquire);
        let fire = {
            let mut inner = self.inner.lock().unwrap();
            inner.countdown -= 1;
            if inner.countdown == 0 {
                inner.countdown = inner.enrolled;
                true
            } else {
                false
            }
        };
        if fire {
            self.iteration.fetch_add(1, Ordering::Release);
            atomic_wait::wake_all(&self.iteration);
            return;
        }
        let mut current = observed;
        while current == observed {
            atomic_wait::wait(&self.iteration, observed);
            current = self.iteration.load(Ordering::Acquire);
        }
    }

    pub fn enroll(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.enrolled += 1;
        inner.countdown += 1;
        self.enrolled_hint.store(inner.enrolled, Ordering::Release);
    }

    pub fn resign(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.enrolled -= 1;
        inner.countdown -= 1;
        self.enrolled_hint.store(inner.enrolled, Ordering::Release);
        if inner.countdown == 0 {
            inner.countdown = inner.enrolled;
            self.iteration.fetch_add(1, Ordering::Release);
            atomic_wait::wake_all(&self.iteration);
        }
    }

    pub fn reset(&self, enrolled: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.enrolled = enrolled;
        inner.countdown = enrolled;
        self.enrolled_hint.store(enrolled, Ordering::Release);
        self.iteration.fetch_add(1, Ordering::Release);
        atomic_wait::wake_all(&self.iteration);
    }

    pub fn enrolled(&self) -> u32 {
        self.enrolled_hint.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn four_party_barrier_releases_together() {
        let bar = Barrier::new(4);
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let bar = bar.clone();
                thread::spawn(move || bar.sync())
            })
            .collect();
        thread::sleep(std::time::Duration::from_millis(30));
        for h in &handles {
            assert!(!h.is_finished());
        }
        bar.sync();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn repeated_rounds_stay_in_lockstep() {
        let bar = Barrier::new(2);
        for _ in 0..200 {
            let b2 = bar.clone();
            let h = thread::spawn(move || b2.sync());
            bar.sync();
            h.join().unwrap();
        }
    }
}
