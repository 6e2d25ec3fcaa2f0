//! Mutex + condvar barrier (spec.md §4.6).

use std::sync::{Arc, Condvar, Mutex};

struct Inner {
    enrolled: u32,
    countdown: u32,
    /// Bumped every time the countdown reaches zero and the round resets.
    /// Waiters park on "my generation hasn't changed yet" instead of
    /// inspecting `countdown` directly, which stays correct even if a
    /// concurrent `enroll`/`resign` changes `enrolled` mid-round.
    generation: u64,
}

/// A multiway rendezvous point. Cloning shares the same underlying state —
/// every clone is a distinct *enrolled participant*, mirroring the source's
/// `shared_ptr<barrier_internal>` (spec.md §3's "Lifecycles": barriers live
/// as long as any endpoint holds them).
#[derive(Clone)]
pub struct Barrier {
    inner: Arc<Mutex<Inner>>,
    cond: Arc<Condvar>,
}

impl Barrier {
    /// Creates a new barrier with `enrolled` participants already enrolled.
    pub fn new(enrolled: u32) -> Self {
        Barrier {
            inner: Arc::new(Mutex::new(Inner {
                enrolled,
                countdown: enrolled,
                generation: 0,
            })),
            cond: Arc::new(Condvar::new()),
        }
    }

    /// Blocks until every enrolled participant has called `sync` this
    /// round. The last arrival resets the countdown and wakes the rest;
    /// per spec.md §5's ordering guarantee, the reset happens-before any
    /// participant's `sync()` returns.
    pub fn sync(&self) {
        let mut inner = self.inner.lock().unwrap();
        let my_generation = inner.generation;
        inner.countdown -= 1;
        if inner.countdown == 0 {
            inner.countdown = inner.enrolled;
            inner.generation += 1;
            self.cond.notify_all();
        } else {
            let _inner = self
                .cond
                .wait_while(inner, |st| st.generation == my_generation)
                .unwrap();
        }
    }

    /// Adds a participant, incrementing both `enrolled` and `countdown` so
    /// the new arrival is expected in the current round too.
    pub fn enroll(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.enrolled += 1;
        inner.countdown += 1;
    }

    /// Removes a participant. If this was the last outstanding arrival for
    /// the round, fires the barrier exactly as a `sync()` would.
    pub fn resign(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.enrolled -= 1;
        inner.countdown -= 1;
        if inner.countdown == 0 {
            inner.countdown = inner.enrolled;
            inner.generation += 1;
            self.cond.notify_all();
        }
    }

    /// Resets the number of enrolled participants and starts a fresh round.
    pub fn reset(&self, enrolled: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.enrolled = enrolled;
        inner.countdown = enrolled;
        inner.generation += 1;
        self.cond.notify_all();
    }

    pub fn enrolled(&self) -> u32 {
        self.inner.lock().unwrap().enrolled
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
    fn reset_then_n_syncs_returns_to_initial_state() {
        let bar = Barrier::new(2);
        for _ in 0..5 {
            let b2 = bar.clone();
            let h = thread::spawn(move || b2.sync());
            bar.sync();
            h.join().unwrap();
        }
        bar.reset(2);
        assert_eq!(bar.enrolled(), 2);
    }

    #[test]
    fn resign_dropping_countdown_to_zero_fires_barrier() {
        let bar = Barrier::new(2);
        let bar2 = bar.clone();
        let h = thread::spawn(move || bar2.sync());
        thread::sleep(std::time::Duration::from_millis(30));
        bar.resign();
        h.join().unwrap();
    }
}
