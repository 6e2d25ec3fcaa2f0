//! The one process-wide lock spec.md §4.4/§5 calls out: "exactly one
//! process-wide lock exists ... held only across the ENABLE or DISABLE
//! phases of an alt that contains at least one multiway-sync guard."
//!
//! Grounded in `original_source/include/csp/alting_barrier.h`'s
//! `alting_barrier_coordinate` static, but explicitly *not* a process
//! global here (spec.md §9's design note: "encapsulate as a single
//! per-runtime object passed explicitly, so multiple independent CSP
//! runtimes can coexist in one process"). Every [`crate::barrier::alting`]
//! base holds an `Arc<Coordinator>`; all bases sharing one `Coordinator`
//! serialize with each other. Two bases built independently (two
//! `Coordinator`s) do not serialize against one another, matching how two
//! unrelated CSP networks would not in the original either.

use std::sync::{Condvar, Mutex};

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Enabling,
    Disabling,
}

/// Serializes alting-barrier ENABLE sequences against both other ENABLE
/// sequences and any DISABLE sequence, process-(or rather, runtime-)wide,
/// so a barrier cannot fire concurrently with another alt's enable and
/// lose an event (spec.md §4.4's last paragraph).
pub struct Coordinator {
    state: Mutex<State>,
    cond: Condvar,
}

impl Coordinator {
    pub fn new() -> Self {
        Coordinator {
            state: Mutex::new(State::Idle),
            cond: Condvar::new(),
        }
    }

    pub fn start_enable(&self) {
        let mut state = self.state.lock().unwrap();
        state = self.cond.wait_while(state, |s| *s != State::Idle).unwrap();
        *state = State::Enabling;
    }

    pub fn finish_enable(&self) {
        let mut state = self.state.lock().unwrap();
        *state = State::Idle;
        self.cond.notify_all();
    }

    /// `n` (the front-end count the firing barrier must release) is
    /// accepted to mirror the original signature and as a debug-time
    /// sanity anchor; the serialization itself does not depend on it.
    pub fn start_disable(&self, _n: usize) {
        let mut state = self.state.lock().unwrap();
        state = self.cond.wait_while(state, |s| *s != State::Idle).unwrap();
        *state = State::Disabling;
    }

    pub fn finish_disable(&self) {
        let mut state = self.state.lock().unwrap();
        *state = State::Idle;
        self.cond.notify_all();
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}
