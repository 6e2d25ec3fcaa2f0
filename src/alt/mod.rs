//! External choice ("select") over a set of [`Guard`]s: channel reads,
//! timeouts, alting-barrier events, and the trivial `Skip`/`Stop` guards.
//!
//! # Design
//!
//! The C++ original wires guards back to the owning `alt` through
//! `shared_ptr` back-edges. Rust's ownership rules make that awkward to
//! express safely, so here a guard never reaches back into the `Alt` that
//! owns it. Instead [`Alt::select`] hands each guard a cheap, clonable
//! [`AltHandle`] — a tagged reference to the alt's shared wait state — and
//! the guard's own index within the alt. A guard that cannot decide
//! readiness synchronously (for instance a channel with no value yet)
//! stashes the `(handle, index)` pair wherever it keeps its own listener
//! slot and calls [`AltHandle::schedule`] later, from whatever thread
//! notices the event. The alt never dereferences anything it does not own.

mod core;

pub use core::AltHandle;

use std::sync::Arc;
use std::thread::ThreadId;

use crate::alting_barrier::Coordinator;
use crate::error::{Error, ProtocolViolation, Result};

use self::core::AltCore;

/// An object that can answer "are you ready now?" and "were you ready at
/// commit?" for an [`Alt`]. See spec.md §3's Guard entry and §4.4.
pub trait Guard: Send {
    /// Called once per `select()` while the guard is still within its
    /// pre-conditioned turn. Returns `Ok(true)` if the guard is ready right
    /// now, in which case the alt commits to it without ever parking.
    /// Otherwise the guard must remember `(handle, index)` so it can call
    /// [`AltHandle::schedule`] the moment it becomes ready.
    fn enable(&self, handle: &AltHandle, index: usize) -> Result<bool>;

    /// Called once per previously-enabled guard, in the reverse of enable
    /// order, after the alt has committed to a guard. Must forget whatever
    /// listener state `enable` installed. Returns `Ok(true)` if this guard
    /// was *also* ready at commit time — the first guard to report this
    /// during disable takes over as the final selection (spec.md §4.4).
    fn disable(&self, handle: &AltHandle, index: usize) -> Result<bool>;

    /// Non-`None` only for guards on a multiway-sync (alting-barrier)
    /// event. Used to find the shared [`Coordinator`] that serializes this
    /// alt's enable phase against every other alt touching the same
    /// barrier base (spec.md §4.4's last paragraph).
    fn coordinator(&self) -> Option<Arc<Coordinator>> {
        None
    }
}

/// A guard that is always ready. Priority-selecting `Skip` alongside other
/// guards means those other guards are never chosen.
pub struct Skip;

impl Guard for Skip {
    fn enable(&self, _handle: &AltHandle, _index: usize) -> Result<bool> {
        Ok(true)
    }

    fn disable(&self, _handle: &AltHandle, _index: usize) -> Result<bool> {
        Ok(true)
    }
}

/// A guard that is never ready. Useful as a placeholder alongside a
/// pre-condition mask, or to build a select that blocks forever (spec.md
/// §8's boundary case, verified with a finite timeout in tests).
pub struct Stop;

impl Guard for Stop {
    fn enable(&self, _handle: &AltHandle, _index: usize) -> Result<bool> {
        Ok(false)
    }

    fn disable(&self, _handle: &AltHandle, _index: usize) -> Result<bool> {
        Ok(false)
    }
}

/// Selects among a fixed sequence of guards. Owned by exactly one task —
/// [`Alt::select`] and friends return [`Error::OwnershipViolation`] if
/// called from a thread other than the one that first used this `Alt`.
pub struct Alt {
    guards: Vec<Box<dyn Guard>>,
    next: usize,
    core: Arc<AltCore>,
    owner: std::sync::Mutex<Option<ThreadId>>,
}

impl Alt {
    /// Builds an alt over the given guards, in the order they will be
    /// tried under priority selection.
    pub fn new(guards: Vec<Box<dyn Guard>>) -> Self {
        assert!(!guards.is_empty(), "an alt needs at least one guard");
        Alt {
            guards,
            next: 0,
            core: Arc::new(AltCore::new()),
            owner: std::sync::Mutex::new(None),
        }
    }

    /// The default selection mode: fair. Equivalent to [`Alt::fair_select`].
    pub fn select(&mut self) -> Result<usize> {
        self.fair_select()
    }

    /// The default selection mode with a pre-condition mask.
    pub fn select_with(&mut self, pre: &[bool]) -> Result<usize> {
        self.fair_select_with(pre)
    }

    /// Always tries guards starting from index 0: the lowest-indexed ready
    /// guard wins.
    pub fn pri_select(&mut self) -> Result<usize> {
        self.run(0, None, false)
    }

    /// Priority selection with a pre-condition mask.
    pub fn pri_select_with(&mut self, pre: &[bool]) -> Result<usize> {
        self.check_pre_len(pre)?;
        self.run(0, Some(pre), false)
    }

    /// Tries guards starting just after whichever guard won last time, so
    /// no guard starves under repeated selection.
    pub fn fair_select(&mut self) -> Result<usize> {
        self.run(self.next, None, true)
    }

    /// Fair selection with a pre-condition mask.
    pub fn fair_select_with(&mut self, pre: &[bool]) -> Result<usize> {
        self.check_pre_len(pre)?;
        self.run(self.next, Some(pre), true)
    }

    fn check_pre_len(&self, pre: &[bool]) -> Result<()> {
        if pre.len() != self.guards.len() {
            return Err(Error::ProtocolViolation(
                ProtocolViolation::PreConditionLengthMismatch {
                    expected: self.guards.len(),
                    got: pre.len(),
                },
            ));
        }
        Ok(())
    }

    fn check_owner(&self) -> Result<()> {
        let current = std::thread::current().id();
        let mut owner = self.owner.lock().unwrap();
        match *owner {
            Some(id) if id != current => Err(Error::OwnershipViolation(
                crate::error::OwnershipViolation::SharedAlt,
            )),
            _ => {
                *owner = Some(current);
                Ok(())
            }
        }
    }

    /// The ENABLE / WAIT / DISABLE algorithm from spec.md §4.4, shared by
    /// every public selection method.
    fn run(&mut self, start: usize, pre: Option<&[bool]>, fair: bool) -> Result<usize> {
        self.check_owner()?;
        if let Some(pre) = pre {
            self.check_pre_len(pre)?;
        }
        let n = self.guards.len();
        self.core.reset();

        let coordinator = self.guards.iter().find_map(|g| g.coordinator());
        if let Some(c) = &coordinator {
            c.start_enable();
        }

        let handle = self.core.handle();
        let mut visited = Vec::with_capacity(n);
        let mut chosen = None;
        for offset in 0..n {
            let i = (start + offset) % n;
            if let Some(pre) = pre {
                if !pre[i] {
                    continue;
                }
            }
            visited.push(i);
            let ready = match self.guards[i].enable(&handle, i) {
                Ok(ready) => ready,
                Err(e) => {
                    if let Some(c) = &coordinator {
                        c.finish_enable();
                    }
                    return Err(e);
                }
            };
            if ready {
                chosen = Some(i);
                break;
            }
        }

        if let Some(c) = &coordinator {
            c.finish_enable();
        }

        let mut selected = match chosen {
            Some(i) => i,
            None => self.core.wait_for_event(),
        };

        // DISABLE: reverse of enable order, starting just before `selected`
        // within the set of guards that were actually enabled. The guard
        // that won stays untouched; every other enabled guard must forget
        // its listener state exactly once.
        let m = visited.len();
        let pos = visited
            .iter()
            .position(|&x| x == selected)
            .expect("selected guard was never enabled");
        if let Some(c) = &coordinator {
            c.start_disable(m);
        }
        let mut override_done = false;
        let mut disable_err = None;
        for step in 1..m {
            let vi = (pos + m - step) % m;
            let i = visited[vi];
            match self.guards[i].disable(&handle, i) {
                Ok(ready) => {
                    if ready && !override_done {
                        selected = i;
                        override_done = true;
                    }
                }
                Err(e) => {
                    disable_err = Some(e);
                    break;
                }
            }
        }
        if let Some(c) = &coordinator {
            c.finish_disable();
        }
        if let Some(e) = disable_err {
            return Err(e);
        }

        self.core.finish();
        self.next = if fair { (selected + 1) % n } else { 0 };
        Ok(selected)
    }
}
