//! A multiway rendezvous whose event can itself be a [`crate::alt::Guard`]
//! (spec.md §4.5). Front-ends share a *base* that owns the real counters
//! and the list of front-ends; the base triggers every other registered
//! front-end's alt when the last required party arrives.
//!
//! Grounded in `original_source/include/csp/alting_barrier.h`'s
//! `alting_barrier`/`alting_barrier_internal`/`alting_barrier_base` triple;
//! collapsed here into `AltingBarrier` (front-end) + `Base` (shared state)
//! + [`Coordinator`] (the one process-wide serializing lock, made an
//! explicit field instead of a `static`, per spec.md §9).

mod coordinator;

pub use coordinator::Coordinator;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use crate::alt::{Alt, AltHandle, Guard};
use crate::error::{Error, InvariantViolation, OwnershipViolation, Result};
use crate::timer::Timer;

struct FrontEndState {
    id: usize,
    owner: Mutex<Option<ThreadId>>,
    enrolled: Mutex<bool>,
    alt: Mutex<Option<(AltHandle, usize)>>,
    /// Set on every other front-end by whichever one discovers the
    /// countdown has reached zero, so their own `disable` can tell "I was
    /// part of this firing" apart from "nothing happened yet".
    fired: AtomicBool,
    /// Set on `self` when `enable` fires the barrier synchronously (no
    /// listener was ever stored in `alt`, so `fired` doesn't apply to us).
    self_fired: AtomicBool,
}

struct BaseInner {
    front_ends: Vec<Arc<FrontEndState>>,
    enrolled: u32,
    countdown: u32,
    next_id: usize,
}

struct Base {
    inner: Mutex<BaseInner>,
    coordinator: Arc<Coordinator>,
}

impl Base {
    fn new_front_end(self: &Arc<Self>) -> Arc<FrontEndState> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        let fe = Arc::new(FrontEndState {
            id,
            owner: Mutex::new(None),
            enrolled: Mutex::new(true),
            alt: Mutex::new(None),
            fired: AtomicBool::new(false),
            self_fired: AtomicBool::new(false),
        });
        inner.front_ends.push(Arc::clone(&fe));
        fe
    }
}

/// A front-end onto a shared alting-barrier [`Base`]. Cheap to clone
/// (shares the `Arc`s) but each clone is the *same* participant, not a new
/// one — use [`AltingBarrier::expand`] to add participants.
#[derive(Clone)]
pub struct AltingBarrier {
    base: Arc<Base>,
    front_end: Arc<FrontEndState>,
}

impl AltingBarrier {
    /// Creates a new alting barrier with a single enrolled front-end.
    pub fn new() -> Self {
        let base = Arc::new(Base {
            inner: Mutex::new(BaseInner {
                front_ends: Vec::new(),
                enrolled: 0,
                countdown: 0,
                next_id: 0,
            }),
            coordinator: Arc::new(Coordinator::new()),
        });
        let front_end = base.new_front_end();
        {
            let mut inner = base.inner.lock().unwrap();
            inner.enrolled = 1;
            inner.countdown = 1;
        }
        AltingBarrier { base, front_end }
    }

    /// Creates `n` front-ends sharing one fresh base, all enrolled.
    pub fn create(n: u32) -> Vec<AltingBarrier> {
        assert!(n > 0, "an alting barrier needs at least one front-end");
        let first = AltingBarrier::new();
        let mut out = vec![first];
        for _ in 1..n {
            out.push(out[0].expand());
        }
        out
    }

    fn check_owner(&self) -> Result<()> {
        let current = std::thread::current().id();
        let mut owner = self.front_end.owner.lock().unwrap();
        match *owner {
            Some(id) if id != current => {
                Err(Error::OwnershipViolation(OwnershipViolation::NotOwner))
            }
            _ => {
                *owner = Some(current);
                Ok(())
            }
        }
    }

    /// Records the current task as this front-end's owner, for the
    /// ownership check every other operation performs.
    pub fn mark(&self) -> Result<()> {
        self.check_owner()
    }

    /// Commits synchronously to this barrier firing: wraps the front-end
    /// in a single-guard alt and priority-selects on it.
    pub fn sync(&self) -> Result<()> {
        let mut alt = Alt::new(vec![Box::new(self.clone())]);
        alt.pri_select()?;
        Ok(())
    }

    /// Probes readiness within `budget`, committing if the barrier fires
    /// in time. Returns `true` iff it fired.
    pub fn poll(&self, budget: Duration) -> Result<bool> {
        let timer = Timer;
        let mut alt = Alt::new(vec![
            Box::new(self.clone()),
            Box::new(timer.guard(Instant::now() + budget)),
        ]);
        Ok(alt.pri_select()? == 0)
    }

    /// Allocates one new front-end bound to the same base, enrolled in the
    /// current round.
    pub fn expand(&self) -> AltingBarrier {
        self.check_owner().ok();
        let fe = self.base.new_front_end();
        let mut inner = self.base.inner.lock().unwrap();
        inner.enrolled += 1;
        inner.countdown += 1;
        AltingBarrier {
            base: Arc::clone(&self.base),
            front_end: fe,
        }
    }

    /// Allocates `n` new front-ends bound to the same base.
    pub fn expand_n(&self, n: u32) -> Vec<AltingBarrier> {
        (0..n).map(|_| self.expand()).collect()
    }

    /// Detaches this front-end from the base. If its removal drops the
    /// countdown to zero, fires the barrier for everyone else still
    /// enrolled.
    pub fn contract(&self) -> Result<()> {
        self.base.coordinator.start_enable();
        self.base.coordinator.start_disable(1);
        let result = remove_front_end(&self.base, &self.front_end);
        self.base.coordinator.finish_disable();
        self.base.coordinator.finish_enable();
        result
    }

    /// Batch-detaches several front-ends of the same base.
    pub fn contract_many(ab: &[AltingBarrier]) -> Result<()> {
        if ab.is_empty() {
            return Ok(());
        }
        let base = &ab[0].base;
        base.coordinator.start_enable();
        base.coordinator.start_disable(ab.len());
        let mut result = Ok(());
        for a in ab {
            result = result.and(remove_front_end(base, &a.front_end));
        }
        base.coordinator.finish_disable();
        base.coordinator.finish_enable();
        result
    }

    /// Enrolls this front-end (it must currently be resigned).
    pub fn enroll(&self) {
        let mut enrolled = self.front_end.enrolled.lock().unwrap();
        if *enrolled {
            return;
        }
        *enrolled = true;
        let mut inner = self.base.inner.lock().unwrap();
        inner.enrolled += 1;
        inner.countdown += 1;
    }

    /// Resigns this front-end from the base. If this was the last
    /// outstanding arrival for the round, fires the barrier.
    ///
    /// Wrapped in the same enable/disable bracket `contract` uses: resigning
    /// can fire the barrier for peers parked in an `enable`, so it must be
    /// serialized against any other alt touching this base exactly like a
    /// real enable/disable sequence would be.
    pub fn resign(&self) {
        let mut enrolled = self.front_end.enrolled.lock().unwrap();
        if !*enrolled {
            return;
        }
        self.base.coordinator.start_enable();
        self.base.coordinator.start_disable(1);
        *enrolled = false;
        let mut inner = self.base.inner.lock().unwrap();
        inner.enrolled -= 1;
        inner.countdown -= 1;
        if inner.countdown == 0 {
            inner.countdown = inner.enrolled;
            notify_peers(&inner, self.front_end.id);
        }
        drop(inner);
        self.base.coordinator.finish_disable();
        self.base.coordinator.finish_enable();
    }
}

impl Default for AltingBarrier {
    fn default() -> Self {
        AltingBarrier::new()
    }
}

fn notify_peers(inner: &BaseInner, firer_id: usize) {
    for fe in &inner.front_ends {
        if fe.id == firer_id {
            continue;
        }
        fe.fired.store(true, Ordering::Release);
        if let Some((handle, index)) = fe.alt.lock().unwrap().take() {
            handle.schedule(index);
        }
    }
}

fn remove_front_end(base: &Arc<Base>, front_end: &Arc<FrontEndState>) -> Result<()> {
    let mut inner = base.inner.lock().unwrap();
    let pos = inner
        .front_ends
        .iter()
        .position(|fe| Arc::ptr_eq(fe, front_end));
    let pos = match pos {
        Some(p) => p,
        None => {
            return Err(Error::InvariantViolation(InvariantViolation::UnknownFrontEnd));
        }
    };
    inner.front_ends.remove(pos);
    let was_enrolled = *front_end.enrolled.lock().unwrap();
    if was_enrolled {
        inner.enrolled -= 1;
        inner.countdown -= 1;
        if inner.countdown == 0 {
            inner.countdown = inner.enrolled;
            notify_peers(&inner, front_end.id);
        }
    }
    Ok(())
}

impl Guard for AltingBarrier {
    fn enable(&self, handle: &AltHandle, index: usize) -> Result<bool> {
        self.check_owner()?;
        let mut inner = self.base.inner.lock().unwrap();
        if !*self.front_end.enrolled.lock().unwrap() {
            return Err(Error::OwnershipViolation(OwnershipViolation::NotOwner));
        }
        if self.front_end.alt.lock().unwrap().is_some() {
            // Defensive: this front-end is already enabled on some alt.
            return Ok(false);
        }
        inner.countdown -= 1;
        if inner.countdown == 0 {
            inner.countdown = inner.enrolled;
            notify_peers(&inner, self.front_end.id);
            self.front_end.self_fired.store(true, Ordering::Release);
            return Ok(true);
        }
        *self.front_end.alt.lock().unwrap() = Some((handle.clone(), index));
        Ok(false)
    }

    fn disable(&self, _handle: &AltHandle, _index: usize) -> Result<bool> {
        let had_listener = self.front_end.alt.lock().unwrap().take().is_some();
        let peer_fired = self.front_end.fired.swap(false, Ordering::AcqRel);
        let self_fired = self.front_end.self_fired.swap(false, Ordering::AcqRel);
        if !had_listener && !peer_fired && !self_fired {
            return Ok(false);
        }
        if peer_fired || self_fired {
            return Ok(true);
        }
        // We had enabled (decremented countdown) but nothing fired: undo.
        let mut inner = self.base.inner.lock().unwrap();
        if inner.countdown >= inner.enrolled {
            return Err(Error::InvariantViolation(
                InvariantViolation::CountdownOutOfRange,
            ));
        }
        inner.countdown += 1;
        Ok(false)
    }

    fn coordinator(&self) -> Option<Arc<Coordinator>> {
        Some(Arc::clone(&self.base.coordinator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn three_front_ends_fire_together_via_sync() {
        let mut fronts = AltingBarrier::create(3);
        let leader = fronts.remove(0);
        let handles: Vec<_> = fronts
            .into_iter()
            .map(|fe| {
                thread::spawn(move || {
                    fe.mark().unwrap();
                    fe.sync().unwrap();
                })
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        for h in &handles {
            assert!(!h.is_finished());
        }
        leader.mark().unwrap();
        leader.sync().unwrap();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn pri_select_with_skip_never_picks_the_barrier() {
        let front = AltingBarrier::new();
        front.mark().unwrap();
        let mut alt = Alt::new(vec![Box::new(crate::alt::Skip), Box::new(front)]);
        // Skip at index 0 always wins under priority selection.
        assert_eq!(alt.pri_select().unwrap(), 0);
    }
}
