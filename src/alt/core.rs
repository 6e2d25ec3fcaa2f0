//! The shared wait state behind an [`super::Alt`]. Guards talk to this
//! through [`AltHandle`] — never to the `Alt` itself — so they can report
//! readiness from whatever thread notices the event.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

#[derive(Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
    Inactive,
    Enabling,
    Waiting,
    Ready,
}

pub(super) struct AltInner {
    phase: Phase,
    scheduled: Option<usize>,
    deadline: Option<Instant>,
    timer_index: Option<usize>,
}

impl AltInner {
    fn fresh() -> Self {
        AltInner {
            phase: Phase::Enabling,
            scheduled: None,
            deadline: None,
            timer_index: None,
        }
    }
}

pub(super) struct AltCore {
    inner: Mutex<AltInner>,
    cond: Condvar,
}

impl AltCore {
    pub(super) fn new() -> Self {
        AltCore {
            inner: Mutex::new(AltInner::fresh()),
            cond: Condvar::new(),
        }
    }

    /// Re-arms the core for a new `select()` call. Must be called under the
    /// `Alt`'s own owner check, before any guard is enabled, so a guard
    /// event left over from a previous call can never leak into this one.
    pub(super) fn reset(self: &Arc<Self>) {
        let mut inner = self.inner.lock().unwrap();
        *inner = AltInner::fresh();
    }

    pub(super) fn handle(self: &Arc<Self>) -> AltHandle {
        AltHandle(Arc::clone(self))
    }

    pub(super) fn finish(self: &Arc<Self>) {
        self.inner.lock().unwrap().phase = Phase::Inactive;
    }

    /// Blocks until a guard calls [`AltHandle::schedule`] or the earliest
    /// timeout guard's deadline elapses, whichever comes first. Returns the
    /// index that won.
    pub(super) fn wait_for_event(self: &Arc<Self>) -> usize {
        let mut inner = self.inner.lock().unwrap();
        if inner.phase != Phase::Enabling {
            // A guard's event already raced ahead of us while we still held
            // no lock between finishing ENABLE and taking this one.
            return inner
                .scheduled
                .expect("alt left ENABLING without recording a selection");
        }
        inner.phase = Phase::Waiting;
        loop {
            if let Some(selected) = inner.scheduled {
                return selected;
            }
            match inner.deadline {
                Some(deadline) => {
                    let timeout = crate::sync::remaining(deadline);
                    let (guard, result) = self
                        .cond
                        .wait_timeout_while(inner, timeout, |st| st.scheduled.is_none())
                        .unwrap();
                    inner = guard;
                    if result.timed_out() {
                        if let Some(selected) = inner.scheduled {
                            return selected;
                        }
                        return inner
                            .timer_index
                            .expect("deadline elapsed without a timer index recorded");
                    }
                }
                None => {
                    inner = self.cond.wait_while(inner, |st| st.scheduled.is_none()).unwrap();
                }
            }
        }
    }
}

/// A cheap, clonable reference a guard holds onto after `enable` returns
/// "not ready", so it can report readiness later from any thread.
#[derive(Clone)]
pub struct AltHandle(Arc<AltCore>);

impl AltHandle {
    /// Reports that the guard at `index` has become ready. Idempotent and
    /// safe to call spuriously or more than once.
    pub fn schedule(&self, index: usize) {
        let mut inner = self.0.inner.lock().unwrap();
        if matches!(inner.phase, Phase::Enabling | Phase::Waiting) {
            inner.scheduled = Some(index);
            inner.phase = Phase::Ready;
            drop(inner);
            self.0.cond.notify_one();
        }
    }

    /// Registers a candidate wake-up deadline for the timeout guard at
    /// `index`. Only the earliest deadline across all timer guards in this
    /// select call is kept.
    pub fn set_timeout(&self, deadline: Instant, index: usize) {
        let mut inner = self.0.inner.lock().unwrap();
        if inner.deadline.map_or(true, |current| deadline < current) {
            inner.deadline = Some(deadline);
            inner.timer_index = Some(index);
        }
    }
}
