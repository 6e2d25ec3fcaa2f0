//! The concurrency substrate: the only layer that knows whether a process
//! runs on its own OS thread or as a lightweight task multiplexed onto a
//! small pool of them.
//!
//! Every other module in this crate (channel, barrier, alt, parallel) parks
//! on plain [`std::sync::Mutex`] / [`std::sync::Condvar`], unconditionally,
//! regardless of which [`Scheduler`] spawned the calling process. That is
//! correct in the narrow sense that a `Mutex`/`Condvar` wait is sound no
//! matter which thread blocks on it — but it means [`Cooperative`] does
//! *not* give a parked primitive a non-blocking suspension point the way a
//! true fiber/stackful-coroutine substrate would: a process parked in
//! `channel.read`/`write`, `barrier.sync`, `alt.select`, or
//! `alting_barrier.sync` occupies its worker thread for as long as it
//! blocks. [`Scheduler::yield_now`] exists for a cooperative caller to
//! voluntarily hand off the CPU between suspension points, but none of the
//! primitives above call it — they have no scheduler handle to call it on.
//! `Cooperative`'s actual contribution is bounding the OS thread count, not
//! non-blocking suspension; see [`Cooperative`]'s own docs for the
//! consequence (`Cooperative::new(n)` needs `n` at least as large as the
//! number of processes that must run concurrently for any one of them to
//! unblock, or the pool can deadlock).
//!
//! A third "busy" flavour of channel and barrier exists (synchronizing
//! through bare atomics rather than a mutex+condvar) and is valid only
//! under [`Preemptive`], per the module docs on [`crate::channel::busy`]
//! and [`crate::barrier::busy`]. [`crate::channel::busy`] spins on its
//! atomics directly; [`crate::barrier::busy`] parks on one via
//! `atomic_wait`, same as [`SpinBackoff`] does after its own short spin.

pub mod cooperative;
pub mod preemptive;

use std::time::Duration;

/// A handle to a task spawned through a [`Scheduler`]. Joining blocks the
/// calling task until the spawned one has run to completion.
pub trait JoinHandle: Send {
    fn join(self: Box<Self>);
}

/// Chooses how processes are scheduled onto the underlying machine.
///
/// [`Preemptive`] gives each process its own kernel thread. [`Cooperative`]
/// multiplexes processes as lightweight tasks over a small, fixed pool of
/// worker threads, each of which runs one task to completion before picking
/// up the next, yielding at suspension points so sibling tasks interleave.
pub trait Scheduler: Send + Sync + 'static {
    /// Starts `f` as a new process under this scheduler.
    fn spawn(&self, f: Box<dyn FnOnce() + Send>) -> Box<dyn JoinHandle>;

    /// Gives up the CPU momentarily so another runnable task/thread can make
    /// progress. Available for cooperative callers to use between the
    /// suspension points named in spec §5 (`channel.read`, `channel.write`,
    /// `barrier.sync`, `alt.select`, `alting_barrier.sync`, `timer.sleep`);
    /// none of those primitives hold a `Scheduler` handle to call it
    /// themselves, so it is not wired into them automatically — see this
    /// module's top-level docs.
    fn yield_now(&self);
}

pub use cooperative::Cooperative;
pub use preemptive::Preemptive;

/// Backoff helper shared by the busy (spinning) primitives: spins briefly,
/// then falls back to `std::thread::yield_now` so a preemptive scheduler
/// still makes progress under contention instead of burning a full core
/// indefinitely.
pub(crate) struct SpinBackoff {
    spins: u32,
}

impl SpinBackoff {
    pub(crate) fn new() -> Self {
        SpinBackoff { spins: 0 }
    }

    pub(crate) fn spin(&mut self) {
        if self.spins < 32 {
            self.spins += 1;
            std::hint::spin_loop();
        } else {
            std::thread::yield_now();
        }
    }
}

/// Small convenience for computing `wait_timeout` budgets from an absolute
/// deadline without ever passing a negative duration to the OS.
pub(crate) fn remaining(deadline: std::time::Instant) -> Duration {
    deadline.saturating_duration_since(std::time::Instant::now())
}
