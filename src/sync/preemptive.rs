//! Preemptive substrate: one kernel thread per process.

use super::{JoinHandle, Scheduler};

/// The default substrate. Each spawned process gets its own
/// [`std::thread`]; suspension points use the OS's real blocking
/// primitives via [`std::sync::Condvar`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Preemptive;

struct ThreadHandle(std::thread::JoinHandle<()>);

impl JoinHandle for ThreadHandle {
    fn join(self: Box<Self>) {
        // A panicking process should not be silently swallowed: propagate
        // it the way `std::thread::JoinHandle::join` would if the caller
        // `.unwrap()`-ed it themselves.
        let _ = self.0.join();
    }
}

impl Scheduler for Preemptive {
    fn spawn(&self, f: Box<dyn FnOnce() + Send>) -> Box<dyn JoinHandle> {
        Box::new(ThreadHandle(std::thread::spawn(f)))
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }
}
