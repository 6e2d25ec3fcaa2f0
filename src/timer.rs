//! A thin wrapper over the platform clock that can also act as an alt
//! guard with a deadline.
//!
//! `now`/`sleep`/`sleep_until` themselves are out of scope per spec.md §1
//! ("timed sleeps and clock reads that are thin wrappers over the
//! platform clock") — they are exactly as thin as that Non-goal implies.
//! `Timer` earns a place in the core because, used as a guard inside an
//! [`crate::alt::Alt`], it is what lets a select bound an otherwise
//! unbounded wait (spec.md §4.4's "Cancellation / timeouts").

use std::time::{Duration, Instant};

use crate::alt::{AltHandle, Guard};
use crate::error::Result;

/// `now`/`sleep`/`sleep_until`, plus construction of a deadline guard for
/// use inside an `Alt`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Timer;

impl Timer {
    /// The current instant, per the platform's steady clock.
    pub fn now(&self) -> Instant {
        Instant::now()
    }

    /// Blocks the calling task for `duration`.
    pub fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    /// Blocks the calling task until `deadline`.
    pub fn sleep_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }

    /// Builds a guard that becomes ready once `deadline` has passed.
    pub fn guard(&self, deadline: Instant) -> TimerGuard {
        TimerGuard { deadline }
    }

    /// Builds a guard that becomes ready after `duration` has elapsed from
    /// the moment the owning `Alt` enables it.
    pub fn after(&self, duration: Duration) -> TimerGuard {
        TimerGuard {
            deadline: Instant::now() + duration,
        }
    }
}

/// A guard usable inside an [`crate::alt::Alt`] that becomes ready once its
/// deadline has elapsed.
#[derive(Clone, Copy)]
pub struct TimerGuard {
    deadline: Instant,
}

impl Guard for TimerGuard {
    fn enable(&self, handle: &AltHandle, index: usize) -> Result<bool> {
        if Instant::now() >= self.deadline {
            return Ok(true);
        }
        handle.set_timeout(self.deadline, index);
        Ok(false)
    }

    fn disable(&self, _handle: &AltHandle, _index: usize) -> Result<bool> {
        Ok(Instant::now() >= self.deadline)
    }
}
