//! Multiway rendezvous of N enrolled participants (spec.md §4.6), with
//! dynamic `enroll`/`resign`/`reset`. Two variants sharing one contract:
//! [`blocking::Barrier`] (mutex + condvar) and [`busy::Barrier`] (parking on
//! an atomic iteration counter).
//!
//! Grounded in the original `csp::barrier`/`fiber_barrier` pair
//! (`original_source/csp/barrier.h`): `_enrolled`/`_count_down` under one
//! lock, last arrival resets the countdown and wakes everyone else.

pub mod blocking;
pub mod busy;

pub use blocking::Barrier;
