#![warn(clippy::undocumented_unsafe_blocks)]

//! A user-space CSP (Communicating Sequential Processes) synchronization
//! kernel: typed channels carrying synchronous, busy-spin, or buffered
//! rendezvous; multiway barriers, including a variant that is itself
//! selectable inside an alternation; and the alternation (`select`)
//! machinery that picks fairly or by priority among many ready guards.
//!
//! This crate is the core only — the hard, load-bearing synchronization
//! primitives every higher-level CSP network is built from. It does not
//! ship leaf processes (`delta`, `plex`, `merge`, …), demo programs, or a
//! network transport; see each module's docs for what it covers and why.
//!
//! # Layout
//!
//! - [`sync`] — the concurrency substrate: [`sync::Preemptive`] (one OS
//!   thread per process) and [`sync::Cooperative`] (a small pool of
//!   worker threads multiplexing many processes), behind one
//!   [`sync::Scheduler`] trait.
//! - [`channel`] — [`channel::blocking`] (mutex + condvar, unbuffered),
//!   [`channel::busy`] (spinning atomics, unbuffered, preemptive-only),
//!   and [`channel::buffered`] (one of five [`channel::data_store`]
//!   policies).
//! - [`alt`] — external choice (`select`) over channel reads, timeouts,
//!   alting-barrier events, and the trivial [`alt::Skip`]/[`alt::Stop`]
//!   guards.
//! - [`barrier`] — the plain multiway barrier, blocking and busy variants.
//! - [`alting_barrier`] — a barrier whose event is itself an [`alt::Guard`].
//! - [`parallel`] — runs a fixed set of processes concurrently, reusing a
//!   worker pool across repeated runs, plus `par_for`/`par_for_n`/
//!   `par_read`/`par_write`.
//! - [`timer`] — `now`/`sleep`/`sleep_until`, and a guard with a deadline.
//! - [`choice!`] — binds `{guard => action}` arms to a select.
//! - [`error`] — the shared [`error::Error`] taxonomy every primitive above
//!   returns.
//!
//! # Example
//!
//! ```
//! use csp_core::channel::blocking;
//! use std::thread;
//!
//! let chan = blocking::channel::<i32>();
//! let reader = chan.r#in();
//! let writer = chan.out();
//!
//! let sender = thread::spawn(move || writer.write(42).unwrap());
//! assert_eq!(reader.read().unwrap(), 42);
//! sender.join().unwrap();
//! ```

pub mod alt;
pub mod alting_barrier;
pub mod barrier;
pub mod channel;
pub mod choice;
pub mod error;
pub mod parallel;
pub mod sync;
pub mod timer;

pub use error::{Error, Result};
