//! The spin-synchronized unbuffered channel (spec.md §4.3).
//!
//! Three atomic booleans (`writing`, `reading`, `alting`) and one atomic
//! value cell implement the same external contract as
//! [`super::blocking`], without ever parking a thread on a condition
//! variable. Valid only under [`crate::sync::Preemptive`] scheduling — a
//! cooperative task that spins would starve every sibling task sharing its
//! worker thread (spec.md §5).
//!
//! Memory ordering follows spec.md §4.3 exactly: every store a peer spins
//! on is `Release`, every load that gates forward progress is `Acquire`.
//! `cache-padded` keeps the independent atomics on their own cache lines so
//! the writer and reader sides don't ping-pong a shared line under
//! contention (the same dependency and concern as the teacher crate's
//! `Rendezvous`, which pads its own atomic counters the same way).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use cache_padded::CachePadded;

use crate::alt::AltHandle;
use crate::error::{Error, ProtocolViolation, Result};
use crate::sync::SpinBackoff;

use super::{Channel, Transport};

struct Cell<T>(std::cell::UnsafeCell<Option<T>>);
// SAFETY: access to the cell is gated by the `writing`/`reading` handshake
// below, which guarantees exactly one side touches it at a time.
unsafe impl<T: Send> Send for Cell<T> {}
unsafe impl<T: Send> Sync for Cell<T> {}

pub(crate) struct BusyTransport<T> {
    writing: CachePadded<AtomicBool>,
    reading: CachePadded<AtomicBool>,
    alting: CachePadded<AtomicBool>,
    poison: CachePadded<AtomicU32>,
    extended: CachePadded<AtomicBool>,
    hold: Cell<T>,
    alt: Mutex<Option<(AltHandle, usize)>>,
}

impl<T: Send> BusyTransport<T> {
    fn new() -> Self {
        BusyTransport {
            writing: CachePadded::new(AtomicBool::new(false)),
            reading: CachePadded::new(AtomicBool::new(false)),
            alting: CachePadded::new(AtomicBool::new(false)),
            poison: CachePadded::new(AtomicU32::new(0)),
            extended: CachePadded::new(AtomicBool::new(false)),
            hold: Cell(std::cell::UnsafeCell::new(None)),
            alt: Mutex::new(None),
        }
    }

    fn poisoned(&self) -> u32 {
        self.poison.load(Ordering::Acquire)
    }
}

/// Creates a synchronous, unbuffered, busy-spinning channel. Only sound to
/// use under preemptive scheduling (spec.md §5).
pub fn channel<T: Send + 'static>() -> Channel<T> {
    Channel::from_transport(std::sync::Arc::new(BusyTransport::new()))
}

impl<T: Send + 'static> Transport<T> for BusyTransport<T> {
    fn write(&self, v: T) -> Result<()> {
        let mut spin = SpinBackoff::new();
        while self.writing.load(Ordering::Acquire) {
            let p = self.poisoned();
            if p > 0 {
                return Err(Error::Poisoned(p));
            }
            spin.spin();
        }
        // SAFETY: `writing` is false, so no reader can be mid-handshake on
        // this slot; we are the only writer permitted to touch `hold`.
        unsafe { *self.hold.0.get() = Some(v) };
        self.writing.store(true, Ordering::Release);

        let scheduled = {
            let mut alt = self.alt.lock().unwrap();
            if self.alting.load(Ordering::Acquire) {
                alt.take()
            } else {
                None
            }
        };
        if let Some((handle, index)) = scheduled {
            handle.schedule(index);
        }

        let mut spin = SpinBackoff::new();
        while !self.reading.load(Ordering::Acquire) {
            let p = self.poisoned();
            if p > 0 {
                self.writing.store(false, Ordering::Release);
                return Err(Error::Poisoned(p));
            }
            spin.spin();
        }
        self.writing.store(false, Ordering::Release);
        let mut spin = SpinBackoff::new();
        while self.reading.load(Ordering::Acquire) {
            spin.spin();
        }
        Ok(())
    }

    fn read(&self) -> Result<T> {
        let v = self.start_read()?;
        self.end_read()?;
        Ok(v)
    }

    fn start_read(&self) -> Result<T> {
        if self.extended.swap(true, Ordering::AcqRel) {
            self.extended.store(false, Ordering::Release);
            return Err(Error::ProtocolViolation(
                ProtocolViolation::ReadAlreadyExtended,
            ));
        }
        let mut spin = SpinBackoff::new();
        while !self.writing.load(Ordering::Acquire) {
            let p = self.poisoned();
            if p > 0 {
                self.extended.store(false, Ordering::Release);
                return Err(Error::Poisoned(p));
            }
            spin.spin();
        }
        // SAFETY: `writing` observed true means the writer has deposited a
        // value and will not touch `hold` again until we clear `reading`.
        let v = unsafe { (*self.hold.0.get()).take() }.expect("writing set without a value");
        self.reading.store(true, Ordering::Release);
        Ok(v)
    }

    fn end_read(&self) -> Result<()> {
        if !self.extended.swap(false, Ordering::AcqRel) {
            return Err(Error::ProtocolViolation(ProtocolViolation::EndReadNotStarted));
        }
        let mut spin = SpinBackoff::new();
        while self.writing.load(Ordering::Acquire) {
            spin.spin();
        }
        self.reading.store(false, Ordering::Release);
        Ok(())
    }

    fn pending(&self) -> bool {
        self.poisoned() > 0 || self.writing.load(Ordering::Acquire)
    }

    fn poison(&self, strength: u32) {
        let strength = strength.max(1);
        self.poison.fetch_max(strength, Ordering::AcqRel);
        let alt = self.alt.lock().unwrap().take();
        if let Some((handle, index)) = alt {
            handle.schedule(index);
        }
    }

    fn guard_enable(&self, handle: &AltHandle, index: usize) -> Result<bool> {
        // Publish `alting` before reading `writing`: either the writer
        // observes `alting` and schedules us, or we observe its write and
        // return ready synchronously (spec.md §4.3's combined ordering).
        self.alting.store(true, Ordering::Release);
        let mut alt = self.alt.lock().unwrap();
        if self.poisoned() > 0 || self.writing.load(Ordering::Acquire) {
            self.alting.store(false, Ordering::Release);
            return Ok(true);
        }
        *alt = Some((handle.clone(), index));
        Ok(false)
    }

    fn guard_disable(&self, _handle: &AltHandle, _index: usize) -> Result<bool> {
        let mut alt = self.alt.lock().unwrap();
        *alt = None;
        self.alting.store(false, Ordering::Release);
        Ok(self.poisoned() > 0 || self.writing.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn rendezvous_round_trip() {
        let chan = channel::<i32>();
        let reader = chan.r#in();
        let writer = chan.out();
        let h = thread::spawn(move || writer.write(7).unwrap());
        assert_eq!(reader.read().unwrap(), 7);
        h.join().unwrap();
    }

    #[test]
    fn extended_read_blocks_second_writer_until_end_read() {
        let chan = channel::<i32>();
        let reader = chan.r#in();
        let writer1 = chan.out();
        let writer2 = chan.out();

        let h1 = thread::spawn(move || writer1.write(1).unwrap());
        let v = reader.start_read().unwrap();
        assert_eq!(v, 1);

        let h2 = thread::spawn(move || writer2.write(2).unwrap());
        thread::sleep(std::time::Duration::from_millis(50));
        assert!(!h2.is_finished());

        reader.end_read().unwrap();
        h1.join().unwrap();
        assert_eq!(reader.read().unwrap(), 2);
        h2.join().unwrap();
    }

    #[test]
    fn poison_fails_future_operations() {
        let chan = channel::<i32>();
        let reader = chan.r#in();
        let writer = chan.out();
        writer.poison(2);
        assert_eq!(writer.write(1), Err(Error::Poisoned(2)));
        assert_eq!(reader.read(), Err(Error::Poisoned(2)));
    }
}
