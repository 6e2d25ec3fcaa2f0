//! The mutex + condition-variable unbuffered channel (spec.md §4.1).
//!
//! Two logical states, EMPTY and HELD, live behind one mutex: HELD means a
//! writer has deposited a value and is parked waiting for the matching
//! reader to release it. `extended` distinguishes an in-progress extended
//! read (value already handed to the reader, writer still parked) from a
//! plain HELD slot nobody has touched yet.

use std::sync::{Condvar, Mutex};

use crate::alt::AltHandle;
use crate::error::{Error, ProtocolViolation, Result};

use super::{Channel, Transport};

struct Inner<T> {
    value: Option<T>,
    held: bool,
    extended: bool,
    poison: u32,
    alt: Option<(AltHandle, usize)>,
}

pub(crate) struct BlockingTransport<T> {
    inner: Mutex<Inner<T>>,
    cond: Condvar,
}

impl<T: Send> BlockingTransport<T> {
    fn new() -> Self {
        BlockingTransport {
            inner: Mutex::new(Inner {
                value: None,
                held: false,
                extended: false,
                poison: 0,
                alt: None,
            }),
            cond: Condvar::new(),
        }
    }
}

/// Creates a synchronous, unbuffered, blocking channel.
pub fn channel<T: Send + 'static>() -> Channel<T> {
    Channel::from_transport(std::sync::Arc::new(BlockingTransport::new()))
}

impl<T: Send + 'static> Transport<T> for BlockingTransport<T> {
    fn write(&self, v: T) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.poison > 0 {
                return Err(Error::Poisoned(inner.poison));
            }
            if !inner.held {
                break;
            }
            inner = self.cond.wait(inner).unwrap();
        }
        inner.value = Some(v);
        inner.held = true;
        let scheduled = inner.alt.take();
        drop(inner);
        match scheduled {
            Some((handle, index)) => handle.schedule(index),
            None => self.cond.notify_all(),
        }

        // Park until the reader releases us, i.e. until `end_read` (for an
        // extended read) or the taking `read` flips `held` back to false.
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.poison > 0 {
                return Err(Error::Poisoned(inner.poison));
            }
            if !inner.held {
                return Ok(());
            }
            inner = self.cond.wait(inner).unwrap();
        }
    }

    fn read(&self) -> Result<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.poison > 0 {
                return Err(Error::Poisoned(inner.poison));
            }
            if inner.held && inner.value.is_some() {
                break;
            }
            inner = self.cond.wait(inner).unwrap();
        }
        let v = inner.value.take().expect("held slot without a value");
        inner.held = false;
        drop(inner);
        self.cond.notify_all();
        Ok(v)
    }

    fn start_read(&self) -> Result<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.poison > 0 {
                return Err(Error::Poisoned(inner.poison));
            }
            if inner.held && inner.value.is_some() {
                break;
            }
            inner = self.cond.wait(inner).unwrap();
        }
        if inner.extended {
            return Err(Error::ProtocolViolation(
                ProtocolViolation::ReadAlreadyExtended,
            ));
        }
        let v = inner.value.take().expect("held slot without a value");
        inner.extended = true;
        Ok(v)
    }

    fn end_read(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.extended {
            return Err(Error::ProtocolViolation(ProtocolViolation::EndReadNotStarted));
        }
        inner.extended = false;
        inner.held = false;
        drop(inner);
        self.cond.notify_all();
        Ok(())
    }

    fn pending(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.poison > 0 || (inner.held && inner.value.is_some())
    }

    fn poison(&self, strength: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.poison = inner.poison.max(strength.max(1));
        let alt = inner.alt.take();
        drop(inner);
        if let Some((handle, index)) = alt {
            handle.schedule(index);
        }
        self.cond.notify_all();
    }

    fn guard_enable(&self, handle: &AltHandle, index: usize) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.poison > 0 || (inner.held && inner.value.is_some()) {
            return Ok(true);
        }
        inner.alt = Some((handle.clone(), index));
        Ok(false)
    }

    fn guard_disable(&self, _handle: &AltHandle, _index: usize) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.alt = None;
        Ok(inner.poison > 0 || (inner.held && inner.value.is_some()))
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
        let h = thread::spawn(move || writer.write(42).unwrap());
        assert_eq!(reader.read().unwrap(), 42);
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

        // A second writer must block until end_read releases the first.
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
        writer.poison(3);
        assert_eq!(writer.write(1), Err(Error::Poisoned(3)));
        assert_eq!(reader.read(), Err(Error::Poisoned(3)));
    }
}
