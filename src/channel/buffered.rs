//! Mutex-guarded channel backed by a [`super::data_store::ChannelDataStore`]
//! (spec.md §4.2). Unlike the synchronous transports, a writer only blocks
//! when the store reports `Full` (and only for the bounded policy — the
//! other four policies never report `Full` to a writer that would block,
//! they drop/evict/grow instead). The reader side is alt-able exactly like
//! the unbuffered transports, just gated on store occupancy instead of a
//! single in-flight slot.

use std::sync::{Condvar, Mutex};

use crate::alt::AltHandle;
use crate::error::{Error, ProtocolViolation, Result};

use super::data_store::{ChannelDataStore, StoreState};
use super::{Channel, Transport};

struct Inner<T> {
    store: Box<dyn ChannelDataStore<T>>,
    poison: u32,
    alt: Option<(AltHandle, usize)>,
    reading: bool,
}

pub(crate) struct BufferedTransport<T> {
    inner: Mutex<Inner<T>>,
    not_full: Condvar,
}

impl<T: Send> BufferedTransport<T> {
    fn new(store: Box<dyn ChannelDataStore<T>>) -> Self {
        BufferedTransport {
            inner: Mutex::new(Inner {
                store,
                poison: 0,
                alt: None,
                reading: false,
            }),
            not_full: Condvar::new(),
        }
    }
}

/// Creates a buffered channel backed by `store`. The reader side is
/// alt-able regardless of which policy `store` implements.
pub fn channel<T: Send + 'static>(store: Box<dyn ChannelDataStore<T>>) -> Channel<T> {
    Channel::from_transport(std::sync::Arc::new(BufferedTransport::new(store)))
}

impl<T: Send + 'static> Transport<T> for BufferedTransport<T> {
    fn write(&self, v: T) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.poison > 0 {
                return Err(Error::Poisoned(inner.poison));
            }
            // An extended read in progress reserves the slot it just freed,
            // same as the unbuffered transport keeps `held` true until
            // `end_read` — a writer must not race ahead of the reader that
            // has not finished acting on the value it took.
            if inner.store.state() != StoreState::Full && !inner.reading {
                break;
            }
            inner = self.not_full.wait(inner).unwrap();
        }
        inner.store.put(v);
        let scheduled = inner.alt.take();
        drop(inner);
        if let Some((handle, index)) = scheduled {
            handle.schedule(index);
        }
        Ok(())
    }

    fn read(&self) -> Result<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.poison > 0 {
                return Err(Error::Poisoned(inner.poison));
            }
            if inner.store.state() != StoreState::Empty {
                break;
            }
            inner = self.not_full.wait(inner).unwrap();
        }
        let v = inner.store.get();
        drop(inner);
        self.not_full.notify_all();
        Ok(v)
    }

    fn start_read(&self) -> Result<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.poison > 0 {
                return Err(Error::Poisoned(inner.poison));
            }
            if inner.store.state() != StoreState::Empty {
                break;
            }
            inner = self.not_full.wait(inner).unwrap();
        }
        if inner.reading {
            return Err(Error::ProtocolViolation(
                ProtocolViolation::ReadAlreadyExtended,
            ));
        }
        let v = inner.store.get();
        inner.reading = true;
        // Deliberately no `not_full.notify_all()` here: a writer parked on a
        // full store must stay parked until `end_read` releases it, exactly
        // like the unbuffered transport keeps its writer parked across an
        // extended read.
        Ok(v)
    }

    fn end_read(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.reading {
            return Err(Error::ProtocolViolation(ProtocolViolation::EndReadNotStarted));
        }
        inner.reading = false;
        drop(inner);
        self.not_full.notify_all();
        Ok(())
    }

    fn pending(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.poison > 0 || inner.store.state() != StoreState::Empty
    }

    fn poison(&self, strength: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.poison = inner.poison.max(strength.max(1));
        let alt = inner.alt.take();
        drop(inner);
        if let Some((handle, index)) = alt {
            handle.schedule(index);
        }
        self.not_full.notify_all();
    }

    fn guard_enable(&self, handle: &AltHandle, index: usize) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.poison > 0 || inner.store.state() != StoreState::Empty {
            return Ok(true);
        }
        inner.alt = Some((handle.clone(), index));
        Ok(false)
    }

    fn guard_disable(&self, _handle: &AltHandle, _index: usize) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.alt = None;
        Ok(inner.poison > 0 || inner.store.state() != StoreState::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::data_store::{Bounded, OverwriteOldest};
    use std::thread;

    #[test]
    fn bounded_blocks_writer_at_capacity() {
        let chan = channel::<i32>(Box::new(Bounded::new(1)));
        let reader = chan.r#in();
        let writer = chan.out();
        writer.write(1).unwrap();

        let w2 = chan.out();
        let h = thread::spawn(move || w2.write(2).unwrap());
        thread::sleep(std::time::Duration::from_millis(50));
        assert!(!h.is_finished());

        assert_eq!(reader.read().unwrap(), 1);
        h.join().unwrap();
        assert_eq!(reader.read().unwrap(), 2);
    }

    #[test]
    fn extended_read_blocks_second_writer_until_end_read() {
        let chan = channel::<i32>(Box::new(Bounded::new(1)));
        let reader = chan.r#in();
        let writer1 = chan.out();
        let writer2 = chan.out();

        writer1.write(1).unwrap();
        let v = reader.start_read().unwrap();
        assert_eq!(v, 1);

        // A second writer must block until end_read releases the first.
        let h2 = thread::spawn(move || writer2.write(2).unwrap());
        thread::sleep(std::time::Duration::from_millis(50));
        assert!(!h2.is_finished());

        reader.end_read().unwrap();
        h2.join().unwrap();
        assert_eq!(reader.read().unwrap(), 2);
    }

    #[test]
    fn overwrite_oldest_evicts_front_value() {
        let chan = channel::<i32>(Box::new(OverwriteOldest::new(2)));
        let writer = chan.out();
        let reader = chan.r#in();
        writer.write(1).unwrap();
        writer.write(2).unwrap();
        writer.write(3).unwrap();
        assert_eq!(reader.read().unwrap(), 2);
        assert_eq!(reader.read().unwrap(), 3);
    }
}
