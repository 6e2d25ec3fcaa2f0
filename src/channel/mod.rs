//! Typed channels: one writer-end, one reader-end, three interchangeable
//! transports (blocking, busy, buffered), and the end-kind wrappers
//! (exclusive / shared / alt-able) layered on top of all three uniformly.
//!
//! Per the "inheritance-heavy source → variants + capabilities" design
//! note (spec.md §9), a channel here is a product of a *transport* (this
//! module's [`blocking`], [`busy`], [`buffered`] submodules, each producing
//! an `Arc<dyn Transport<T>>`) and independent *end* wrappers
//! ([`ReaderEnd`]/[`WriterEnd`]/[`SharedReaderEnd`]/[`SharedWriterEnd`]/
//! [`GuardedReaderEnd`]) that do not care which transport backs them.

pub mod blocking;
pub mod buffered;
pub mod busy;
pub mod data_store;

use std::sync::{Arc, Mutex};

use crate::alt::{AltHandle, Guard};
use crate::error::Result;

/// The operations every channel transport must provide. Private to the
/// crate: application code only ever sees the end wrappers below.
pub(crate) trait Transport<T>: Send + Sync {
    fn write(&self, v: T) -> Result<()>;
    fn read(&self) -> Result<T>;
    fn start_read(&self) -> Result<T>;
    fn end_read(&self) -> Result<()>;
    /// A hint that a value is available. No commitment: by the time the
    /// caller acts on it, it may no longer hold.
    fn pending(&self) -> bool;
    fn poison(&self, strength: u32);
    /// The reader-side guard contract (spec.md §4.1's "Alt integration").
    fn guard_enable(&self, handle: &AltHandle, index: usize) -> Result<bool>;
    fn guard_disable(&self, handle: &AltHandle, index: usize) -> Result<bool>;
}

/// An end-to-end typed channel, holding both the writer and reader sides
/// together. Most code will split it into a [`WriterEnd`] and [`ReaderEnd`]
/// with [`Channel::r#in`] / [`Channel::out`] and hand one end to each
/// process; `read`/`write` are provided directly too for single-task use.
pub struct Channel<T> {
    transport: Arc<dyn Transport<T>>,
}

impl<T> Channel<T> {
    pub(crate) fn from_transport(transport: Arc<dyn Transport<T>>) -> Self {
        Channel { transport }
    }

    /// The reader end. Named `r#in` to mirror the CSP convention that a
    /// channel's input is where a process reads from — `in` is a reserved
    /// word in Rust, hence the raw identifier.
    pub fn r#in(&self) -> ReaderEnd<T> {
        ReaderEnd {
            inner: Arc::clone(&self.transport),
        }
    }

    /// The writer end.
    pub fn out(&self) -> WriterEnd<T> {
        WriterEnd {
            inner: Arc::clone(&self.transport),
        }
    }

    pub fn read(&self) -> Result<T> {
        self.transport.read()
    }

    pub fn write(&self, v: T) -> Result<()> {
        self.transport.write(v)
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Channel {
            transport: Arc::clone(&self.transport),
        }
    }
}

/// The reader side of a channel, usable from a single task by convention
/// (spec.md §5's shared-resource policy).
pub struct ReaderEnd<T> {
    inner: Arc<dyn Transport<T>>,
}

impl<T> ReaderEnd<T> {
    pub fn read(&self) -> Result<T> {
        self.inner.read()
    }

    /// Returns the value but leaves the writer parked until
    /// [`ReaderEnd::end_read`] is called, so the reader can act on the
    /// value before the writer is released.
    pub fn start_read(&self) -> Result<T> {
        self.inner.start_read()
    }

    pub fn end_read(&self) -> Result<()> {
        self.inner.end_read()
    }

    pub fn pending(&self) -> bool {
        self.inner.pending()
    }

    pub fn poison(&self, strength: u32) {
        self.inner.poison(strength)
    }

    /// Adds alt capability, at zero cost — every transport's reader side
    /// already implements the guard contract.
    pub fn guarded(self) -> GuardedReaderEnd<T> {
        GuardedReaderEnd { inner: self.inner }
    }

    /// Wraps this end so it can be called concurrently from multiple
    /// tasks, serialized by an end-level lock distinct from the channel's
    /// own state lock (spec.md §5).
    pub fn shared(self) -> SharedReaderEnd<T> {
        SharedReaderEnd {
            inner: self.inner,
            call_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// A [`ReaderEnd`] that also implements [`Guard`], so it can be used inside
/// an [`crate::alt::Alt`].
pub struct GuardedReaderEnd<T> {
    inner: Arc<dyn Transport<T>>,
}

impl<T> GuardedReaderEnd<T> {
    pub fn read(&self) -> Result<T> {
        self.inner.read()
    }

    pub fn start_read(&self) -> Result<T> {
        self.inner.start_read()
    }

    pub fn end_read(&self) -> Result<()> {
        self.inner.end_read()
    }

    pub fn pending(&self) -> bool {
        self.inner.pending()
    }

    pub fn poison(&self, strength: u32) {
        self.inner.poison(strength)
    }
}

impl<T> Clone for GuardedReaderEnd<T> {
    /// Cheap: clones the shared handle onto the same underlying channel, so
    /// a guard can be registered in an `Alt` while the original value is
    /// kept around to perform the read after selection (see [`crate::choice!`]).
    fn clone(&self) -> Self {
        GuardedReaderEnd {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Guard for GuardedReaderEnd<T> {
    fn enable(&self, handle: &AltHandle, index: usize) -> Result<bool> {
        self.inner.guard_enable(handle, index)
    }

    fn disable(&self, handle: &AltHandle, index: usize) -> Result<bool> {
        self.inner.guard_disable(handle, index)
    }
}

/// A [`ReaderEnd`] usable concurrently from multiple tasks.
pub struct SharedReaderEnd<T> {
    inner: Arc<dyn Transport<T>>,
    call_lock: Arc<Mutex<()>>,
}

impl<T> SharedReaderEnd<T> {
    pub fn read(&self) -> Result<T> {
        let _guard = self.call_lock.lock().unwrap();
        self.inner.read()
    }

    pub fn start_read(&self) -> Result<T> {
        let _guard = self.call_lock.lock().unwrap();
        self.inner.start_read()
    }

    pub fn end_read(&self) -> Result<()> {
        let _guard = self.call_lock.lock().unwrap();
        self.inner.end_read()
    }

    pub fn pending(&self) -> bool {
        self.inner.pending()
    }

    pub fn poison(&self, strength: u32) {
        self.inner.poison(strength)
    }
}

impl<T> Clone for SharedReaderEnd<T> {
    fn clone(&self) -> Self {
        SharedReaderEnd {
            inner: Arc::clone(&self.inner),
            call_lock: Arc::clone(&self.call_lock),
        }
    }
}

/// The writer side of a channel, usable from a single task by convention.
pub struct WriterEnd<T> {
    inner: Arc<dyn Transport<T>>,
}

impl<T> WriterEnd<T> {
    pub fn write(&self, v: T) -> Result<()> {
        self.inner.write(v)
    }

    pub fn poison(&self, strength: u32) {
        self.inner.poison(strength)
    }

    pub fn shared(self) -> SharedWriterEnd<T> {
        SharedWriterEnd {
            inner: self.inner,
            call_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// A [`WriterEnd`] usable concurrently from multiple tasks.
pub struct SharedWriterEnd<T> {
    inner: Arc<dyn Transport<T>>,
    call_lock: Arc<Mutex<()>>,
}

impl<T> SharedWriterEnd<T> {
    pub fn write(&self, v: T) -> Result<()> {
        let _guard = self.call_lock.lock().unwrap();
        self.inner.write(v)
    }

    pub fn poison(&self, strength: u32) {
        self.inner.poison(strength)
    }
}

impl<T> Clone for SharedWriterEnd<T> {
    fn clone(&self) -> Self {
        SharedWriterEnd {
            inner: Arc::clone(&self.inner),
            call_lock: Arc::clone(&self.call_lock),
        }
    }
}
