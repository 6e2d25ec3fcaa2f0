//! Storage policies backing a [`super::buffered`] channel.
//!
//! spec.md §3 defines three observable states (`EMPTY`, `NONEMPTY_NONFULL`,
//! `FULL`) and §4.2 names the five policies. Each policy is a plain
//! `VecDeque`-backed struct; the buffered channel wraps one behind its own
//! mutex, so these types need no internal synchronization of their own.

use std::collections::VecDeque;

/// The occupancy state a data store reports to its owning channel, so the
/// channel can decide whether a writer/reader should block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Empty,
    NonEmptyNonFull,
    Full,
}

/// A bounded or unbounded store of values of type `T`, used by
/// [`super::buffered::Channel`].
pub trait ChannelDataStore<T>: Send {
    /// Adds `v`. Policies that never reject (infinite, overwrite-*) always
    /// succeed; `put` never blocks — backpressure is the buffered channel's
    /// job, based on [`ChannelDataStore::state`].
    fn put(&mut self, v: T);

    /// Removes and returns the next value. Panics if the store is empty;
    /// callers only call this after confirming `state() != Empty`.
    fn get(&mut self) -> T;

    /// Returns a clone of the next value without removing it.
    fn peek(&self) -> T
    where
        T: Clone;

    /// Drops every stored value.
    fn clear(&mut self);

    /// The store's current occupancy.
    fn state(&self) -> StoreState;

    /// Number of values currently stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn state_of(len: usize, capacity: Option<usize>) -> StoreState {
    if len == 0 {
        StoreState::Empty
    } else if capacity == Some(len) {
        StoreState::Full
    } else {
        StoreState::NonEmptyNonFull
    }
}

/// FIFO store that blocks writers once `capacity` elements are queued. The
/// blocking itself lives in the owning channel; this type only refuses to
/// silently grow past capacity by asserting in `put` (the channel must
/// check `state()` before calling `put`).
pub struct Bounded<T> {
    queue: VecDeque<T>,
    capacity: usize,
}

impl<T> Bounded<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "a bounded store needs capacity > 0");
        Bounded {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Send> ChannelDataStore<T> for Bounded<T> {
    fn put(&mut self, v: T) {
        assert!(
            self.queue.len() < self.capacity,
            "put on a full bounded store; caller must gate on state()"
        );
        self.queue.push_back(v);
    }

    fn get(&mut self) -> T {
        self.queue.pop_front().expect("get on an empty store")
    }

    fn peek(&self) -> T
    where
        T: Clone,
    {
        self.queue.front().cloned().expect("peek on an empty store")
    }

    fn clear(&mut self) {
        self.queue.clear();
    }

    fn state(&self) -> StoreState {
        state_of(self.queue.len(), Some(self.capacity))
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

/// FIFO store with no capacity limit. Never reports `Full`.
pub struct Infinite<T> {
    queue: VecDeque<T>,
}

impl<T> Infinite<T> {
    pub fn new() -> Self {
        Infinite {
            queue: VecDeque::new(),
        }
    }
}

impl<T> Default for Infinite<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> ChannelDataStore<T> for Infinite<T> {
    fn put(&mut self, v: T) {
        self.queue.push_back(v);
    }

    fn get(&mut self) -> T {
        self.queue.pop_front().expect("get on an empty store")
    }

    fn peek(&self) -> T
    where
        T: Clone,
    {
        self.queue.front().cloned().expect("peek on an empty store")
    }

    fn clear(&mut self) {
        self.queue.clear();
    }

    fn state(&self) -> StoreState {
        state_of(self.queue.len(), None)
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

/// FIFO store of fixed capacity that silently drops the incoming value
/// when full, instead of blocking the writer.
pub struct Overflowing<T> {
    queue: VecDeque<T>,
    capacity: usize,
}

impl<T> Overflowing<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "an overflowing store needs capacity > 0");
        Overflowing {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
}

impl<T: Send> ChannelDataStore<T> for Overflowing<T> {
    fn put(&mut self, v: T) {
        if self.queue.len() < self.capacity {
            self.queue.push_back(v);
        }
        // Full: drop `v`. No backpressure, no blocking — by design.
    }

    fn get(&mut self) -> T {
        self.queue.pop_front().expect("get on an empty store")
    }

    fn peek(&self) -> T
    where
        T: Clone,
    {
        self.queue.front().cloned().expect("peek on an empty store")
    }

    fn clear(&mut self) {
        self.queue.clear();
    }

    fn state(&self) -> StoreState {
        state_of(self.queue.len(), Some(self.capacity))
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

/// FIFO store of fixed capacity that evicts the oldest (front) value to
/// make room for a new one once full.
pub struct OverwriteOldest<T> {
    queue: VecDeque<T>,
    capacity: usize,
}

impl<T> OverwriteOldest<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "an overwrite-oldest store needs capacity > 0");
        OverwriteOldest {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
}

impl<T: Send> ChannelDataStore<T> for OverwriteOldest<T> {
    fn put(&mut self, v: T) {
        if self.queue.len() == self.capacity {
            self.queue.pop_front();
        }
        self.queue.push_back(v);
    }

    fn get(&mut self) -> T {
        self.queue.pop_front().expect("get on an empty store")
    }

    fn peek(&self) -> T
    where
        T: Clone,
    {
        self.queue.front().cloned().expect("peek on an empty store")
    }

    fn clear(&mut self) {
        self.queue.clear();
    }

    fn state(&self) -> StoreState {
        state_of(self.queue.len(), Some(self.capacity))
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

/// FIFO store of fixed capacity that evicts the newest (back) value it
/// just accepted, replacing it with the incoming one, once full.
pub struct OverwritingNewest<T> {
    queue: VecDeque<T>,
    capacity: usize,
}

impl<T> OverwritingNewest<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity > 0,
            "an overwriting-newest store needs capacity > 0"
        );
        OverwritingNewest {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
}

impl<T: Send> ChannelDataStore<T> for OverwritingNewest<T> {
    fn put(&mut self, v: T) {
        if self.queue.len() == self.capacity {
            self.queue.pop_back();
        }
        self.queue.push_back(v);
    }

    fn get(&mut self) -> T {
        self.queue.pop_front().expect("get on an empty store")
    }

    fn peek(&self) -> T
    where
        T: Clone,
    {
        self.queue.front().cloned().expect("peek on an empty store")
    }

    fn clear(&mut self) {
        self.queue.clear();
    }

    fn state(&self) -> StoreState {
        state_of(self.queue.len(), Some(self.capacity))
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}
