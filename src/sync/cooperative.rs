//! Cooperative substrate: processes run as lightweight tasks multiplexed
//! onto a small, fixed pool of worker threads instead of one-thread-per-process.
//!
//! This crate targets stable, dependency-aligned Rust, so there is no
//! stackful fiber/coroutine switching here (that would need an `unsafe`
//! context-switch or a third-party stackful-coroutine crate the rest of the
//! pack does not otherwise pull in). Instead, a fixed pool of worker threads
//! pulls closures off a shared run queue and runs each to completion;
//! [`Cooperative::yield_now`] calls [`std::thread::yield_now`], available
//! for a process to call between the suspension points named in spec §5 if
//! it wants to hand its worker to a queued sibling early. It is not called
//! by `channel`/`barrier`/`alt` themselves: genuine OS blocking (a channel
//! parked on a condvar, say) still suspends the underlying worker thread for
//! as long as it blocks, same as it would for [`super::Preemptive`] — the
//! difference this substrate buys is bounded thread count, not non-blocking
//! suspension. A worker pool sized smaller than the number of processes
//! that must run concurrently for one of them to unblock the others can
//! deadlock (see `sync/mod.rs`'s module docs).

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use super::{JoinHandle, Scheduler};

type Task = Box<dyn FnOnce() + Send>;

struct Queue {
    tasks: Mutex<VecDeque<Task>>,
    cond: Condvar,
    shutdown: Mutex<bool>,
}

/// A cooperative scheduler backed by `worker_count` OS threads that drain a
/// shared run queue. Processes spawned onto it are lightweight in the sense
/// that there can be far more of them than worker threads; they are not
/// lightweight in the stackful-coroutine sense.
pub struct Cooperative {
    queue: Arc<Queue>,
    _workers: Vec<std::thread::JoinHandle<()>>,
}

impl Cooperative {
    /// Creates a pool with `worker_count` worker threads (minimum 1).
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let queue = Arc::new(Queue {
            tasks: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
            shutdown: Mutex::new(false),
        });
        let workers = (0..worker_count)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || worker_loop(queue))
            })
            .collect();
        Cooperative {
            queue,
            _workers: workers,
        }
    }
}

impl Default for Cooperative {
    /// One worker per available core, matching how a cooperative runtime
    /// would size its carrier threads by default.
    fn default() -> Self {
        Cooperative::new(std::thread::available_parallelism().map_or(1, |n| n.get()))
    }
}

fn worker_loop(queue: Arc<Queue>) {
    loop {
        let task = {
            let mut tasks = queue.tasks.lock().unwrap();
            loop {
                if let Some(task) = tasks.pop_front() {
                    break Some(task);
                }
                if *queue.shutdown.lock().unwrap() {
                    break None;
                }
                tasks = queue.cond.wait(tasks).unwrap();
            }
        };
        match task {
            Some(task) => task(),
            None => return,
        }
        // Give sibling tasks queued behind this one a chance before this
        // worker immediately grabs the next item off the queue again.
        std::thread::yield_now();
    }
}

impl Drop for Cooperative {
    fn drop(&mut self) {
        *self.queue.shutdown.lock().unwrap() = true;
        self.queue.cond.notify_all();
        for w in self._workers.drain(..) {
            let _ = w.join();
        }
    }
}

struct Completion {
    done: Mutex<bool>,
    cond: Condvar,
}

struct CooperativeHandle(Arc<Completion>);

impl JoinHandle for CooperativeHandle {
    fn join(self: Box<Self>) {
        let mut done = self.0.done.lock().unwrap();
        while !*done {
            done = self.0.cond.wait(done).unwrap();
        }
    }
}

impl Scheduler for Cooperative {
    fn spawn(&self, f: Box<dyn FnOnce() + Send>) -> Box<dyn JoinHandle> {
        let completion = Arc::new(Completion {
            done: Mutex::new(false),
            cond: Condvar::new(),
        });
        let completion_for_task = Arc::clone(&completion);
        let task: Task = Box::new(move || {
            f();
            *completion_for_task.done.lock().unwrap() = true;
            completion_for_task.cond.notify_all();
        });
        self.queue.tasks.lock().unwrap().push_back(task);
        self.queue.cond.notify_one();
        Box::new(CooperativeHandle(completion))
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }
}
