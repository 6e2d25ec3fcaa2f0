//! Runs a fixed set of processes concurrently and returns when all have
//! finished (spec.md §4.7), reusing a pool of worker tasks across repeated
//! runs instead of spawning fresh threads every call.
//!
//! Grounded in `original_source/csp/par.h`'s `par`/`par_thread`: the last
//! process always runs inline on the calling task; the rest get one worker
//! each, looping `process.run(); barrier.sync(); park.sync();` between
//! rounds, where `park` is a private 2-party barrier used only to pause
//! and resume that one worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::barrier::blocking::Barrier;
use crate::channel::{ReaderEnd, WriterEnd};
use crate::error::{Error, Result};
use crate::sync::{JoinHandle, Preemptive, Scheduler};

/// Something a [`Parallel`] can run. Given a concrete bound because
/// `Parallel` needs one to be a usable library surface — concrete leaf
/// processes (`delta`, `plex`, …) are out of scope, but *some* trait for
/// "a thing with a `run`" is required to type `Parallel` at all.
pub trait Process: Send {
    fn run(&mut self);
}

impl<F: FnMut() + Send> Process for F {
    fn run(&mut self) {
        (self)()
    }
}

struct Shared {
    processes: Mutex<Vec<Box<dyn Process>>>,
}

struct WorkerHandle {
    running: Arc<AtomicBool>,
    park: Barrier,
    join: Option<Box<dyn JoinHandle>>,
}

impl WorkerHandle {
    fn terminate(mut self) {
        self.running.store(false, Ordering::Release);
        self.park.sync();
        if let Some(join) = self.join.take() {
            join.join();
        }
    }

    fn release(&self) {
        self.park.sync();
    }
}

/// Runs `processes[0..len-1]` on reused worker tasks and `processes[len-1]`
/// inline on whichever task calls [`Parallel::run`], returning once every
/// process has completed this round.
pub struct Parallel {
    shared: Arc<Shared>,
    workers: Mutex<Vec<WorkerHandle>>,
    barrier: Barrier,
    scheduler: Arc<dyn Scheduler>,
}

impl Parallel {
    /// Builds a parallel composition over `processes`, using the default
    /// (preemptive, one-thread-per-worker) scheduler.
    pub fn new(processes: Vec<Box<dyn Process>>) -> Self {
        Parallel::with_scheduler(processes, Arc::new(Preemptive))
    }

    /// Builds a parallel composition that spawns its worker tasks through
    /// `scheduler` instead of the default.
    pub fn with_scheduler(processes: Vec<Box<dyn Process>>, scheduler: Arc<dyn Scheduler>) -> Self {
        Parallel {
            shared: Arc::new(Shared {
                processes: Mutex::new(processes),
            }),
            workers: Mutex::new(Vec::new()),
            barrier: Barrier::new(0),
            scheduler,
        }
    }

    /// Replaces the set of processes run on the next [`Parallel::run`]
    /// call. If the count differs from the current worker pool, the pool
    /// is resized the next time `run` is called.
    pub fn set_processes(&self, processes: Vec<Box<dyn Process>>) {
        *self.shared.processes.lock().unwrap() = processes;
    }

    fn spawn_worker(&self, index: usize) -> WorkerHandle {
        let running = Arc::new(AtomicBool::new(true));
        let park = Barrier::new(2);
        let shared = Arc::clone(&self.shared);
        let barrier = self.barrier.clone();
        let running_for_task = Arc::clone(&running);
        let park_for_task = park.clone();
        let join = self.scheduler.spawn(Box::new(move || {
            worker_loop(shared, barrier, park_for_task, index, running_for_task)
        }));
        WorkerHandle {
            running,
            park,
            join: Some(join),
        }
    }

    /// Runs every process once, returning after all have completed this
    /// round. Safe to call repeatedly; the worker pool is reused whenever
    /// the process count is unchanged (spec.md §4.7's "Worker reuse").
    pub fn run(&self) -> Result<()> {
        let k = self.shared.processes.lock().unwrap().len();
        if k == 0 {
            return Ok(());
        }
        let needed = k - 1;
        let mut workers = self.workers.lock().unwrap();
        if workers.len() != needed {
            while workers.len() > needed {
                let w = workers.pop().unwrap();
                w.terminate();
            }
            self.barrier.reset(k as u32);
            for w in workers.iter() {
                w.release();
            }
            while workers.len() < needed {
                let index = workers.len();
                workers.push(self.spawn_worker(index));
            }
        } else {
            for w in workers.iter() {
                w.release();
            }
        }
        drop(workers);

        {
            let mut processes = self.shared.processes.lock().unwrap();
            let last = processes.len() - 1;
            processes[last].run();
        }
        self.barrier.sync();
        Ok(())
    }
}

impl Drop for Parallel {
    fn drop(&mut self) {
        let mut workers = self.workers.lock().unwrap();
        for w in workers.drain(..) {
            w.terminate();
        }
    }
}

fn worker_loop(
    shared: Arc<Shared>,
    barrier: Barrier,
    park: Barrier,
    index: usize,
    running: Arc<AtomicBool>,
) {
    loop {
        if !running.load(Ordering::Acquire) {
            return;
        }
        {
            let mut processes = shared.processes.lock().unwrap();
            processes[index].run();
        }
        barrier.sync();
        park.sync();
    }
}

/// Spawns one process per element of `items`, applying `f` to each, and
/// waits for all to finish (spec.md §4.7's `par_for`).
pub fn par_for<T, F>(items: Vec<T>, f: F) -> Result<()>
where
    T: Send + 'static,
    F: Fn(T) + Clone + Send + 'static,
{
    let processes: Vec<Box<dyn Process>> = items
        .into_iter()
        .map(|item| {
            let f = f.clone();
            let mut item = Some(item);
            Box::new(move || f(item.take().expect("par_for process run more than once"))) as Box<dyn Process>
        })
        .collect();
    Parallel::new(processes).run()
}

/// Spawns `n` copies of `f`, each called with its own index, and waits for
/// all to finish (spec.md §4.7's `par_for_n`).
pub fn par_for_n<F>(n: usize, f: F) -> Result<()>
where
    F: Fn(usize) + Clone + Send + 'static,
{
    par_for((0..n).collect(), f)
}

/// Reads one value from each of `readers`, concurrently, returning the
/// values in the same order as the input channels (spec.md §4.7's
/// `par_read`, a k-way parallel fan-in).
pub fn par_read<T: Send + 'static>(readers: Vec<ReaderEnd<T>>) -> Result<Vec<T>> {
    let n = readers.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let results: Arc<Mutex<Vec<Option<T>>>> = Arc::new(Mutex::new((0..n).map(|_| None).collect()));
    let error: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));
    let processes: Vec<Box<dyn Process>> = readers
        .into_iter()
        .enumerate()
        .map(|(i, reader)| {
            let results = Arc::clone(&results);
            let error = Arc::clone(&error);
            Box::new(move || match reader.read() {
                Ok(v) => results.lock().unwrap()[i] = Some(v),
                Err(e) => *error.lock().unwrap() = Some(e),
            }) as Box<dyn Process>
        })
        .collect();
    Parallel::new(processes).run()?;
    if let Some(e) = error.lock().unwrap().take() {
        return Err(e);
    }
    let results = Arc::try_unwrap(results)
        .unwrap_or_else(|_| unreachable!("no process outlives Parallel::run"))
        .into_inner()
        .unwrap();
    Ok(results
        .into_iter()
        .map(|v| v.expect("par_read completed without a value for every channel"))
        .collect())
}

/// Writes one value from `values` to each of `writers`, concurrently
/// (spec.md §4.7's `par_write`, a k-way parallel fan-out). `writers` and
/// `values` must have the same length.
pub fn par_write<T: Send + 'static>(writers: Vec<WriterEnd<T>>, values: Vec<T>) -> Result<()> {
    assert_eq!(
        writers.len(),
        values.len(),
        "par_write needs one value per writer"
    );
    if writers.is_empty() {
        return Ok(());
    }
    let error: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));
    let processes: Vec<Box<dyn Process>> = writers
        .into_iter()
        .zip(values)
        .map(|(writer, value)| {
            let error = Arc::clone(&error);
            let mut value = Some(value);
            Box::new(move || {
                if let Err(e) = writer.write(value.take().expect("par_write process run more than once"))
                {
                    *error.lock().unwrap() = Some(e);
                }
            }) as Box<dyn Process>
        })
        .collect();
    Parallel::new(processes).run()?;
    if let Some(e) = error.lock().unwrap().take() {
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn all_processes_run_each_round() {
        let counter = Arc::new(AtomicUsize::new(0));
        let processes: Vec<Box<dyn Process>> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }) as Box<dyn Process>
            })
            .collect();
        let par = Parallel::new(processes);
        for _ in 0..5 {
            par.run().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn par_for_applies_f_to_every_item() {
        let sum = Arc::new(std::sync::atomic::AtomicI64::new(0));
        let items: Vec<i64> = (1..=10).collect();
        let sum2 = Arc::clone(&sum);
        par_for(items, move |i| {
            sum2.fetch_add(i, Ordering::SeqCst);
        })
        .unwrap();
        assert_eq!(sum.load(Ordering::SeqCst), 55);
    }

    #[test]
    fn par_read_collects_in_order() {
        let c0 = crate::channel::blocking::channel::<i32>();
        let c1 = crate::channel::blocking::channel::<i32>();
        let w0 = c0.out();
        let w1 = c1.out();
        let h = std::thread::spawn(move || {
            w0.write(10).unwrap();
            w1.write(20).unwrap();
        });
        let values = par_read(vec![c0.r#in(), c1.r#in()]).unwrap();
        assert_eq!(values, vec![10, 20]);
        h.join().unwrap();
    }
}
