use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::thread::JoinHandle;

use crossbeam::channel::{unbounded, Receiver, Sender};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::bridge::scheduler::{execute_guarded, Completion, Scheduler, Work};
use crate::error::ScheduleError;
use crate::{Error, Result};

type RequestId = Uuid;

/// Scheduling request travelling to a worker and back.
struct Job<W> {
    /// Identifier
    id: RequestId,

    work: W,

    /// Instant when this job was queued
    queue_time: Instant,
}

/// Thread pool scheduler.
///
/// Work runs on one of `n_workers` dedicated threads. Completions are kept on
/// the calling thread and only run from [`ThreadPoolScheduler::run`], which
/// must be awaited on that same thread.
pub struct ThreadPoolScheduler<W: Work> {
    job_tx: Option<Sender<Job<W>>>,
    done_rx: Mutex<UnboundedReceiver<Job<W>>>,
    pending: RefCell<HashMap<RequestId, Completion<W>>>,
    delivered: Cell<usize>,
    workers: Vec<JoinHandle<()>>,
}

impl<W: Work> ThreadPoolScheduler<W> {
    pub fn new(n_workers: usize) -> Result<Self> {
        if n_workers == 0 {
            return Err(Error::InvalidArgument("thread pool needs at least one worker"));
        }

        let (job_tx, job_rx) = unbounded::<Job<W>>();
        let (done_tx, done_rx) = unbounded_channel();

        let workers = (0..n_workers)
            .map(|i| {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                std::thread::Builder::new()
                    .name(format!("parse-worker-{i}"))
                    .spawn(move || worker_loop(job_rx, done_tx))
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        tracing::debug!("Started thread pool with {} workers", n_workers);

        Ok(Self {
            job_tx: Some(job_tx),
            done_rx: Mutex::new(done_rx),
            pending: RefCell::new(HashMap::new()),
            delivered: Cell::new(0),
            workers,
        })
    }

    /// Scheduled work whose completion has not run yet.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Completions delivered so far.
    pub fn delivered(&self) -> usize {
        self.delivered.get()
    }

    /// Deliver completions on the current thread until nothing is pending,
    /// including work scheduled by the completions themselves. Returns the
    /// number of completions run by this call.
    pub async fn run(&self) -> usize {
        let mut completed = 0;
        while self.pending() > 0 {
            let job = self.done_rx.lock().await.recv().await;
            let Some(job) = job else {
                tracing::error!("All workers exited with {} jobs pending", self.pending());
                break;
            };

            let completion = self.pending.borrow_mut().remove(&job.id);
            match completion {
                Some(on_complete) => {
                    tracing::trace!(
                        "Completing job {}, queued {}ms ago",
                        job.id,
                        job.queue_time.elapsed().as_millis()
                    );
                    on_complete(job.work);
                    self.delivered.set(self.delivered.get() + 1);
                    completed += 1;
                }
                None => tracing::error!("No completion registered for job {}", job.id),
            }
        }
        completed
    }

    /// Stop accepting work and wait for the workers to drain the queue.
    pub fn shutdown(&mut self) {
        if self.job_tx.take().is_none() {
            return;
        }
        tracing::debug!("Stopping thread pool");
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }
    }
}

impl<W: Work> Scheduler<W> for ThreadPoolScheduler<W> {
    fn schedule(&self, work: W, on_complete: Completion<W>) -> std::result::Result<(), ScheduleError> {
        let tx = self.job_tx.as_ref().ok_or(ScheduleError::ShutDown)?;

        let job = Job {
            id: Uuid::new_v4(),
            work,
            queue_time: Instant::now(),
        };
        let id = job.id;

        // Register first so a fast worker cannot finish before the completion exists
        self.pending.borrow_mut().insert(id, on_complete);
        if tx.send(job).is_err() {
            self.pending.borrow_mut().remove(&id);
            return Err(ScheduleError::ShutDown);
        }

        tracing::debug!("Scheduled job {}", id);
        Ok(())
    }
}

/// Dropping the pool joins the workers. Completions that were never delivered
/// by [`ThreadPoolScheduler::run`] are dropped without being called.
impl<W: Work> Drop for ThreadPoolScheduler<W> {
    fn drop(&mut self) {
        self.shutdown();

        let undelivered = self.pending();
        if undelivered > 0 {
            tracing::error!(
                "Thread pool dropped with {} undelivered completions",
                undelivered
            );
            self.pending.get_mut().clear();
        }
    }
}

// Pull jobs off the queue until every sender is gone
fn worker_loop<W: Work>(jobs: Receiver<Job<W>>, done: UnboundedSender<Job<W>>) {
    let name = std::thread::current()
        .name()
        .unwrap_or("parse-worker")
        .to_string();
    tracing::debug!("{} started", name);

    while let Ok(mut job) = jobs.recv() {
        tracing::trace!(
            "{} executing job {}, queued {}ms ago",
            name,
            job.id,
            job.queue_time.elapsed().as_millis()
        );

        execute_guarded(&mut job.work);

        let id = job.id;
        if done.send(job).is_err() {
            tracing::error!("Failed to signal completion of job {}", id)
        }
    }

    tracing::debug!("{} stopped", name);
}
