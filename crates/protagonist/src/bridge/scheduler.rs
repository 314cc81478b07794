use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use crate::bridge::worker::panic_message;
use crate::error::ScheduleError;

/// Work that runs off the calling thread.
pub trait Work: Send + 'static {
    fn execute(&mut self);

    /// Called on the same thread after `execute` panicked, before the work is
    /// handed to its completion.
    fn recover(&mut self, _panic: &str) {}
}

/// Run `work`, turning a panic into a call to [`Work::recover`].
pub(crate) fn execute_guarded<W: Work>(work: &mut W) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| work.execute())) {
        let message = panic_message(payload.as_ref());
        tracing::error!("Work panicked during execution: {}", message);
        if panic::catch_unwind(AssertUnwindSafe(|| work.recover(&message))).is_err() {
            tracing::error!("Work panicked again while recovering");
        }
    }
}

/// Runs on the calling thread once the work has finished. Not required to be
/// `Send`: whatever it captures never leaves the caller.
pub type Completion<W> = Box<dyn FnOnce(W)>;

/// Accepts an (execute, on-complete) pair.
///
/// Implementations must run `W::execute` exactly once, then hand the same
/// value to `on_complete` on the thread that called `schedule`, never before
/// `execute` has returned or unwound. A panicking `execute` is followed by
/// `W::recover` and still completes.
pub trait Scheduler<W: Work> {
    fn schedule(&self, work: W, on_complete: Completion<W>) -> Result<(), ScheduleError>;
}

/// Deferred single-threaded scheduler.
///
/// Nothing runs inside `schedule`; [`InlineScheduler::run_pending`] executes
/// and completes queued work in FIFO order on the current thread.
pub struct InlineScheduler<W: Work> {
    queue: RefCell<VecDeque<(W, Completion<W>)>>,
    scheduled: Cell<usize>,
}

impl<W: Work> InlineScheduler<W> {
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            scheduled: Cell::new(0),
        }
    }

    /// Total number of accepted `schedule` calls.
    pub fn scheduled(&self) -> usize {
        self.scheduled.get()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run queued work, including work scheduled by completions, until the
    /// queue is empty. Returns the number of completions delivered.
    pub fn run_pending(&self) -> usize {
        let mut completed = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some((mut work, on_complete)) = next else {
                break;
            };
            execute_guarded(&mut work);
            on_complete(work);
            completed += 1;
        }
        completed
    }
}

impl<W: Work> Default for InlineScheduler<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Work> Scheduler<W> for InlineScheduler<W> {
    fn schedule(&self, work: W, on_complete: Completion<W>) -> Result<(), ScheduleError> {
        self.queue.borrow_mut().push_back((work, on_complete));
        self.scheduled.set(self.scheduled.get() + 1);
        Ok(())
    }
}
