use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::time::Instant;
use uuid::Uuid;

use crate::blueprint::Diagnostic;
use crate::config::Config;

pub type TaskId = Uuid;

/// Which operation a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Parse,
    Validate,
}

impl TaskKind {
    pub(crate) fn signature(self) -> &'static str {
        match self {
            TaskKind::Parse => "parse(string, options, callback)",
            TaskKind::Validate => "validate(string, options, callback)",
        }
    }
}

/// Lifecycle of a task. Every transition happens exactly once, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskPhase {
    Created,
    Scheduled,
    Executing,
    Completed,
    Dispatched,
    Released,
}

impl TaskPhase {
    fn next(self) -> Option<TaskPhase> {
        use TaskPhase::*;
        match self {
            Created => Some(Scheduled),
            Scheduled => Some(Executing),
            Executing => Some(Completed),
            Completed => Some(Dispatched),
            Dispatched => Some(Released),
            Released => None,
        }
    }
}

/// Result-or-error slot written by the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Parsed(Value),
    Failed { error: Diagnostic, result: Value },
}

/// Counts task states that have not been released yet.
#[derive(Debug, Clone, Default)]
pub struct TaskTracker {
    live: Arc<AtomicUsize>,
}

impl TaskTracker {
    pub(crate) fn track(&self) -> TaskGuard {
        self.live.fetch_add(1, Ordering::SeqCst);
        TaskGuard {
            live: Arc::clone(&self.live),
        }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub(crate) struct TaskGuard {
    live: Arc<AtomicUsize>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Per-call state that crosses the thread boundary.
///
/// Owned by exactly one party at a time: the validator that creates it, the
/// worker that fills in the outcome, then the dispatcher that consumes it.
/// The callback does not live here; it stays on the calling thread inside
/// the completion.
#[derive(Debug)]
pub struct ParseTask {
    /// Identifier
    pub(crate) id: TaskId,

    pub(crate) kind: TaskKind,

    /// Configuration snapshot
    pub(crate) config: Config,

    /// Source text
    pub(crate) source: String,

    /// Filled in by the worker
    pub(crate) outcome: Option<Outcome>,

    /// Instant when this task was created
    pub(crate) queue_time: Instant,

    phase: TaskPhase,

    _guard: TaskGuard,
}

impl ParseTask {
    pub(crate) fn new(kind: TaskKind, source: String, config: Config, guard: TaskGuard) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            config,
            source,
            outcome: None,
            queue_time: Instant::now(),
            phase: TaskPhase::Created,
            _guard: guard,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn phase(&self) -> TaskPhase {
        self.phase
    }

    pub(crate) fn transition(&mut self, to: TaskPhase) {
        debug_assert_eq!(
            self.phase.next(),
            Some(to),
            "task {} cannot move from {:?} to {:?}",
            self.id,
            self.phase,
            to
        );
        tracing::trace!("Task {} {:?} -> {:?}", self.id, self.phase, to);
        self.phase = to;
    }

    /// Jump to `Completed` after `execute` unwound part-way through.
    pub(crate) fn force_completed(&mut self) {
        tracing::trace!("Task {} {:?} -> Completed (recovered)", self.id, self.phase);
        self.phase = TaskPhase::Completed;
    }

    pub(crate) fn take_outcome(&mut self) -> Option<Outcome> {
        self.outcome.take()
    }
}

impl Drop for ParseTask {
    fn drop(&mut self) {
        tracing::trace!(
            "Task {} released from {:?} after {}ms",
            self.id,
            self.phase,
            self.queue_time.elapsed().as_millis()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_in_order() {
        let tracker = TaskTracker::default();
        let mut task = ParseTask::new(
            TaskKind::Parse,
            "# API".to_string(),
            Config::default(),
            tracker.track(),
        );
        assert_eq!(task.phase(), TaskPhase::Created);

        for phase in [
            TaskPhase::Scheduled,
            TaskPhase::Executing,
            TaskPhase::Completed,
            TaskPhase::Dispatched,
        ] {
            task.transition(phase);
            assert_eq!(task.phase(), phase);
        }
    }

    #[test]
    #[should_panic(expected = "cannot move from Created to Completed")]
    #[cfg(debug_assertions)]
    fn test_phase_skip_is_rejected() {
        let tracker = TaskTracker::default();
        let mut task = ParseTask::new(
            TaskKind::Parse,
            String::new(),
            Config::default(),
            tracker.track(),
        );
        task.transition(TaskPhase::Completed);
    }

    #[test]
    fn test_tracker_counts_live_tasks() {
        let tracker = TaskTracker::default();
        let first =
            ParseTask::new(TaskKind::Parse, String::new(), Config::default(), tracker.track());
        let second =
            ParseTask::new(TaskKind::Validate, String::new(), Config::default(), tracker.track());
        assert_eq!(tracker.live(), 2);

        drop(first);
        assert_eq!(tracker.live(), 1);
        drop(second);
        assert_eq!(tracker.live(), 0);
    }
}
