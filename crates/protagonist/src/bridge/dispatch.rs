use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use serde_json::Value;

use crate::blueprint::{Diagnostic, ErrorKind};
use crate::bridge::fault::FaultHandler;
use crate::bridge::task::{Outcome, ParseTask, TaskPhase};
use crate::bridge::validator::Callback;
use crate::bridge::worker::panic_message;
use crate::error::CallbackFault;
use crate::wrap::{wrap_error, SourceAnnotation};

/// Values delivered to a callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseOutput {
    pub error: Option<SourceAnnotation>,
    pub result: Value,
}

impl From<Outcome> for ParseOutput {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Parsed(result) => ParseOutput {
                error: None,
                result,
            },
            Outcome::Failed { error, result } => ParseOutput {
                error: Some(wrap_error(&error)),
                result,
            },
        }
    }
}

/// Deliver a finished task to its callback on the calling thread.
///
/// The task and the callback are consumed here whatever happens: the callback
/// is invoked at most once, both are released before any fault is escalated.
pub(crate) fn dispatch(mut task: ParseTask, callback: Callback, faults: &dyn FaultHandler) {
    task.transition(TaskPhase::Dispatched);
    let id = task.id();

    let outcome = task.take_outcome().unwrap_or_else(|| {
        tracing::error!("Task {} completed without an outcome", id);
        Outcome::Failed {
            error: Diagnostic::error(
                ErrorKind::Application,
                "task completed without an outcome",
                Vec::new(),
            ),
            result: Value::Null,
        }
    });
    let ParseOutput { error, result } = outcome.into();

    tracing::trace!("Dispatching task {} (error: {})", id, error.is_some());

    let invocation = panic::catch_unwind(AssertUnwindSafe(move || callback(error, result)));
    task.transition(TaskPhase::Released);
    drop(task);

    let fault = match invocation {
        Ok(Ok(())) => return,
        Ok(Err(e)) => CallbackFault::Returned(e),
        Err(payload) => CallbackFault::Panicked(panic_message(payload.as_ref())),
    };
    faults.escalate(id, fault);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::scheduler::Work;
    use crate::bridge::task::{TaskId, TaskKind, TaskTracker};
    use crate::config::Config;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        faults: RefCell<Vec<(TaskId, String)>>,
    }

    impl FaultHandler for Recorder {
        fn escalate(&self, task: TaskId, fault: CallbackFault) {
            self.faults.borrow_mut().push((task, fault.to_string()));
        }
    }

    fn executed(tracker: &TaskTracker, source: &str) -> ParseTask {
        let mut task = ParseTask::new(
            TaskKind::Parse,
            source.to_string(),
            Config::default(),
            tracker.track(),
        );
        task.transition(TaskPhase::Scheduled);
        task.execute();
        task
    }

    #[test]
    fn test_success_has_no_error() {
        let tracker = TaskTracker::default();
        let received = Rc::new(RefCell::new(None));
        let faults = Recorder::default();

        let sink = Rc::clone(&received);
        dispatch(
            executed(&tracker, "# API\n"),
            Box::new(move |error, result| {
                *sink.borrow_mut() = Some(ParseOutput { error, result });
                Ok(())
            }),
            &faults,
        );

        let output = received.borrow_mut().take().unwrap();
        assert!(output.error.is_none());
        assert_eq!(output.result["element"], "parseResult");
        assert!(faults.faults.borrow().is_empty());
        assert_eq!(tracker.live(), 0);
    }

    #[test]
    fn test_parse_error_and_result_both_delivered() {
        let tracker = TaskTracker::default();
        let received = Rc::new(RefCell::new(None));

        let sink = Rc::clone(&received);
        dispatch(
            executed(&tracker, ""),
            Box::new(move |error, result| {
                *sink.borrow_mut() = Some(ParseOutput { error, result });
                Ok(())
            }),
            &Recorder::default(),
        );

        let output = received.borrow_mut().take().unwrap();
        assert_eq!(output.error.unwrap().code, 2);
        assert!(!output.result.is_null());
    }

    #[test]
    fn test_returned_error_is_escalated_after_release() {
        let tracker = TaskTracker::default();
        let faults = Recorder::default();
        let task = executed(&tracker, "# API\n");
        let id = task.id();

        dispatch(
            task,
            Box::new(|_, _| Err(anyhow::anyhow!("disk full"))),
            &faults,
        );

        assert_eq!(
            *faults.faults.borrow(),
            vec![(id, "callback returned an error: disk full".to_string())]
        );
        assert_eq!(tracker.live(), 0);
    }

    #[test]
    fn test_panic_is_escalated_after_release() {
        let tracker = TaskTracker::default();
        let faults = Recorder::default();
        let dropped = Rc::new(RefCell::new(false));

        struct DropFlag(Rc<RefCell<bool>>);
        impl Drop for DropFlag {
            fn drop(&mut self) {
                *self.0.borrow_mut() = true;
            }
        }
        let flag = DropFlag(Rc::clone(&dropped));

        dispatch(
            executed(&tracker, "# API\n"),
            Box::new(move |_, _| {
                let _flag = flag;
                panic!("callback exploded")
            }),
            &faults,
        );

        assert_eq!(faults.faults.borrow().len(), 1);
        assert!(faults.faults.borrow()[0].1.contains("callback exploded"));
        assert!(*dropped.borrow());
        assert_eq!(tracker.live(), 0);
    }
}
