//! Offloads parsing to a scheduler and delivers results on the caller's
//! thread.
//!
//! A call moves through three owners. [`validator`] checks the call and
//! builds a [`ParseTask`]; the task travels to a worker which fills in its
//! outcome; the completion, which holds the callback and never leaves the
//! calling thread, receives the task back and dispatches it.

mod client;
mod dispatch;
pub mod executor;
pub mod fault;
pub mod scheduler;
pub mod task;
mod validator;
mod worker;

use std::rc::Rc;

use serde_json::Value;

pub use dispatch::ParseOutput;
pub use executor::ThreadPoolScheduler;
pub use fault::{AbortOnFault, FaultHandler, PanicOnFault};
pub use scheduler::{Completion, InlineScheduler, Scheduler, Work};
pub use task::{ParseTask, TaskId, TaskKind, TaskPhase};
pub use validator::{Argument, Callback};

use crate::config::{decode_options, Config, OptionsMode};
use crate::error::ArgumentError;
use crate::Result;
use task::TaskTracker;

/// Entry point for `parse` and `validate` calls.
pub struct Bridge<S> {
    scheduler: S,
    faults: Rc<dyn FaultHandler>,
    tracker: TaskTracker,
}

impl<S: Scheduler<ParseTask>> Bridge<S> {
    /// Bridge that aborts the process when a callback faults.
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            faults: Rc::new(AbortOnFault),
            tracker: TaskTracker::default(),
        }
    }

    pub fn with_fault_handler(mut self, faults: impl FaultHandler + 'static) -> Self {
        self.faults = Rc::new(faults);
        self
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Task states created and not released yet.
    pub fn live_tasks(&self) -> usize {
        self.tracker.live()
    }

    /// `parse(source, [options], callback)`.
    ///
    /// Returns once the task is scheduled; the callback runs later, on this
    /// thread, when the scheduler delivers completions.
    pub fn parse(&self, args: Vec<Argument>) -> Result<TaskId> {
        self.submit(args, TaskKind::Parse)
    }

    /// `validate(source, [options], callback)`. The result only carries
    /// annotations.
    pub fn validate(&self, args: Vec<Argument>) -> Result<TaskId> {
        self.submit(args, TaskKind::Validate)
    }

    fn submit(&self, args: Vec<Argument>, kind: TaskKind) -> Result<TaskId> {
        let call = validator::validate_call(args, kind)?;

        let mut task = ParseTask::new(kind, call.source, call.config, self.tracker.track());
        let id = task.id();
        task.transition(TaskPhase::Scheduled);

        let callback = call.callback;
        let faults = Rc::clone(&self.faults);
        self.scheduler.schedule(
            task,
            Box::new(move |task: ParseTask| dispatch::dispatch(task, callback, faults.as_ref())),
        )?;

        tracing::debug!("Scheduled {:?} task {}", kind, id);
        Ok(id)
    }
}

/// Parse on the calling thread, without a scheduler.
pub fn parse_sync(source: &str, options: Option<&Value>) -> Result<ParseOutput> {
    let config = match options {
        Some(options) => {
            decode_options(options, OptionsMode::Parse).map_err(ArgumentError::Options)?
        }
        None => Config::default(),
    };
    Ok(worker::process(TaskKind::Parse, source, &config).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallbackFault;
    use crate::Error;
    use serde_json::json;
    use std::cell::RefCell;

    type Received = Rc<RefCell<Vec<ParseOutput>>>;

    fn collect(received: &Received) -> Argument {
        let sink = Rc::clone(received);
        Argument::function(move |error, result| {
            sink.borrow_mut().push(ParseOutput { error, result });
            Ok(())
        })
    }

    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl FaultHandler for Rc<Recorder> {
        fn escalate(&self, _task: TaskId, fault: CallbackFault) {
            self.0.borrow_mut().push(fault.to_string());
        }
    }

    #[test]
    fn test_parse_is_deferred() {
        let bridge = Bridge::new(InlineScheduler::new());
        let received = Received::default();

        bridge.parse(vec!["# API\n".into(), collect(&received)]).unwrap();
        assert!(received.borrow().is_empty());
        assert_eq!(bridge.live_tasks(), 1);

        assert_eq!(bridge.scheduler().run_pending(), 1);
        assert_eq!(received.borrow().len(), 1);
        assert_eq!(bridge.live_tasks(), 0);
    }

    #[test]
    fn test_argument_error_schedules_nothing() {
        let bridge = Bridge::new(InlineScheduler::new());
        let received = Received::default();

        let calls: Vec<Vec<Argument>> = vec![
            vec![collect(&received)],
            vec![json!(1).into(), collect(&received)],
            vec!["# API".into(), json!({}).into()],
            vec!["# API".into(), json!([]).into(), collect(&received)],
            vec!["# API".into(), json!({ "bogus": true }).into(), collect(&received)],
        ];
        for args in calls {
            assert!(matches!(bridge.parse(args), Err(Error::Argument(_))));
        }

        assert_eq!(bridge.scheduler().scheduled(), 0);
        assert_eq!(bridge.scheduler().run_pending(), 0);
        assert!(received.borrow().is_empty());
        assert_eq!(bridge.live_tasks(), 0);
    }

    #[test]
    fn test_options_reach_the_wrapper() {
        let bridge = Bridge::new(InlineScheduler::new());
        let received = Received::default();

        bridge
            .parse(vec![
                "# API\n".into(),
                json!({ "type": "ast", "exportSourcemap": true }).into(),
                collect(&received),
            ])
            .unwrap();
        bridge.scheduler().run_pending();

        let output = &received.borrow()[0];
        assert_eq!(output.result["_version"], "4.0");
        assert!(output.result.get("sourcemap").is_some());
    }

    #[test]
    fn test_validate() {
        let bridge = Bridge::new(InlineScheduler::new());
        let received = Received::default();

        bridge.validate(vec!["## /a\n".into(), collect(&received)]).unwrap();
        bridge.validate(vec!["".into(), collect(&received)]).unwrap();
        bridge.scheduler().run_pending();

        let outputs = received.borrow();
        assert!(outputs[0].error.is_none());
        assert_eq!(outputs[0].result["content"][0]["meta"]["classes"][0], "warning");
        assert!(outputs[1].error.is_some());
    }

    #[test]
    fn test_callback_fault_is_escalated() {
        let recorder = Rc::new(Recorder::default());
        let bridge =
            Bridge::new(InlineScheduler::new()).with_fault_handler(Rc::clone(&recorder));

        bridge
            .parse(vec![
                "# API\n".into(),
                Argument::function(|_, _| Err(anyhow::anyhow!("rejected"))),
            ])
            .unwrap();
        bridge.scheduler().run_pending();

        assert_eq!(
            *recorder.0.borrow(),
            vec!["callback returned an error: rejected".to_string()]
        );
        assert_eq!(bridge.live_tasks(), 0);
    }

    #[test]
    #[should_panic(expected = "callback fault in task")]
    fn test_panic_on_fault() {
        let bridge = Bridge::new(InlineScheduler::new()).with_fault_handler(PanicOnFault);
        bridge
            .parse(vec![
                "# API\n".into(),
                Argument::function(|_, _| Err(anyhow::anyhow!("rejected"))),
            ])
            .unwrap();
        bridge.scheduler().run_pending();
    }

    #[test]
    fn test_parse_sync() {
        let output = parse_sync("# API\n", Some(&json!({ "type": "ast" }))).unwrap();
        assert!(output.error.is_none());
        assert_eq!(output.result["ast"]["name"], "API");

        let output = parse_sync("", None).unwrap();
        assert_eq!(output.error.map(|e| e.code), Some(2));

        assert!(parse_sync("# API", Some(&json!({ "type": "xml" }))).is_err());
    }
}
