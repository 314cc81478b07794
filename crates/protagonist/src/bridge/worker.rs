use std::panic::{self, AssertUnwindSafe};

use crate::blueprint::{self, ParseReport};
use crate::bridge::scheduler::Work;
use crate::bridge::task::{Outcome, ParseTask, TaskKind, TaskPhase};
use crate::config::Config;
use crate::wrap::{wrap_annotations, wrap_result};

/// Parse `source` and wrap the report. Safe to call from any thread; touches
/// nothing but its arguments.
pub(crate) fn process(kind: TaskKind, source: &str, config: &Config) -> Outcome {
    // Source maps are always recorded; the wrapper decides what to expose
    let flags = config.flags.with_sourcemap();

    let report = panic::catch_unwind(AssertUnwindSafe(|| blueprint::parse(source, flags)))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::error!("Parser panicked: {}", message);
            ParseReport::application_failure(format!("internal parser failure: {message}"))
        });

    into_outcome(kind, report, config)
}

fn into_outcome(kind: TaskKind, mut report: ParseReport, config: &Config) -> Outcome {
    let result = match kind {
        TaskKind::Parse => wrap_result(&report, config),
        TaskKind::Validate => wrap_annotations(&report),
    };

    match report.error.take() {
        Some(error) => Outcome::Failed { error, result },
        None => Outcome::Parsed(result),
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Work for ParseTask {
    fn execute(&mut self) {
        self.transition(TaskPhase::Executing);
        self.outcome = Some(process(self.kind, &self.source, &self.config));
        self.transition(TaskPhase::Completed);
    }

    fn recover(&mut self, panic: &str) {
        self.force_completed();
        let report = ParseReport::application_failure(format!("internal worker failure: {panic}"));
        self.outcome = Some(into_outcome(self.kind, report, &self.config));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::task::TaskTracker;
    use crate::config::{AstType, ParserFlags};

    #[test]
    fn test_execute_fills_outcome() {
        let tracker = TaskTracker::default();
        let mut task = ParseTask::new(
            TaskKind::Parse,
            "# API\n## GET /a\n+ Response 200\n".to_string(),
            Config::default(),
            tracker.track(),
        );
        task.transition(TaskPhase::Scheduled);
        task.execute();

        assert_eq!(task.phase(), TaskPhase::Completed);
        match task.take_outcome() {
            Some(Outcome::Parsed(result)) => assert_eq!(result["element"], "parseResult"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_failed_report() {
        let outcome = process(TaskKind::Parse, "", &Config::default());
        let Outcome::Failed { error, result } = outcome else {
            panic!("empty source must fail");
        };
        assert_eq!(error.message, "empty API description");
        assert_eq!(result["content"][0]["element"], "annotation");
    }

    #[test]
    fn test_sourcemap_follows_caller_flags() {
        let source = "# API\n## /a\n";

        let Outcome::Parsed(plain) = process(TaskKind::Parse, source, &Config {
            ast_type: AstType::Ast,
            ..Default::default()
        }) else {
            panic!("parse failed");
        };
        assert!(plain.get("sourcemap").is_none());

        let config = Config {
            flags: ParserFlags {
                export_sourcemap: true,
                ..Default::default()
            },
            ast_type: AstType::Ast,
        };
        let Outcome::Parsed(mapped) = process(TaskKind::Parse, source, &config) else {
            panic!("parse failed");
        };
        assert!(mapped.get("sourcemap").is_some());
    }

    #[test]
    fn test_validate_outcome() {
        let Outcome::Parsed(result) = process(TaskKind::Validate, "## /a\n", &Config::default())
        else {
            panic!("validation failed");
        };
        assert_eq!(result["element"], "parseResult");
        assert_eq!(result["content"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_recover_reports_application_error() {
        let tracker = TaskTracker::default();
        let mut task = ParseTask::new(
            TaskKind::Parse,
            "# API\n".to_string(),
            Config::default(),
            tracker.track(),
        );
        task.transition(TaskPhase::Scheduled);
        task.transition(TaskPhase::Executing);
        task.recover("wrapper exploded");

        assert_eq!(task.phase(), TaskPhase::Completed);
        let Some(Outcome::Failed { error, result }) = task.take_outcome() else {
            panic!("recovered task must carry a failure");
        };
        assert_eq!(error.code, 1);
        assert_eq!(error.message, "internal worker failure: wrapper exploded");
        assert_eq!(result["content"][0]["meta"]["classes"][0], "error");
    }

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");
    }
}
