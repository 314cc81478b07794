#![doc = include_str!("../README.md")]

pub mod blueprint;
pub mod bridge;
pub mod config;
pub mod error;
pub mod wrap;

pub use bridge::{
    parse_sync, AbortOnFault, Argument, Bridge, Callback, FaultHandler, InlineScheduler,
    PanicOnFault, ParseOutput, ParseTask, Scheduler, TaskId, ThreadPoolScheduler,
};
pub use config::{AstType, Config, ParseOptions};
pub use error::{ArgumentError, CallbackFault, Error, Result, ScheduleError};
pub use wrap::SourceAnnotation;
