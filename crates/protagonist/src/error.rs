use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Argument(#[from] ArgumentError),

    #[error("Scheduling error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Raised synchronously by the request validator. Nothing is scheduled and
/// the callback is never invoked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("wrong number of arguments, `{signature}` expected")]
    Arity { signature: &'static str, got: usize },

    #[error("wrong argument - string expected, `{signature}`")]
    ExpectedString { signature: &'static str },

    #[error("wrong argument - callback expected, `{signature}`")]
    ExpectedCallback { signature: &'static str },

    #[error("wrong argument - object expected, `{signature}`")]
    ExpectedObject { signature: &'static str },

    #[error("{0}")]
    Options(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("thread pool is shut down")]
    ShutDown,
}

/// A caller-supplied callback failed while being dispatched.
#[derive(Error, Debug)]
pub enum CallbackFault {
    #[error("callback returned an error: {0}")]
    Returned(anyhow::Error),

    #[error("callback panicked: {0}")]
    Panicked(String),
}
