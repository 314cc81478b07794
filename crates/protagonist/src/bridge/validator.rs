use std::fmt;

use serde_json::Value;

use crate::bridge::task::TaskKind;
use crate::config::{decode_options, Config, OptionsMode};
use crate::error::ArgumentError;
use crate::wrap::SourceAnnotation;

/// Caller-supplied completion callback, invoked with `(error, result)`.
///
/// Returning an error (or panicking) is a fault that gets escalated.
pub type Callback = Box<dyn FnOnce(Option<SourceAnnotation>, Value) -> anyhow::Result<()>>;

/// One positional argument of a call.
pub enum Argument {
    Value(Value),
    Function(Callback),
}

impl Argument {
    pub fn function<F>(f: F) -> Self
    where
        F: FnOnce(Option<SourceAnnotation>, Value) -> anyhow::Result<()> + 'static,
    {
        Argument::Function(Box::new(f))
    }

    fn is_function(&self) -> bool {
        matches!(self, Argument::Function(_))
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Argument::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

impl From<&str> for Argument {
    fn from(text: &str) -> Self {
        Argument::Value(Value::String(text.to_string()))
    }
}

impl From<String> for Argument {
    fn from(text: String) -> Self {
        Argument::Value(Value::String(text))
    }
}

/// A call that passed validation.
pub(crate) struct ValidatedCall {
    pub source: String,
    pub config: Config,
    pub callback: Callback,
}

/// Check the shape of a `parse`/`validate` call and decode its options.
///
/// Accepts `(source, callback)` or `(source, options, callback)` and reports
/// the first mismatch.
pub(crate) fn validate_call(
    mut args: Vec<Argument>,
    kind: TaskKind,
) -> Result<ValidatedCall, ArgumentError> {
    let signature = kind.signature();

    if args.len() != 2 && args.len() != 3 {
        return Err(ArgumentError::Arity {
            signature,
            got: args.len(),
        });
    }
    if !matches!(args[0], Argument::Value(Value::String(_))) {
        return Err(ArgumentError::ExpectedString { signature });
    }
    if !args[args.len() - 1].is_function() {
        return Err(ArgumentError::ExpectedCallback { signature });
    }
    if args.len() == 3 && !matches!(args[1], Argument::Value(Value::Object(_))) {
        return Err(ArgumentError::ExpectedObject { signature });
    }

    let config = match args.get(1) {
        Some(Argument::Value(options)) if args.len() == 3 => {
            let mode = match kind {
                TaskKind::Parse => OptionsMode::Parse,
                TaskKind::Validate => OptionsMode::Validate,
            };
            decode_options(options, mode).map_err(ArgumentError::Options)?
        }
        _ => Config::default(),
    };

    let (Some(Argument::Function(callback)), Some(Argument::Value(Value::String(source)))) =
        (args.pop(), args.into_iter().next())
    else {
        // Shape was checked above
        return Err(ArgumentError::Arity {
            signature,
            got: 0,
        });
    };

    Ok(ValidatedCall {
        source,
        config,
        callback,
    })
}
