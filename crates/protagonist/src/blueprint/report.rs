use serde::Serialize;

use crate::blueprint::Blueprint;

/// Byte range inside the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SourceRange {
    pub location: usize,
    pub length: usize,
}

impl SourceRange {
    pub fn new(location: usize, length: usize) -> Self {
        Self { location, length }
    }
}

pub type SourceMap = Vec<SourceRange>;

/// Error classes reported by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Failure inside the parser itself
    Application,
    /// The document cannot be processed
    Business,
}

impl ErrorKind {
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::Application => 1,
            ErrorKind::Business => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    ApiName,
    Duplicate,
    Ignoring,
    EmptyDefinition,
    Uri,
    HttpStatus,
}

impl WarningKind {
    pub fn code(self) -> u32 {
        match self {
            WarningKind::ApiName => 1,
            WarningKind::Duplicate => 2,
            WarningKind::Ignoring => 5,
            WarningKind::EmptyDefinition => 6,
            WarningKind::Uri => 12,
            WarningKind::HttpStatus => 13,
        }
    }
}

/// A single error or warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: u32,
    pub message: String,
    pub location: SourceMap,
}

impl Diagnostic {
    pub fn error(kind: ErrorKind, message: impl Into<String>, location: SourceMap) -> Self {
        Self {
            code: kind.code(),
            message: message.into(),
            location,
        }
    }

    pub fn warning(kind: WarningKind, message: impl Into<String>, location: SourceMap) -> Self {
        Self {
            code: kind.code(),
            message: message.into(),
            location,
        }
    }
}

/// Outcome of a parse: at most one error, any number of warnings, and the
/// (possibly partial) document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub error: Option<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub blueprint: Blueprint,
}

impl ParseReport {
    /// Report for a parser that failed internally.
    pub fn application_failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(Diagnostic::error(ErrorKind::Application, message, Vec::new())),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
