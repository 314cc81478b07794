use serde::Serialize;

use crate::blueprint::{Diagnostic, SourceRange};

/// Outward form of a parser error or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceAnnotation {
    pub code: u32,
    pub message: String,
    pub location: Vec<Location>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub index: usize,
    pub length: usize,
}

impl From<&SourceRange> for Location {
    fn from(range: &SourceRange) -> Self {
        Self {
            index: range.location,
            length: range.length,
        }
    }
}

impl From<&Diagnostic> for SourceAnnotation {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            code: diagnostic.code,
            message: diagnostic.message.clone(),
            location: diagnostic.location.iter().map(Location::from).collect(),
        }
    }
}

impl std::fmt::Display for SourceAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)?;
        if let Some(first) = self.location.first() {
            write!(f, " at byte {}", first.index)?;
        }
        Ok(())
    }
}

/// Wrap a parser error into the value handed to the callback.
pub fn wrap_error(error: &Diagnostic) -> SourceAnnotation {
    SourceAnnotation::from(error)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::blueprint::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_wrap_error() {
        let diagnostic = Diagnostic::error(
            ErrorKind::Business,
            "empty API description",
            vec![SourceRange::new(3, 4)],
        );
        let annotation = wrap_error(&diagnostic);

        assert_eq!(
            serde_json::to_value(&annotation).unwrap(),
            json!({
                "code": 2,
                "message": "empty API description",
                "location": [{ "index": 3, "length": 4 }]
            })
        );
        assert_eq!(
            annotation.to_string(),
            "empty API description (code 2) at byte 3"
        );
    }
}
