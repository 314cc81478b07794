use serde::{Deserialize, Serialize};

/// Outward shape of a parse result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AstType {
    /// Legacy structural form: `{ "_version", "ast", "warnings" }`
    Ast,
    /// Refract element tree rooted at a `parseResult`
    #[default]
    Refract,
}

/// Flags handed to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParserFlags {
    pub require_blueprint_name: bool,
    pub export_sourcemap: bool,
}

impl ParserFlags {
    /// Same flags with source-map export switched on.
    pub fn with_sourcemap(self) -> Self {
        Self {
            export_sourcemap: true,
            ..self
        }
    }
}

/// Immutable per-call configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub flags: ParserFlags,
    pub ast_type: AstType,
}
