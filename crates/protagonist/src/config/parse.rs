use serde::Deserialize;
use serde_json::Value;

use crate::config::model::{AstType, Config, ParserFlags};

/// Options object accepted by `parse` and `validate`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ParseOptions {
    #[serde(default)]
    pub require_blueprint_name: bool,

    #[serde(default)]
    pub export_sourcemap: bool,

    #[serde(default, rename = "type")]
    pub ast_type: Option<AstType>,
}

impl From<ParseOptions> for Config {
    fn from(options: ParseOptions) -> Self {
        Config {
            flags: ParserFlags {
                require_blueprint_name: options.require_blueprint_name,
                export_sourcemap: options.export_sourcemap,
            },
            ast_type: options.ast_type.unwrap_or_default(),
        }
    }
}

/// Which operation the options are decoded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsMode {
    Parse,
    Validate,
}

/// Decode a raw options object into a typed [`Config`].
///
/// Errors are returned as the message surfaced to the caller.
pub fn decode_options(value: &Value, mode: OptionsMode) -> Result<Config, String> {
    let object = value
        .as_object()
        .ok_or_else(|| "options must be an object".to_string())?;

    if mode == OptionsMode::Validate && object.contains_key("type") {
        return Err(
            "unrecognized option 'type', expected: 'requireBlueprintName' or 'exportSourcemap'"
                .to_string(),
        );
    }

    let options = ParseOptions::deserialize(value).map_err(|e| format!("invalid options: {e}"))?;

    tracing::trace!("Decoded options {:?}", options);

    Ok(options.into())
}
