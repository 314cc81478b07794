//! Conversion of parse reports into the values handed to callbacks.

mod annotation;
mod ast;
mod refract;

pub use annotation::{wrap_error, Location, SourceAnnotation};

use serde_json::Value;

use crate::blueprint::ParseReport;
use crate::config::{AstType, Config};

/// Wrap a report into the outward result shape selected by `config`.
///
/// The caller's own flags decide whether source maps are included, even
/// though the parser always records them.
pub fn wrap_result(report: &ParseReport, config: &Config) -> Value {
    match config.ast_type {
        AstType::Ast => ast::wrap(report, config.flags),
        AstType::Refract => refract::wrap(report, config.flags),
    }
}

/// Validation result: a `parseResult` holding only annotations.
pub fn wrap_annotations(report: &ParseReport) -> Value {
    refract::parse_result(refract::annotations(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::parse;
    use crate::config::ParserFlags;
    use serde_json::json;

    #[test]
    fn test_wrap_result_selects_shape() {
        let report = parse("# API\n", ParserFlags::default());

        let refract = wrap_result(&report, &Config::default());
        assert_eq!(refract["element"], "parseResult");

        let ast = wrap_result(
            &report,
            &Config {
                ast_type: AstType::Ast,
                ..Default::default()
            },
        );
        assert_eq!(ast["ast"]["name"], "API");
    }

    #[test]
    fn test_wrap_annotations() {
        let clean = parse("# API\n", ParserFlags::default());
        assert_eq!(
            wrap_annotations(&clean),
            json!({ "element": "parseResult", "content": [] })
        );

        let no_name = parse("## /a\n", ParserFlags::default());
        let result = wrap_annotations(&no_name);
        assert_eq!(result["content"][0]["meta"]["classes"][0], "warning");
        assert_eq!(result["content"][0]["attributes"]["code"], 1);
    }
}
