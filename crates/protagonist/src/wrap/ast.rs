use serde_json::{json, Value};

use crate::blueprint::{Blueprint, ParseReport, SourceMap};
use crate::config::ParserFlags;
use crate::wrap::annotation::SourceAnnotation;

pub(crate) const AST_VERSION: &str = "4.0";

/// Legacy structural result.
pub(crate) fn wrap(report: &ParseReport, flags: ParserFlags) -> Value {
    let warnings = report
        .warnings
        .iter()
        .map(SourceAnnotation::from)
        .collect::<Vec<_>>();

    let mut result = json!({
        "_version": AST_VERSION,
        "ast": serde_json::to_value(&report.blueprint).unwrap_or_default(),
        "warnings": warnings,
    });

    if flags.export_sourcemap {
        result["sourcemap"] = sourcemap(&report.blueprint);
    }
    result
}

fn ranges(source_map: &SourceMap) -> Value {
    source_map
        .iter()
        .map(|r| json!([r.location, r.length]))
        .collect()
}

/// Source map tree mirroring the shape of the `ast` member.
fn sourcemap(blueprint: &Blueprint) -> Value {
    let groups = blueprint
        .resource_groups
        .iter()
        .map(|group| {
            let resources = group
                .resources
                .iter()
                .map(|resource| {
                    let actions = resource
                        .actions
                        .iter()
                        .map(|action| {
                            json!({
                                "action": ranges(&action.source_map),
                                "requests": action.requests.iter().map(|p| ranges(&p.source_map)).collect::<Vec<_>>(),
                                "responses": action.responses.iter().map(|p| ranges(&p.source_map)).collect::<Vec<_>>(),
                            })
                        })
                        .collect::<Vec<_>>();
                    json!({ "resource": ranges(&resource.source_map), "actions": actions })
                })
                .collect::<Vec<_>>();
            json!({ "resourceGroup": ranges(&group.source_map), "resources": resources })
        })
        .collect::<Vec<_>>();

    json!({
        "metadata": blueprint.metadata.iter().map(|m| ranges(&m.source_map)).collect::<Vec<_>>(),
        "blueprint": ranges(&blueprint.source_map),
        "resourceGroups": groups,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::blueprint::parse;

    #[test]
    fn test_wrap_ast() {
        let flags = ParserFlags::default();
        let report = parse("# API\n## GET /a\n+ Response 200\n", flags);
        let result = wrap(&report, flags);

        assert_eq!(result["_version"], "4.0");
        assert_eq!(result["ast"]["name"], "API");
        assert_eq!(
            result["ast"]["resourceGroups"][0]["resources"][0]["uriTemplate"],
            "/a"
        );
        assert_eq!(result["warnings"], json!([]));
        assert!(result.get("sourcemap").is_none());
    }

    #[test]
    fn test_wrap_ast_with_sourcemap() {
        let flags = ParserFlags {
            export_sourcemap: true,
            ..Default::default()
        };
        let report = parse("# API\n## /a\n", flags);
        let result = wrap(&report, flags);

        assert_eq!(result["sourcemap"]["blueprint"], json!([[0, 6]]));
        assert_eq!(
            result["sourcemap"]["resourceGroups"][0]["resources"][0]["resource"],
            json!([[6, 6]])
        );
    }
}
