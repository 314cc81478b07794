//! Refract element tree for a parse report.

use serde_json::{json, Map, Value};

use crate::blueprint::{Action, Blueprint, Diagnostic, ParseReport, Payload, Resource, SourceMap};
use crate::config::ParserFlags;

struct Builder {
    sourcemaps: bool,
}

impl Builder {
    fn element(&self, name: &str, meta: Value, attributes: Map<String, Value>, content: Value) -> Value {
        let mut element = Map::new();
        element.insert("element".to_string(), json!(name));
        if !meta.is_null() {
            element.insert("meta".to_string(), meta);
        }
        if !attributes.is_empty() {
            element.insert("attributes".to_string(), Value::Object(attributes));
        }
        if !content.is_null() {
            element.insert("content".to_string(), content);
        }
        Value::Object(element)
    }

    fn attributes(&self, source_map: &SourceMap) -> Map<String, Value> {
        let mut attributes = Map::new();
        if self.sourcemaps && !source_map.is_empty() {
            attributes.insert("sourceMap".to_string(), source_map_element(source_map));
        }
        attributes
    }

    fn copy(&self, text: &str) -> Option<Value> {
        (!text.is_empty()).then(|| json!({ "element": "copy", "content": text }))
    }

    fn api(&self, blueprint: &Blueprint) -> Value {
        let mut attributes = self.attributes(&blueprint.source_map);
        if !blueprint.metadata.is_empty() {
            let members = blueprint
                .metadata
                .iter()
                .map(|m| {
                    json!({
                        "element": "member",
                        "meta": { "classes": ["user"] },
                        "content": { "key": { "element": "string", "content": m.name },
                                     "value": { "element": "string", "content": m.value } }
                    })
                })
                .collect::<Vec<_>>();
            attributes.insert("meta".to_string(), Value::Array(members));
        }

        let mut content = self.copy(&blueprint.description).into_iter().collect::<Vec<_>>();
        for group in &blueprint.resource_groups {
            let resources = group.resources.iter().map(|r| self.resource(r));
            if group.name.is_empty() {
                // Resources outside any named group sit directly in the API
                content.extend(resources);
                continue;
            }
            let group_content = self
                .copy(&group.description)
                .into_iter()
                .chain(resources)
                .collect::<Vec<_>>();
            content.push(self.element(
                "category",
                json!({ "classes": ["resourceGroup"], "title": group.name }),
                self.attributes(&group.source_map),
                Value::Array(group_content),
            ));
        }

        self.element(
            "category",
            json!({ "classes": ["api"], "title": blueprint.name }),
            attributes,
            Value::Array(content),
        )
    }

    fn resource(&self, resource: &Resource) -> Value {
        let mut attributes = self.attributes(&resource.source_map);
        attributes.insert("href".to_string(), json!(resource.uri_template));

        let content = self
            .copy(&resource.description)
            .into_iter()
            .chain(resource.actions.iter().map(|a| self.transition(a)))
            .collect::<Vec<_>>();

        self.element(
            "resource",
            json!({ "title": resource.name }),
            attributes,
            Value::Array(content),
        )
    }

    fn transition(&self, action: &Action) -> Value {
        let mut content = self.copy(&action.description).into_iter().collect::<Vec<_>>();

        // Pair requests with responses the way examples do
        let requests = action.requests.len().max(1);
        for i in 0..requests.max(action.responses.len()) {
            let request = action.requests.get(i).or(action.requests.last());
            let response = action.responses.get(i);
            content.push(self.element(
                "httpTransaction",
                Value::Null,
                Map::new(),
                json!([self.request(&action.method, request), self.response(response)]),
            ));
        }

        self.element(
            "transition",
            json!({ "title": action.name }),
            self.attributes(&action.source_map),
            Value::Array(content),
        )
    }

    fn request(&self, method: &str, payload: Option<&Payload>) -> Value {
        let mut attributes = payload
            .map(|p| self.attributes(&p.source_map))
            .unwrap_or_default();
        attributes.insert("method".to_string(), json!(method));
        self.payload("httpRequest", attributes, payload)
    }

    fn response(&self, payload: Option<&Payload>) -> Value {
        let mut attributes = payload
            .map(|p| self.attributes(&p.source_map))
            .unwrap_or_default();
        if let Some(p) = payload {
            attributes.insert("statusCode".to_string(), json!(p.name));
        }
        self.payload("httpResponse", attributes, payload)
    }

    fn payload(&self, name: &str, mut attributes: Map<String, Value>, payload: Option<&Payload>) -> Value {
        let Some(payload) = payload else {
            return self.element(name, Value::Null, attributes, json!([]));
        };

        if !payload.headers.is_empty() {
            let headers = payload
                .headers
                .iter()
                .map(|h| {
                    json!({ "element": "member", "content": {
                        "key": { "element": "string", "content": h.name },
                        "value": { "element": "string", "content": h.value } } })
                })
                .collect::<Vec<_>>();
            attributes.insert(
                "headers".to_string(),
                json!({ "element": "httpHeaders", "content": headers }),
            );
        }

        let mut content = Vec::new();
        if !payload.body.is_empty() {
            let mut asset = json!({
                "element": "asset",
                "meta": { "classes": ["messageBody"] },
                "content": payload.body,
            });
            if let Some(content_type) = &payload.content_type {
                asset["attributes"] = json!({ "contentType": content_type });
            }
            content.push(asset);
        }
        self.element(name, Value::Null, attributes, Value::Array(content))
    }
}

fn source_map_element(source_map: &SourceMap) -> Value {
    let ranges = source_map
        .iter()
        .map(|r| json!([r.location, r.length]))
        .collect::<Vec<_>>();
    json!([{ "element": "sourceMap", "content": ranges }])
}

pub(crate) fn annotation(diagnostic: &Diagnostic, class: &str) -> Value {
    let mut attributes = json!({ "code": diagnostic.code });
    if !diagnostic.location.is_empty() {
        attributes["sourceMap"] = source_map_element(&diagnostic.location);
    }
    json!({
        "element": "annotation",
        "meta": { "classes": [class] },
        "attributes": attributes,
        "content": diagnostic.message,
    })
}

/// Annotations for the report's error and warnings, error first.
pub(crate) fn annotations(report: &ParseReport) -> Vec<Value> {
    report
        .error
        .iter()
        .map(|e| annotation(e, "error"))
        .chain(report.warnings.iter().map(|w| annotation(w, "warning")))
        .collect()
}

pub(crate) fn parse_result(content: Vec<Value>) -> Value {
    json!({ "element": "parseResult", "content": content })
}

/// Refract `parseResult`. A failed report carries only its annotations.
pub(crate) fn wrap(report: &ParseReport, flags: ParserFlags) -> Value {
    let builder = Builder {
        sourcemaps: flags.export_sourcemap,
    };

    let mut content = Vec::new();
    if report.is_ok() {
        content.push(builder.api(&report.blueprint));
    }
    content.extend(annotations(report));
    parse_result(content)
}
