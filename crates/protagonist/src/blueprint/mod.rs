//! API Blueprint document model and parser.

mod parser;
mod report;

pub use parser::parse;
pub use report::{Diagnostic, ErrorKind, ParseReport, SourceMap, SourceRange, WarningKind};

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub metadata: Vec<Metadata>,
    pub name: String,
    pub description: String,
    pub resource_groups: Vec<ResourceGroup>,
    #[serde(skip)]
    pub source_map: SourceMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub name: String,
    pub value: String,
    #[serde(skip)]
    pub source_map: SourceMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceGroup {
    pub name: String,
    pub description: String,
    pub resources: Vec<Resource>,
    #[serde(skip)]
    pub source_map: SourceMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,
    pub uri_template: String,
    pub description: String,
    pub actions: Vec<Action>,
    #[serde(skip)]
    pub source_map: SourceMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Action {
    pub name: String,
    pub method: String,
    pub description: String,
    pub requests: Vec<Payload>,
    pub responses: Vec<Payload>,
    #[serde(skip)]
    pub source_map: SourceMap,
}

/// Request or response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub name: String,
    pub content_type: Option<String>,
    pub headers: Vec<Header>,
    pub body: String,
    #[serde(skip)]
    pub source_map: SourceMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Blueprint {
    /// Drop every recorded source range.
    pub(crate) fn clear_source_maps(&mut self) {
        self.source_map.clear();
        self.metadata.iter_mut().for_each(|m| m.source_map.clear());
        for group in &mut self.resource_groups {
            group.source_map.clear();
            for resource in &mut group.resources {
                resource.source_map.clear();
                for action in &mut resource.actions {
                    action.source_map.clear();
                    action
                        .requests
                        .iter_mut()
                        .chain(action.responses.iter_mut())
                        .for_each(|p| p.source_map.clear());
                }
            }
        }
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resource_groups.iter().flat_map(|g| g.resources.iter())
    }
}
