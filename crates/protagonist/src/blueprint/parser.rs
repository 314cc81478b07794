use crate::blueprint::report::{Diagnostic, ErrorKind, ParseReport, SourceRange, WarningKind};
use crate::blueprint::{Action, Blueprint, Header, Metadata, Payload, Resource, ResourceGroup};
use crate::config::ParserFlags;

const HTTP_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

const API_NAME_EXPECTED: &str = "expected API name, e.g. '# <API Name>'";

/// Parse an API Blueprint document.
///
/// Never panics on malformed input: every problem ends up as an error or a
/// warning inside the returned report.
pub fn parse(source: &str, flags: ParserFlags) -> ParseReport {
    if source.trim().is_empty() {
        return ParseReport {
            error: Some(Diagnostic::error(
                ErrorKind::Business,
                "empty API description",
                Vec::new(),
            )),
            ..Default::default()
        };
    }

    let tabs = source
        .char_indices()
        .filter(|(_, c)| *c == '\t')
        .map(|(i, _)| SourceRange::new(i, 1))
        .collect::<Vec<_>>();
    if !tabs.is_empty() {
        return ParseReport {
            error: Some(Diagnostic::error(
                ErrorKind::Business,
                "the use of tab(s) '\\t' in source data isn't supported, indent with spaces",
                tabs,
            )),
            ..Default::default()
        };
    }

    let mut parser = Parser::new(flags);
    let mut offset = 0;
    for raw in source.split_inclusive('\n') {
        let range = SourceRange::new(offset, raw.len());
        offset += raw.len();
        parser.line(raw.trim_end_matches(['\n', '\r']), range);
    }
    parser.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Api,
    Group,
    Resource,
    Action,
    Payload(Section),
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Implicit,
    Headers,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadKind {
    Request,
    Response,
}

/// Heading title split into its parts.
#[derive(Debug, PartialEq)]
struct Signature<'a> {
    name: &'a str,
    method: Option<&'a str>,
    uri: Option<&'a str>,
}

struct Parser {
    flags: ParserFlags,
    blueprint: Blueprint,
    warnings: Vec<Diagnostic>,
    context: Context,
    seen_heading: bool,
    action_open: bool,
    first_line: Option<SourceRange>,
}

impl Parser {
    fn new(flags: ParserFlags) -> Self {
        Self {
            flags,
            blueprint: Blueprint::default(),
            warnings: Vec::new(),
            context: Context::Api,
            seen_heading: false,
            action_open: false,
            first_line: None,
        }
    }

    fn line(&mut self, line: &str, range: SourceRange) {
        let text = line.trim();
        if text.is_empty() {
            if let Context::Payload(Section::Body | Section::Implicit) = self.context {
                if let Some(payload) = self.payload() {
                    if !payload.body.is_empty() {
                        payload.body.push('\n');
                    }
                }
            }
            return;
        }
        self.first_line.get_or_insert(range);

        let indent = line.len() - line.trim_start_matches(' ').len();
        if indent >= 4 {
            if let Context::Payload(section) = self.context {
                self.payload_line(line, text, indent, section, range);
            } else {
                self.describe(text, range);
            }
            return;
        }

        if let Some((_, title)) = heading(text) {
            self.heading(title, range);
            return;
        }

        if let Some(item) = list_item(text) {
            if let Some((kind, rest)) = payload_signature(item) {
                self.start_payload(kind, rest, range);
                return;
            }
        }

        if !self.seen_heading && self.blueprint.description.is_empty() {
            if let Some((name, value)) = metadata(text) {
                self.blueprint.metadata.push(Metadata {
                    name: name.to_string(),
                    value: value.to_string(),
                    source_map: vec![range],
                });
                return;
            }
        }

        if let Context::Payload(_) = self.context {
            self.context = Context::Action;
        }
        self.describe(text, range);
    }

    fn heading(&mut self, title: &str, range: SourceRange) {
        self.seen_heading = true;

        if let Some(name) = title.strip_prefix("Group ") {
            self.finish_action();
            self.blueprint.resource_groups.push(ResourceGroup {
                name: name.trim().to_string(),
                source_map: vec![range],
                ..Default::default()
            });
            self.context = Context::Group;
            return;
        }

        if let Some(signature) = resource_signature(title) {
            self.start_resource(signature, range);
            return;
        }

        if let Some(signature) = action_signature(title) {
            self.start_action(signature.name, signature.method.unwrap_or_default(), range);
            return;
        }

        if self.blueprint.name.is_empty() && self.blueprint.resource_groups.is_empty() {
            self.blueprint.name = title.to_string();
            self.blueprint.source_map.push(range);
            self.context = Context::Api;
            return;
        }

        // Unrecognized headings are part of the surrounding description
        if let Context::Payload(_) = self.context {
            self.context = Context::Action;
        }
        self.describe(title, range);
    }

    fn start_resource(&mut self, signature: Signature<'_>, range: SourceRange) {
        self.finish_action();
        let uri = signature.uri.unwrap_or_default();

        if uri.contains(' ') {
            self.warn(
                WarningKind::Uri,
                format!("URI template '{uri}' contains spaces"),
                range,
            );
        }
        if self.blueprint.resources().any(|r| r.uri_template == uri) {
            self.warn(
                WarningKind::Duplicate,
                format!("the resource '{uri}' is already defined"),
                range,
            );
        }

        if self.blueprint.resource_groups.is_empty() {
            self.blueprint.resource_groups.push(ResourceGroup::default());
        }
        if let Some(group) = self.blueprint.resource_groups.last_mut() {
            group.resources.push(Resource {
                name: signature.name.to_string(),
                uri_template: uri.to_string(),
                source_map: vec![range],
                ..Default::default()
            });
        }
        self.context = Context::Resource;

        if let Some(method) = signature.method {
            self.start_action("", method, range);
        }
    }

    fn start_action(&mut self, name: &str, method: &str, range: SourceRange) {
        self.finish_action();

        let Some(resource) = self.resource() else {
            self.warn(
                WarningKind::Ignoring,
                format!("action '{method}' is not part of a resource, ignoring"),
                range,
            );
            self.context = Context::Ignored;
            return;
        };

        let duplicate = resource.actions.iter().any(|a| a.method == method);
        let uri = resource.uri_template.clone();
        resource.actions.push(Action {
            name: name.to_string(),
            method: method.to_string(),
            source_map: vec![range],
            ..Default::default()
        });

        if duplicate {
            self.warn(
                WarningKind::Duplicate,
                format!("action with method '{method}' already defined for resource '{uri}'"),
                range,
            );
        }
        self.context = Context::Action;
        self.action_open = true;
    }

    fn start_payload(&mut self, kind: PayloadKind, rest: &str, range: SourceRange) {
        let keyword = match kind {
            PayloadKind::Request => "request",
            PayloadKind::Response => "response",
        };
        if !self.action_open {
            self.warn(
                WarningKind::Ignoring,
                format!("ignoring {keyword} outside of an action"),
                range,
            );
            self.context = Context::Ignored;
            return;
        }

        let (mut name, content_type) = match rest.rfind('(') {
            Some(open) if rest.ends_with(')') => (
                rest[..open].trim().to_string(),
                Some(rest[open + 1..rest.len() - 1].trim().to_string()),
            ),
            _ => (rest.trim().to_string(), None),
        };

        if kind == PayloadKind::Response {
            if name.is_empty() {
                self.warn(
                    WarningKind::HttpStatus,
                    "missing response HTTP status code, assuming 'Response 200'",
                    range,
                );
                name = "200".to_string();
            } else if !name.chars().all(|c| c.is_ascii_digit()) {
                self.warn(
                    WarningKind::HttpStatus,
                    format!("invalid HTTP status code '{name}'"),
                    range,
                );
            }
        }

        let headers = content_type
            .iter()
            .map(|value| Header {
                name: "Content-Type".to_string(),
                value: value.clone(),
            })
            .collect();
        let payload = Payload {
            name,
            content_type,
            headers,
            source_map: vec![range],
            ..Default::default()
        };

        if let Some(action) = self.action() {
            match kind {
                PayloadKind::Request => action.requests.push(payload),
                PayloadKind::Response => action.responses.push(payload),
            }
            self.context = Context::Payload(Section::Implicit);
        }
    }

    fn payload_line(
        &mut self,
        line: &str,
        text: &str,
        indent: usize,
        section: Section,
        range: SourceRange,
    ) {
        if indent < 8 {
            match list_item(text) {
                Some("Body") => self.context = Context::Payload(Section::Body),
                Some("Headers") => self.context = Context::Payload(Section::Headers),
                _ => {}
            }
            return;
        }

        let Some(payload) = self.payload() else {
            return;
        };
        payload.source_map.push(range);
        match section {
            Section::Headers => {
                if let Some((name, value)) = text.split_once(':') {
                    payload.headers.push(Header {
                        name: name.trim().to_string(),
                        value: value.trim().to_string(),
                    });
                }
            }
            Section::Body => push_body_line(&mut payload.body, strip_indent(line, 12)),
            Section::Implicit => push_body_line(&mut payload.body, strip_indent(line, 8)),
        }
    }

    fn describe(&mut self, text: &str, range: SourceRange) {
        let target = match self.context {
            Context::Api => Some((
                &mut self.blueprint.description,
                &mut self.blueprint.source_map,
            )),
            Context::Group => self
                .blueprint
                .resource_groups
                .last_mut()
                .map(|g| (&mut g.description, &mut g.source_map)),
            Context::Resource => self
                .resource()
                .map(|r| (&mut r.description, &mut r.source_map)),
            Context::Action | Context::Payload(_) => self
                .action()
                .map(|a| (&mut a.description, &mut a.source_map)),
            Context::Ignored => None,
        };

        if let Some((description, source_map)) = target {
            if !description.is_empty() {
                description.push('\n');
            }
            description.push_str(text);
            source_map.push(range);
        }
    }

    fn finish_action(&mut self) {
        if !self.action_open {
            return;
        }
        self.action_open = false;

        let missing = self.action().and_then(|action| {
            action
                .responses
                .is_empty()
                .then(|| (action.method.clone(), action.source_map.first().copied()))
        });
        if let Some((method, Some(range))) = missing {
            self.warn(
                WarningKind::EmptyDefinition,
                format!("no response defined for '{method}' action"),
                range,
            );
        }
    }

    fn finish(mut self) -> ParseReport {
        self.finish_action();

        let mut error = None;
        if self.blueprint.name.is_empty() {
            let location = self.first_line.into_iter().collect();
            if self.flags.require_blueprint_name {
                error = Some(Diagnostic::error(
                    ErrorKind::Business,
                    API_NAME_EXPECTED,
                    location,
                ));
            } else {
                self.warnings.push(Diagnostic::warning(
                    WarningKind::ApiName,
                    API_NAME_EXPECTED,
                    location,
                ));
            }
        }

        for payload in self
            .blueprint
            .resource_groups
            .iter_mut()
            .flat_map(|g| g.resources.iter_mut())
            .flat_map(|r| r.actions.iter_mut())
            .flat_map(|a| a.requests.iter_mut().chain(a.responses.iter_mut()))
        {
            let trimmed = payload.body.trim_end_matches('\n').len();
            payload.body.truncate(trimmed);
            if !payload.body.is_empty() {
                payload.body.push('\n');
            }
        }

        if !self.flags.export_sourcemap {
            self.blueprint.clear_source_maps();
        }

        ParseReport {
            error,
            warnings: self.warnings,
            blueprint: self.blueprint,
        }
    }

    fn warn(&mut self, kind: WarningKind, message: impl Into<String>, range: SourceRange) {
        self.warnings
            .push(Diagnostic::warning(kind, message, vec![range]));
    }

    fn resource(&mut self) -> Option<&mut Resource> {
        self.blueprint
            .resource_groups
            .last_mut()
            .and_then(|g| g.resources.last_mut())
    }

    fn action(&mut self) -> Option<&mut Action> {
        self.resource().and_then(|r| r.actions.last_mut())
    }

    fn payload(&mut self) -> Option<&mut Payload> {
        // The most recently opened payload is the last one pushed on either list
        let action = self.action()?;
        let request_is_latest = match (action.requests.last(), action.responses.last()) {
            (Some(request), Some(response)) => {
                request.source_map.first() > response.source_map.first()
            }
            (Some(_), None) => true,
            _ => false,
        };
        if request_is_latest {
            action.requests.last_mut()
        } else {
            action.responses.last_mut()
        }
    }
}

fn heading(text: &str) -> Option<(usize, &str)> {
    let level = text.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &text[level..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim();
    (!title.is_empty()).then_some((level, title))
}

fn list_item(text: &str) -> Option<&str> {
    ["+ ", "- ", "* "]
        .iter()
        .find_map(|marker| text.strip_prefix(marker))
        .map(str::trim)
}

fn payload_signature(item: &str) -> Option<(PayloadKind, &str)> {
    let (keyword, rest) = item.split_once(' ').unwrap_or((item, ""));
    match keyword {
        "Request" => Some((PayloadKind::Request, rest)),
        "Response" => Some((PayloadKind::Response, rest)),
        _ => None,
    }
}

fn metadata(text: &str) -> Option<(&str, &str)> {
    let (name, value) = text.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || name.contains(' ') {
        return None;
    }
    Some((name, value.trim()))
}

fn is_method(word: &str) -> bool {
    HTTP_METHODS.contains(&word)
}

/// `[...]` suffix of a heading, with the text before it.
fn bracketed(title: &str) -> Option<(&str, &str)> {
    let inner = title.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    Some((inner[..open].trim(), inner[open + 1..].trim()))
}

fn resource_signature(title: &str) -> Option<Signature<'_>> {
    let (name, target) = bracketed(title).unwrap_or(("", title));
    if target.starts_with('/') {
        return Some(Signature {
            name,
            method: None,
            uri: Some(target),
        });
    }
    let (method, uri) = target.split_once(' ')?;
    let uri = uri.trim();
    (is_method(method) && uri.starts_with('/')).then_some(Signature {
        name,
        method: Some(method),
        uri: Some(uri),
    })
}

fn action_signature(title: &str) -> Option<Signature<'_>> {
    let (name, method) = bracketed(title).unwrap_or(("", title));
    is_method(method).then_some(Signature {
        name,
        method: Some(method),
        uri: None,
    })
}

fn strip_indent(line: &str, width: usize) -> &str {
    let spaces = line.len() - line.trim_start_matches(' ').len();
    &line[spaces.min(width)..]
}

fn push_body_line(body: &mut String, line: &str) {
    body.push_str(line);
    body.push('\n');
}
