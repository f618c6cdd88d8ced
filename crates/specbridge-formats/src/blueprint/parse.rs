//! Single forward pass over Blueprint lines with local lookahead.
//!
//! Indentation is fixed-width: nested section markers sit 4 spaces under
//! their Request/Response marker, Attributes properties exactly 8, literal
//! bodies at least 8 (12 under `+ Body`). Data Structures properties start
//! at column 0. Bullets at any other indent are skipped.

use serde_json::Value;
use specbridge_model::{
    Api, MediaType, Method, Operation, Parameter, ParameterLocation, Schema, Server, Tag, Warning,
    PRIMITIVE_TYPES,
};

use super::property::{bullet_text, example_value, parse_property, Property};
use super::{DEFAULT_FORMAT, DEFAULT_MEDIA_TYPE};
use crate::error::ParseError;
use crate::schema::schema_from_value;
use crate::warnings;

type PropertyTree = Vec<(Property, Vec<Property>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Resources,
    DataStructures,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload {
    Request,
    Response,
}

struct Resource {
    path: String,
    query: Vec<String>,
}

struct Action {
    method: Method,
    operation: Operation,
}

struct NamedType {
    name: String,
    kind: Option<String>,
    description: Vec<String>,
    properties: PropertyTree,
}

pub(crate) fn read_document(text: &str) -> Result<(Api, Vec<Warning>), ParseError> {
    Reader::new(text).run()
}

struct Reader {
    lines: Vec<String>,
    pos: usize,
    api: Api,
    warnings: Vec<Warning>,
    format: Option<String>,
    title: Option<String>,
    seen_heading: bool,
    section: Section,
    group: Option<String>,
    resource: Option<Resource>,
    action: Option<Action>,
    named_type: Option<NamedType>,
}

impl Reader {
    fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(|l| l.replace('\t', "    ")).collect(),
            pos: 0,
            api: Api::default(),
            warnings: Vec::new(),
            format: None,
            title: None,
            seen_heading: false,
            section: Section::Resources,
            group: None,
            resource: None,
            action: None,
            named_type: None,
        }
    }

    fn run(mut self) -> Result<(Api, Vec<Warning>), ParseError> {
        while let Some(line) = self.lines.get(self.pos).cloned() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                self.pos += 1;
                continue;
            }
            let indent = indent_of(&line);

            if !self.seen_heading && self.metadata(trimmed) {
                self.pos += 1;
                continue;
            }
            if indent < 4 && trimmed.starts_with('#') {
                self.heading(trimmed);
                self.pos += 1;
                continue;
            }
            if let Some(text) = bullet_text(trimmed) {
                self.bullet(text, indent);
                continue;
            }
            self.describe(trimmed);
            self.pos += 1;
        }
        self.close_resource();
        self.close_named_type();

        let title = self.title.take().ok_or(ParseError::MissingTitle)?;
        self.api.info.title = title;
        self.api.version = self.format.take().unwrap_or_else(|| DEFAULT_FORMAT.to_string());
        Ok((self.api, self.warnings))
    }

    fn warn(&mut self, code: &str, message: impl Into<String>) {
        let location = format!("line {}", self.pos + 1);
        self.warnings.push(Warning::new(code, message).at(location));
    }

    /// `FORMAT:` and `HOST:` lines. Anything else is prose.
    fn metadata(&mut self, trimmed: &str) -> bool {
        let Some((key, value)) = trimmed.split_once(':') else {
            return false;
        };
        let value = value.trim();
        match key.trim().to_ascii_uppercase().as_str() {
            "FORMAT" => self.format = Some(value.to_string()),
            "HOST" => {
                if !value.is_empty() {
                    self.api.servers.push(Server::new(value));
                }
            }
            _ => return false,
        }
        true
    }

    // Headings

    fn heading(&mut self, trimmed: &str) {
        self.seen_heading = true;
        let level = trimmed.chars().take_while(|c| *c == '#').count();
        let text = trimmed[level..].trim().trim_end_matches('#').trim();

        if level == 1 {
            if let Some(name) = text.strip_prefix("Group ") {
                self.open_group(name.trim());
                return;
            }
            if text == "Data Structures" {
                self.close_resource();
                self.close_named_type();
                self.section = Section::DataStructures;
                self.group = None;
                return;
            }
            if self.title.is_none() {
                self.title = Some(text.to_string());
                return;
            }
        }

        if self.section == Section::DataStructures {
            if level == 2 {
                self.open_named_type(text);
            }
            return;
        }

        if level <= 3 {
            if let Some((name, target)) = split_target(text) {
                self.target_heading(name, target);
            }
        }
    }

    fn open_group(&mut self, name: &str) {
        self.close_resource();
        self.close_named_type();
        self.section = Section::Resources;
        self.group = Some(name.to_string());
        if !self.api.tags.iter().any(|t| t.name == name) {
            self.api.tags.push(Tag {
                name: name.to_string(),
                description: None,
            });
        }
    }

    /// `name [uri]`, `name [VERB]` or `name [VERB uri]`.
    fn target_heading(&mut self, name: &str, target: &str) {
        let mut tokens = target.split_whitespace();
        let first = tokens.next().unwrap_or_default();
        let method = first
            .chars()
            .all(|c| c.is_ascii_uppercase())
            .then(|| first.parse::<Method>().ok())
            .flatten();

        match method {
            None => self.open_resource(name, target),
            Some(method) => {
                if let Some(uri) = tokens.next() {
                    let (path, _) = split_uri(uri);
                    if self.resource.as_ref().map(|r| r.path.as_str()) != Some(path.as_str()) {
                        self.open_resource("", uri);
                    }
                }
                self.open_action(name, method);
            }
        }
    }

    fn open_resource(&mut self, name: &str, uri: &str) {
        self.close_resource();
        let (path, query) = split_uri(uri);
        let item = self.api.path_entry(&path);
        if !name.is_empty() && name != path && name != uri {
            item.summary = Some(name.to_string());
        }
        self.resource = Some(Resource { path, query });
    }

    fn open_action(&mut self, name: &str, method: Method) {
        self.close_action();
        if self.resource.is_none() {
            self.warn(
                warnings::UNSUPPORTED_CONSTRUCT,
                format!("action '{}' outside of a resource ignored", name),
            );
            return;
        }
        self.action = Some(Action {
            method,
            operation: Operation {
                summary: (!name.is_empty()).then(|| name.to_string()),
                tags: self.group.iter().cloned().collect(),
                ..Operation::default()
            },
        });
    }

    fn close_action(&mut self) {
        let (Some(action), Some(resource)) = (self.action.take(), self.resource.as_ref()) else {
            return;
        };
        let replaced = self
            .api
            .path_entry(&resource.path)
            .set_operation(action.method, action.operation)
            .is_some();
        if replaced {
            let message = format!(
                "second {} action on {} replaces the first",
                action.method, resource.path
            );
            self.warn(warnings::DROPPED_OPERATION, message);
        }
    }

    fn close_resource(&mut self) {
        self.close_action();
        self.resource = None;
    }

    fn open_named_type(&mut self, text: &str) {
        self.close_named_type();
        let (name, kind) = match text.strip_suffix(')').and_then(|t| t.rsplit_once('(')) {
            Some((name, kind)) => (name.trim(), Some(kind.trim().to_string())),
            None => (text, None),
        };
        self.named_type = Some(NamedType {
            name: name.to_string(),
            kind: kind.filter(|k| !k.is_empty()),
            description: Vec::new(),
            properties: Vec::new(),
        });
    }

    fn close_named_type(&mut self) {
        let Some(named) = self.named_type.take() else {
            return;
        };
        let mut schema = typed_schema(named.kind.as_deref(), &named.properties);
        if !named.description.is_empty() {
            schema.description = Some(named.description.join("\n"));
        }
        self.api.add_schema(named.name, schema);
    }

    // Free text

    fn describe(&mut self, trimmed: &str) {
        if self.section == Section::DataStructures {
            if let Some(named) = self.named_type.as_mut() {
                named.description.push(trimmed.to_string());
            }
            return;
        }
        if let Some(action) = self.action.as_mut() {
            append(&mut action.operation.description, trimmed);
        } else if let Some(resource) = self.resource.as_ref() {
            append(&mut self.api.path_entry(&resource.path).description, trimmed);
        } else if let Some(group) = self.group.as_deref() {
            if let Some(tag) = self.api.tags.iter_mut().find(|t| t.name == group) {
                append(&mut tag.description, trimmed);
            }
        } else {
            append(&mut self.api.info.description, trimmed);
        }
    }

    // Bullet blocks

    fn bullet(&mut self, text: &str, indent: usize) {
        if self.section == Section::DataStructures {
            if indent == 0 && self.named_type.is_some() {
                let properties = self.property_block(0);
                if let Some(named) = self.named_type.as_mut() {
                    named.properties.extend(properties);
                }
            } else {
                self.skip_block(indent);
            }
            return;
        }

        match text.split_whitespace().next().unwrap_or_default() {
            "Parameters" => self.parameters(indent),
            "Request" => self.payload(Payload::Request, &text["Request".len()..], indent),
            "Response" => self.payload(Payload::Response, &text["Response".len()..], indent),
            _ => self.skip_block(indent),
        }
    }

    /// Skip the current line and everything indented deeper than it.
    fn skip_block(&mut self, indent: usize) {
        self.pos += 1;
        while let Some(line) = self.lines.get(self.pos) {
            if !line.trim().is_empty() && indent_of(line) <= indent {
                break;
            }
            self.pos += 1;
        }
    }

    /// Property bullets at exactly `indent`, members at `indent + 4`.
    /// Starts at the current line; stops at a non-bullet or shallower line.
    fn property_block(&mut self, indent: usize) -> PropertyTree {
        let mut tree: PropertyTree = Vec::new();
        while let Some(line) = self.lines.get(self.pos) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                self.pos += 1;
                continue;
            }
            let depth = indent_of(line);
            let Some(text) = bullet_text(trimmed) else {
                break;
            };
            if depth < indent {
                break;
            }
            if depth == indent {
                if let Some(property) = parse_property(text) {
                    tree.push((property, Vec::new()));
                }
            } else if depth == indent + 4 {
                if let (Some(member), Some((_, members))) = (parse_property(text), tree.last_mut()) {
                    members.push(member);
                }
            }
            self.pos += 1;
        }
        tree
    }

    /// Lines indented at least `indent` after the marker line, dedented.
    fn literal(&mut self, indent: usize) -> String {
        self.pos += 1;
        let mut body = Vec::new();
        while let Some(line) = self.lines.get(self.pos) {
            if line.trim().is_empty() {
                body.push(String::new());
            } else if indent_of(line) >= indent {
                body.push(line[indent..].to_string());
            } else {
                break;
            }
            self.pos += 1;
        }
        join_block(body)
    }

    fn parameters(&mut self, indent: usize) {
        self.pos += 1;
        let mut found = Vec::new();
        while let Some(line) = self.lines.get(self.pos) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                self.pos += 1;
                continue;
            }
            let depth = indent_of(line);
            if depth <= indent {
                break;
            }
            let Some(text) = bullet_text(trimmed) else {
                break;
            };
            if depth == indent + 4 {
                found.extend(parse_property(text));
            }
            self.pos += 1;
        }

        for property in found {
            let parameter = self.parameter(&property);
            if let Some(action) = self.action.as_mut() {
                upsert(&mut action.operation.parameters, parameter);
            } else if let Some(resource) = self.resource.as_ref() {
                upsert(&mut self.api.path_entry(&resource.path).parameters, parameter);
            } else {
                self.warn(
                    warnings::UNSUPPORTED_CONSTRUCT,
                    format!("parameter '{}' outside of a resource ignored", property.name),
                );
            }
        }
    }

    fn parameter(&self, property: &Property) -> Parameter {
        let in_path = self.resource.as_ref().is_some_and(|r| {
            r.path.contains(&format!("{{{}}}", property.name))
                && !r.query.iter().any(|q| q == &property.name)
        });
        let mut schema = property.to_schema(&[]);
        if schema.schema_type.is_none() && !schema.is_ref() {
            schema.schema_type = Some("string".to_string());
        }
        Parameter {
            name: property.name.clone(),
            location: if in_path {
                ParameterLocation::Path
            } else {
                ParameterLocation::Query
            },
            description: schema.description.take(),
            required: property.required || in_path,
            example: schema.example.take(),
            schema: Some(schema),
            ..Parameter::default()
        }
    }

    fn payload(&mut self, kind: Payload, header: &str, indent: usize) {
        let (head, media) = split_media(header);
        let nested = indent + 4;
        let direct = indent + 8;
        self.pos += 1;

        let mut body: Vec<String> = Vec::new();
        let mut explicit_body: Option<String> = None;
        let mut attributes: Option<Schema> = None;
        let mut schema_text: Option<String> = None;

        while let Some(line) = self.lines.get(self.pos) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                if !body.is_empty() {
                    body.push(String::new());
                }
                self.pos += 1;
                continue;
            }
            let depth = indent_of(line);
            if depth >= direct {
                body.push(line[direct..].to_string());
                self.pos += 1;
                continue;
            }
            if depth < nested {
                break;
            }
            let Some(section) = bullet_text(trimmed) else {
                break;
            };
            let section = section.to_string();
            match section.split_whitespace().next().unwrap_or_default() {
                "Attributes" => {
                    let kind = section["Attributes".len()..]
                        .trim()
                        .strip_prefix('(')
                        .and_then(|k| k.strip_suffix(')'))
                        .map(|k| k.trim().to_string());
                    self.pos += 1;
                    let properties = self.property_block(direct);
                    attributes = Some(typed_schema(kind.as_deref(), &properties));
                }
                "Body" => explicit_body = Some(self.literal(nested + 8)),
                "Schema" => schema_text = Some(self.literal(nested + 8)),
                _ => self.skip_block(depth),
            }
        }

        let body = explicit_body.or_else(|| Some(join_block(body))).filter(|b| !b.is_empty());
        let mut content = MediaType::default();
        if let Some(schema) = attributes {
            content.schema = Some(schema);
            if body.is_some() {
                self.warn(
                    warnings::LOSSY_MAPPING,
                    "body example next to Attributes ignored",
                );
            }
        } else {
            if let Some(text) = schema_text {
                match serde_json::from_str::<Value>(&text) {
                    Ok(value) => content.schema = Some(schema_from_value(&value)),
                    Err(e) => self.warn(
                        warnings::UNSUPPORTED_CONSTRUCT,
                        format!("Schema section is not JSON: {}", e),
                    ),
                }
            }
            content.example = body.map(|text| body_example(&text, media.as_deref()));
        }

        let has_content = content.schema.is_some() || content.example.is_some();
        let media = media.or_else(|| has_content.then(|| DEFAULT_MEDIA_TYPE.to_string()));

        if self.action.is_none() {
            self.warn(
                warnings::UNSUPPORTED_CONSTRUCT,
                "request or response outside of an action ignored",
            );
            return;
        }
        let Some(action) = self.action.as_mut() else {
            return;
        };
        let operation = &mut action.operation;
        match kind {
            Payload::Request => {
                let request = operation.request_body.get_or_insert_with(Default::default);
                if let Some(media) = media {
                    request.content.insert(media, content);
                }
            }
            Payload::Response => {
                let code = head.split_whitespace().next().unwrap_or("200").to_string();
                let response = operation.responses.entry(code).or_default();
                if let Some(media) = media {
                    response.content.insert(media, content);
                }
            }
        }
    }
}

/// Build a schema from a type head and its property bullets.
///
/// Heads: `object` (the default), `enum` (bullets are values), `array`,
/// `array[Name]`, a primitive, or any other name taken as a base type.
fn typed_schema(kind: Option<&str>, properties: &PropertyTree) -> Schema {
    let object = || {
        let mut schema = Schema::typed("object");
        for (property, members) in properties {
            schema.insert_property(property.name.clone(), property.to_schema(members), property.required);
        }
        schema
    };

    match kind {
        None | Some("object") => object(),
        Some(kind) if kind == "enum" || kind.starts_with("enum[") => {
            let inner = kind
                .strip_prefix("enum[")
                .and_then(|k| k.strip_suffix(']'))
                .filter(|k| PRIMITIVE_TYPES.contains(k))
                .unwrap_or("string");
            let mut schema = Schema::typed(inner);
            schema.enum_values = properties
                .iter()
                .map(|(p, _)| example_value(&p.name, Some(inner)))
                .collect();
            schema
        }
        Some(kind) => {
            if let Some(items) = kind.strip_prefix("array[").and_then(|k| k.strip_suffix(']')) {
                Schema::array_of(Schema::reference(items.trim()))
            } else if PRIMITIVE_TYPES.contains(&kind) {
                Schema::typed(kind)
            } else if properties.is_empty() {
                Schema::reference(kind)
            } else {
                Schema {
                    all_of: vec![Schema::reference(kind), object()],
                    ..Schema::default()
                }
            }
        }
    }
}

fn upsert(list: &mut Vec<Parameter>, parameter: Parameter) {
    list.retain(|p| !(p.name == parameter.name && p.location == parameter.location));
    list.push(parameter);
}

fn body_example(text: &str, media: Option<&str>) -> Value {
    let json_like = media.map_or(true, |m| m.contains("json"));
    if json_like {
        if let Ok(value) = serde_json::from_str(text) {
            return value;
        }
    }
    Value::String(text.to_string())
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn append(target: &mut Option<String>, line: &str) {
    match target {
        Some(text) => {
            text.push('\n');
            text.push_str(line);
        }
        None => *target = Some(line.to_string()),
    }
}

fn join_block(mut lines: Vec<String>) -> String {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let start = lines.iter().position(|l| !l.trim().is_empty()).unwrap_or(lines.len());
    lines[start..].join("\n")
}

/// Split `name [target]` into its parts.
fn split_target(text: &str) -> Option<(&str, &str)> {
    let inner = text.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    Some((inner[..open].trim(), inner[open + 1..].trim()))
}

/// Strip `{?a,b}` query expansions from a URI template.
fn split_uri(uri: &str) -> (String, Vec<String>) {
    let mut path = String::with_capacity(uri.len());
    let mut query = Vec::new();
    let mut rest = uri;
    while let Some(start) = rest.find("{?").or_else(|| rest.find("{&")) {
        path.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('}') else {
            rest = "";
            break;
        };
        query.extend(
            rest[start + 2..start + end]
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        );
        rest = &rest[start + end + 1..];
    }
    path.push_str(rest);
    if path.is_empty() {
        path.push('/');
    }
    (path, query)
}

/// Split a trailing `(media/type)` off a marker header.
fn split_media(header: &str) -> (&str, Option<String>) {
    let header = header.trim();
    match header.strip_suffix(')').and_then(|h| h.rsplit_once('(')) {
        Some((head, media)) if !media.trim().is_empty() => (head.trim(), Some(media.trim().to_string())),
        _ => (header, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_query_expansion_is_stripped() {
        assert_eq!(
            split_uri("/notes{?limit,offset}"),
            ("/notes".to_string(), vec!["limit".to_string(), "offset".to_string()])
        );
        assert_eq!(split_uri("/notes/{id}").0, "/notes/{id}");
        assert_eq!(split_uri("").0, "/");
    }

    #[test]
    fn target_and_media_splitting() {
        assert_eq!(split_target("Notes [/notes]"), Some(("Notes", "/notes")));
        assert_eq!(split_target("List [GET]"), Some(("List", "GET")));
        assert_eq!(split_target("Plain heading"), None);
        assert_eq!(
            split_media(" 200 (application/json)"),
            ("200", Some("application/json".to_string()))
        );
        assert_eq!(split_media(" 204"), ("204", None));
    }

    #[test]
    fn join_block_trims_blank_edges() {
        let lines = vec!["".into(), "a".into(), "".into(), "b".into(), "".into()];
        assert_eq!(join_block(lines), "a\n\nb");
    }
}
