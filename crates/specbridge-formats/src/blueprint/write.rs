//! Deterministic Blueprint rendering.
//!
//! Order: metadata, title, description, ungrouped resources, groups by
//! name, Data Structures. Paths and schema names come out sorted.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use specbridge_model::{
    Api, MediaType, Method, Operation, Parameter, ParameterLocation, PathItem, Schema, Warning,
};

use super::property::{example_text, format_property, kind_token};
use super::DEFAULT_FORMAT;
use crate::warnings;

pub(crate) fn write_document(api: &Api, warnings: &mut Vec<Warning>) -> String {
    let mut writer = Writer {
        out: String::new(),
        warnings,
    };
    writer.document(api);
    writer.out
}

struct Writer<'w> {
    out: String,
    warnings: &'w mut Vec<Warning>,
}

impl Writer<'_> {
    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn text_block(&mut self, text: Option<&str>) {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return;
        };
        for line in text.lines() {
            self.line(line.trim_end());
        }
        self.blank();
    }

    fn warn(&mut self, code: &str, message: impl Into<String>, location: &str) {
        self.warnings.push(Warning::new(code, message).at(location));
    }

    fn document(&mut self, api: &Api) {
        self.line(&format!("FORMAT: {}", DEFAULT_FORMAT));
        if let Some(server) = api.servers.first() {
            self.line(&format!("HOST: {}", server.url));
        }
        if api.servers.len() > 1 {
            self.warn(
                warnings::LOSSY_MAPPING,
                "only the first server is written as HOST",
                "servers",
            );
        }
        self.blank();

        self.line(&format!("# {}", api.info.title));
        self.blank();
        self.text_block(api.info.description.as_deref());

        let mut ungrouped: Vec<(&String, &PathItem)> = Vec::new();
        let mut groups: BTreeMap<&str, Vec<(&String, &PathItem)>> = BTreeMap::new();
        for (path, item) in &api.paths {
            let group = item
                .first_operation()
                .and_then(|op| op.tags.first())
                .map(String::as_str);
            match group {
                Some(group) => groups.entry(group).or_default().push((path, item)),
                None => ungrouped.push((path, item)),
            }
        }

        for (path, item) in ungrouped {
            self.resource(path, item);
        }
        for (group, resources) in groups {
            self.line(&format!("# Group {}", group));
            self.blank();
            let description = api
                .tags
                .iter()
                .find(|t| t.name == group)
                .and_then(|t| t.description.as_deref());
            self.text_block(description);
            for (path, item) in resources {
                self.resource(path, item);
            }
        }

        self.dropped(api);
        self.data_structures(api);
    }

    fn dropped(&mut self, api: &Api) {
        if !api.webhooks.is_empty() {
            self.warn(
                warnings::DROPPED_WEBHOOKS,
                format!("{} webhook(s) not expressible in Blueprint", api.webhooks.len()),
                "webhooks",
            );
        }
        let components = &api.components;
        if !components.responses.is_empty()
            || !components.parameters.is_empty()
            || !components.request_bodies.is_empty()
            || !components.security_schemes.is_empty()
        {
            self.warn(
                warnings::LOSSY_MAPPING,
                "reusable responses, parameters, request bodies and security schemes are not written",
                "components",
            );
        }
        if !api.extensions.is_empty() {
            self.warn(
                warnings::DROPPED_EXTENSION,
                "document extensions dropped",
                "",
            );
        }
    }

    fn resource(&mut self, path: &str, item: &PathItem) {
        let mut query: Vec<&str> = Vec::new();
        let all_parameters = item
            .parameters
            .iter()
            .chain(item.operations().flat_map(|(_, op)| op.parameters.iter()));
        for parameter in all_parameters {
            if parameter.location == ParameterLocation::Query && !query.contains(&parameter.name.as_str()) {
                query.push(&parameter.name);
            }
        }
        let mut uri = path.to_string();
        if !query.is_empty() {
            let _ = write!(uri, "{{?{}}}", query.join(","));
        }

        let name = item.summary.as_deref().unwrap_or(path);
        self.line(&format!("## {} [{}]", name, uri));
        self.blank();
        self.text_block(item.description.as_deref());
        self.parameters(&item.parameters, path);
        if !item.bindings.is_empty() {
            self.warn(warnings::LOSSY_MAPPING, "channel bindings dropped", path);
        }

        for (method, operation) in item.operations() {
            self.action(path, method, operation);
        }
    }

    fn action(&mut self, path: &str, method: Method, operation: &Operation) {
        let location = format!("{} {}", method, path);
        let name = operation
            .summary
            .clone()
            .or_else(|| operation.operation_id.clone())
            .unwrap_or_else(|| location.clone());
        self.line(&format!("### {} [{}]", name, method.as_upper()));
        self.blank();
        self.text_block(operation.description.as_deref());
        self.parameters(&operation.parameters, &location);

        if !operation.bindings.is_empty() {
            self.warn(warnings::LOSSY_MAPPING, "operation bindings dropped", &location);
        }
        if !operation.extensions.is_empty() {
            self.warn(warnings::DROPPED_EXTENSION, "operation extensions dropped", &location);
        }

        if let Some(body) = &operation.request_body {
            for (media, content) in &body.content {
                self.line(&format!("+ Request ({})", media));
                self.blank();
                self.payload(content, &location);
            }
        }
        for (code, response) in &operation.responses {
            if response.content.is_empty() {
                self.line(&format!("+ Response {}", code));
                self.blank();
            }
            for (media, content) in &response.content {
                self.line(&format!("+ Response {} ({})", code, media));
                self.blank();
                self.payload(content, &location);
            }
        }
    }

    fn parameters(&mut self, parameters: &[Parameter], location: &str) {
        let mut lines = Vec::new();
        for parameter in parameters {
            if matches!(
                parameter.location,
                ParameterLocation::Header | ParameterLocation::Cookie
            ) {
                self.warn(
                    warnings::LOSSY_MAPPING,
                    format!(
                        "{} parameter '{}' dropped",
                        parameter.location.as_str(),
                        parameter.name
                    ),
                    location,
                );
                continue;
            }
            let mut schema = parameter.schema.clone().unwrap_or_else(|| Schema::typed("string"));
            if schema.description.is_none() {
                schema.description = parameter.description.clone();
            }
            if parameter.example.is_some() {
                schema.example = parameter.example.clone();
            }
            lines.push(format_property(&parameter.name, &schema, parameter.required));
        }
        if lines.is_empty() {
            return;
        }
        self.line("+ Parameters");
        for line in lines {
            self.line(&format!("    {}", line));
        }
        self.blank();
    }

    /// Attributes when a schema is known, otherwise a literal body example.
    fn payload(&mut self, content: &MediaType, location: &str) {
        if let Some(schema) = &content.schema {
            let (head, properties) = attribute_head(schema);
            self.line(&format!("    + Attributes ({})", head));
            self.properties(properties, 8);
            self.blank();
            if has_composition(schema) {
                self.warn(
                    warnings::LOSSY_MAPPING,
                    "schema composition flattened in Attributes",
                    location,
                );
            }
        } else if let Some(example) = &content.example {
            let text = match example {
                serde_json::Value::String(s) => s.clone(),
                other => serde_json::to_string_pretty(other).unwrap_or_default(),
            };
            for line in text.lines() {
                if line.trim().is_empty() {
                    self.blank();
                } else {
                    self.line(&format!("        {}", line));
                }
            }
            self.blank();
        }
    }

    /// Property bullets at `indent`, one nested member level below.
    fn properties(&mut self, schema: Option<&Schema>, indent: usize) {
        let Some(schema) = schema else {
            return;
        };
        let pad = " ".repeat(indent);
        let member_pad = " ".repeat(indent + 4);
        for (name, property) in &schema.properties {
            let line = format_property(name, property, schema.is_required(name));
            self.line(&format!("{}{}", pad, line));
            if property.is_ref() {
                continue;
            }
            for (member, member_schema) in &property.properties {
                let line = format_property(member, member_schema, property.is_required(member));
                self.line(&format!("{}{}", member_pad, line));
            }
        }
    }

    fn data_structures(&mut self, api: &Api) {
        if api.components.schemas.is_empty() {
            return;
        }
        self.line("# Data Structures");
        self.blank();
        for (name, schema) in &api.components.schemas {
            let schema = schema.as_ref();
            if !schema.enum_values.is_empty() {
                let kind = match kind_token(schema).as_deref() {
                    Some("number") => "enum[number]",
                    Some("boolean") => "enum[boolean]",
                    _ => "enum",
                };
                self.line(&format!("## {} ({})", name, kind));
                self.blank();
                self.text_block(schema.description.as_deref());
                for value in &schema.enum_values {
                    if let Some(text) = example_text(value) {
                        self.line(&format!("+ {}", text));
                    }
                }
                self.blank();
                continue;
            }

            let (head, properties) = attribute_head(schema);
            self.line(&format!("## {} ({})", name, head));
            self.blank();
            self.text_block(schema.description.as_deref());
            if properties.is_some_and(|p| !p.properties.is_empty()) {
                self.properties(properties, 0);
                self.blank();
            }
            if has_composition(schema) {
                self.warn(
                    warnings::LOSSY_MAPPING,
                    "schema composition flattened",
                    &format!("Data Structures/{}", name),
                );
            }
        }
    }
}

/// The type head of an Attributes block or named type, plus the schema
/// whose properties follow it.
fn attribute_head(schema: &Schema) -> (String, Option<&Schema>) {
    if let Some(name) = schema.ref_name() {
        return (name.to_string(), None);
    }
    if let [base, extension] = schema.all_of.as_slice() {
        if let Some(name) = base.ref_name() {
            return (name.to_string(), Some(extension));
        }
    }
    match schema.schema_type.as_deref() {
        Some("array") | Some("string") | Some("number") | Some("integer") | Some("boolean") => (
            kind_token(schema).unwrap_or_else(|| "object".to_string()),
            None,
        ),
        _ => ("object".to_string(), Some(schema)),
    }
}

fn has_composition(schema: &Schema) -> bool {
    let extends_base = matches!(schema.all_of.as_slice(), [base, _] if base.is_ref());
    (!schema.all_of.is_empty() && !extends_base) || !schema.any_of.is_empty() || !schema.one_of.is_empty()
}
