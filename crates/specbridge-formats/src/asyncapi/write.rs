use std::collections::{BTreeMap, HashSet};

use serde_json::{json, Map, Value};
use specbridge_model::{
    synthesize_operation_id, Api, MediaType, Method, Operation, Parameter, ParameterLocation,
    PathItem, Server, Warning,
};

use super::protocol::resolve_protocol;
use super::{Major, SUBSCRIBED_MESSAGE};
use crate::document::{escape_pointer, info_to_value, map_value, put_all, put_opt};
use crate::schema::{schema_to_value, SchemaDialect};
use crate::warnings;
use crate::{AsyncApiVersion, WriteOptions};

const DIALECT: SchemaDialect = SchemaDialect::ASYNCAPI;
const DEFAULT_CONTENT_TYPE: &str = super::DEFAULT_CONTENT_TYPE;

struct Writer<'a> {
    major: Major,
    protocol: Option<&'a str>,
    warnings: &'a mut Vec<Warning>,
    /// `components.messages`, filled as referenced messages are met.
    messages: BTreeMap<String, Value>,
    operation_ids: HashSet<String>,
    channel_ids: HashSet<String>,
}

/// The message side of one IR operation.
struct Payload<'a> {
    content_type: &'a str,
    media: &'a MediaType,
    description: Option<&'a str>,
}

pub(crate) fn write_document(
    api: &Api,
    options: &WriteOptions,
    warnings: &mut Vec<Warning>,
) -> Value {
    let major = match options.asyncapi_version {
        AsyncApiVersion::V2_6 => Major::V2,
        AsyncApiVersion::V3_0 => Major::V3,
    };
    let mut writer = Writer {
        major,
        protocol: options.protocol.as_deref(),
        warnings,
        messages: BTreeMap::new(),
        operation_ids: HashSet::new(),
        channel_ids: HashSet::new(),
    };
    writer.document(api, options.asyncapi_version)
}

/// Channel ID derived from an address: non-alphanumerics become `_`.
pub(crate) fn channel_id(address: &str) -> String {
    let id: String = address
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let id = id.trim_matches('_');
    if id.is_empty() {
        "root".to_string()
    } else {
        id.to_string()
    }
}

/// Claims `base` in `taken`, suffixing `_2`, `_3`, ... until it is free.
fn unique_id(taken: &mut HashSet<String>, base: String) -> String {
    let mut candidate = base.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}_{}", base, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

impl Writer<'_> {
    fn warn(&mut self, code: &str, message: impl Into<String>, location: &str) {
        self.warnings.push(Warning::new(code, message).at(location));
    }

    fn document(&mut self, api: &Api, version: AsyncApiVersion) -> Value {
        let mut doc = Map::new();
        doc.insert("asyncapi".into(), json!(version.as_str()));

        let mut info = info_to_value(&api.info);
        let tags: Vec<Value> = api
            .tags
            .iter()
            .map(|t| {
                let mut tag = Map::new();
                tag.insert("name".into(), json!(t.name));
                put_opt(&mut tag, "description", t.description.clone());
                Value::Object(tag)
            })
            .collect();
        if self.major == Major::V3 && !tags.is_empty() {
            if let Value::Object(obj) = &mut info {
                obj.insert("tags".into(), Value::Array(tags.clone()));
            }
        }
        doc.insert("info".into(), info);

        if !api.servers.is_empty() {
            let servers = api
                .servers
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let name = s.name.clone().unwrap_or_else(|| format!("server{}", i + 1));
                    (name, self.server(s))
                })
                .collect();
            doc.insert("servers".into(), Value::Object(servers));
        }

        let mut channels = Map::new();
        let mut operations = Map::new();
        for (path, item) in &api.paths {
            match self.major {
                Major::V2 => {
                    channels.insert(path.clone(), self.channel_v2(path, item));
                }
                Major::V3 => {
                    let base = item.name.clone().unwrap_or_else(|| channel_id(path));
                    let id = unique_id(&mut self.channel_ids, base);
                    let channel = self.channel_v3(path, &id, item, &mut operations);
                    channels.insert(id, channel);
                }
            }
        }
        doc.insert("channels".into(), Value::Object(channels));
        if self.major == Major::V3 && !operations.is_empty() {
            doc.insert("operations".into(), Value::Object(operations));
        }

        if !api.webhooks.is_empty() {
            self.warn(
                warnings::DROPPED_WEBHOOKS,
                format!("{} webhook(s) cannot be expressed in AsyncAPI", api.webhooks.len()),
                "webhooks",
            );
        }

        let mut components = Map::new();
        if !api.components.schemas.is_empty() {
            let schemas = api
                .components
                .schemas
                .iter()
                .map(|(name, s)| (name.clone(), schema_to_value(s, DIALECT)))
                .collect();
            components.insert("schemas".into(), Value::Object(schemas));
        }
        if !self.messages.is_empty() {
            components.insert("messages".into(), map_value(&self.messages));
        }
        if !api.components.security_schemes.is_empty() {
            components.insert(
                "securitySchemes".into(),
                map_value(&api.components.security_schemes),
            );
        }
        if !components.is_empty() {
            doc.insert("components".into(), Value::Object(components));
        }

        if self.major == Major::V2 && !tags.is_empty() {
            doc.insert("tags".into(), Value::Array(tags));
        }
        put_all(&mut doc, &api.extensions);
        Value::Object(doc)
    }

    fn server(&self, server: &Server) -> Value {
        let protocol = resolve_protocol(server, self.protocol);
        let mut obj = Map::new();
        match self.major {
            Major::V2 => {
                obj.insert("url".into(), json!(server.url));
            }
            Major::V3 => {
                let rest = server
                    .url
                    .split_once("://")
                    .map(|(_, rest)| rest)
                    .unwrap_or(&server.url);
                let (host, pathname) = match rest.find('/') {
                    Some(idx) => (&rest[..idx], &rest[idx..]),
                    None => (rest, ""),
                };
                obj.insert("host".into(), json!(host));
                if !pathname.is_empty() {
                    obj.insert("pathname".into(), json!(pathname));
                }
            }
        }
        obj.insert("protocol".into(), json!(protocol));
        put_opt(&mut obj, "protocolVersion", server.protocol_version.clone());
        put_opt(&mut obj, "description", server.description.clone());
        if !server.variables.is_empty() {
            let vars = server
                .variables
                .iter()
                .map(|(name, v)| {
                    let mut var = Map::new();
                    if !v.enum_values.is_empty() {
                        var.insert("enum".into(), json!(v.enum_values));
                    }
                    var.insert("default".into(), json!(v.default));
                    put_opt(&mut var, "description", v.description.clone());
                    (name.clone(), Value::Object(var))
                })
                .collect();
            obj.insert("variables".into(), Value::Object(vars));
        }
        if !server.bindings.is_empty() {
            obj.insert("bindings".into(), map_value(&server.bindings));
        }
        Value::Object(obj)
    }

    /// Channel parameters: path-level ones plus any operation path
    /// parameters. Other locations have no pub/sub equivalent.
    fn channel_parameters(&mut self, path: &str, item: &PathItem) -> Map<String, Value> {
        let mut params: Vec<&Parameter> = item
            .parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
            .collect();
        for (method, op) in item.operations() {
            for p in &op.parameters {
                if p.location != ParameterLocation::Path {
                    self.warn(
                        warnings::LOSSY_MAPPING,
                        format!("{} parameter '{}' dropped", p.location.as_str(), p.name),
                        &format!("{} {}", method, path),
                    );
                } else if !params.iter().any(|q| q.name == p.name) {
                    params.push(p);
                }
            }
        }

        let mut out = Map::new();
        for p in params {
            let mut obj = Map::new();
            put_opt(&mut obj, "description", p.description.clone());
            match self.major {
                Major::V2 => {
                    if let Some(schema) = &p.schema {
                        obj.insert("schema".into(), schema_to_value(schema, DIALECT));
                    }
                }
                Major::V3 => {
                    if let Some(schema) = &p.schema {
                        if !schema.enum_values.is_empty() {
                            obj.insert("enum".into(), Value::Array(schema.enum_values.clone()));
                        }
                        put_opt(&mut obj, "default", schema.default.clone());
                    }
                    if let Some(example) = &p.example {
                        obj.insert("examples".into(), json!([example]));
                    }
                }
            }
            out.insert(p.name.clone(), Value::Object(obj));
        }
        out
    }

    fn channel_v2(&mut self, path: &str, item: &PathItem) -> Value {
        let mut obj = Map::new();
        put_opt(&mut obj, "description", item.description.clone());
        let params = self.channel_parameters(path, item);
        if !params.is_empty() {
            obj.insert("parameters".into(), Value::Object(params));
        }

        for (method, op) in item.operations() {
            let location = format!("{} {}", method, path);
            let key = match method {
                Method::Post => "publish",
                Method::Get => "subscribe",
                _ => {
                    self.drop_operation(method, &location);
                    continue;
                }
            };
            let op_id = self.operation_id(op, method, path);
            let mut entry = Map::new();
            entry.insert("operationId".into(), json!(op_id));
            entry.extend(self.operation_fields(op));
            if let Some(payload) = payload_of(method, op) {
                let message = self.message(&format!("{}Message", op_id), &payload);
                entry.insert("message".into(), message);
            }
            obj.insert(key.into(), Value::Object(entry));
        }

        if !item.bindings.is_empty() {
            obj.insert("bindings".into(), map_value(&item.bindings));
        }
        Value::Object(obj)
    }

    fn channel_v3(
        &mut self,
        path: &str,
        id: &str,
        item: &PathItem,
        operations: &mut Map<String, Value>,
    ) -> Value {
        let mut obj = Map::new();
        obj.insert("address".into(), json!(path));
        put_opt(&mut obj, "summary", item.summary.clone());
        put_opt(&mut obj, "description", item.description.clone());

        let channel_ref = format!("#/channels/{}", escape_pointer(id));
        let mut messages = Map::new();
        for (method, op) in item.operations() {
            let location = format!("{} {}", method, path);
            let action = match method {
                Method::Post => "send",
                Method::Get => "receive",
                _ => {
                    self.drop_operation(method, &location);
                    continue;
                }
            };
            let op_id = self.operation_id(op, method, path);
            let mut entry = Map::new();
            entry.insert("action".into(), json!(action));
            entry.insert("channel".into(), json!({ "$ref": channel_ref }));
            entry.extend(self.operation_fields(op));

            if let Some(payload) = payload_of(method, op) {
                let name = payload
                    .media
                    .schema
                    .as_ref()
                    .and_then(|s| s.ref_name())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}Message", op_id));
                let message = self.message(&name, &payload);
                messages.insert(name.clone(), message);
                entry.insert(
                    "messages".into(),
                    json!([{ "$ref": format!("{}/messages/{}", channel_ref, escape_pointer(&name)) }]),
                );
            }
            operations.insert(op_id, Value::Object(entry));
        }

        if !messages.is_empty() {
            obj.insert("messages".into(), Value::Object(messages));
        }
        let params = self.channel_parameters(path, item);
        if !params.is_empty() {
            obj.insert("parameters".into(), Value::Object(params));
        }
        if !item.bindings.is_empty() {
            obj.insert("bindings".into(), map_value(&item.bindings));
        }
        Value::Object(obj)
    }

    fn drop_operation(&mut self, method: Method, location: &str) {
        self.warn(
            warnings::DROPPED_OPERATION,
            format!("{} has no pub/sub equivalent", method),
            location,
        );
    }

    /// The operation's ID, or one synthesized from verb and path; unique
    /// across the written document.
    fn operation_id(&mut self, op: &Operation, method: Method, path: &str) -> String {
        let base = op
            .operation_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| synthesize_operation_id(method, path));
        unique_id(&mut self.operation_ids, base)
    }

    fn operation_fields(&self, op: &Operation) -> Map<String, Value> {
        let mut obj = Map::new();
        put_opt(&mut obj, "summary", op.summary.clone());
        put_opt(&mut obj, "description", op.description.clone());
        if !op.tags.is_empty() {
            let tags: Vec<Value> = op.tags.iter().map(|t| json!({ "name": t })).collect();
            obj.insert("tags".into(), Value::Array(tags));
        }
        if !op.bindings.is_empty() {
            obj.insert("bindings".into(), map_value(&op.bindings));
        }
        put_all(&mut obj, &op.extensions);
        obj
    }

    /// A message object. A payload that references a component schema is
    /// registered under `components.messages` and referenced from here.
    fn message(&mut self, fallback_name: &str, payload: &Payload<'_>) -> Value {
        let mut obj = Map::new();
        obj.insert("contentType".into(), json!(payload.content_type));
        if let Some(description) = payload.description {
            obj.insert("description".into(), json!(description));
        }

        if let Some(name) = payload.media.schema.as_ref().and_then(|s| s.ref_name()) {
            let mut component = Map::new();
            component.insert("name".into(), json!(name));
            component.extend(obj);
            component.insert(
                "payload".into(),
                json!({ "$ref": format!("#/components/schemas/{}", escape_pointer(name)) }),
            );
            self.messages
                .entry(name.to_string())
                .or_insert(Value::Object(component));
            return json!({ "$ref": format!("#/components/messages/{}", escape_pointer(name)) });
        }

        if let Some(schema) = &payload.media.schema {
            obj.insert("payload".into(), schema_to_value(schema, DIALECT));
        }
        if let Some(example) = &payload.media.example {
            obj.insert("examples".into(), json!([{ "payload": example }]));
        }
        if self.major == Major::V3 {
            obj.insert("name".into(), json!(fallback_name));
        }
        Value::Object(obj)
    }
}

/// Where the message lives: the request body for POST, a success response
/// for GET.
fn payload_of(method: Method, op: &Operation) -> Option<Payload<'_>> {
    let (content, description) = match method {
        Method::Post => {
            let body = op.request_body.as_ref()?;
            (&body.content, body.description.as_deref())
        }
        _ => {
            let response = op
                .responses
                .get("200")
                .or_else(|| {
                    op.responses
                        .iter()
                        .find(|(code, _)| code.starts_with('2'))
                        .map(|(_, r)| r)
                })
                .or_else(|| op.responses.get("default"))
                .or_else(|| op.responses.values().next())?;
            let description = Some(response.description.as_str())
                .filter(|d| !d.is_empty() && *d != SUBSCRIBED_MESSAGE);
            (&response.content, description)
        }
    };
    let (content_type, media) = preferred(content)?;
    Some(Payload {
        content_type,
        media,
        description,
    })
}

fn preferred(content: &BTreeMap<String, MediaType>) -> Option<(&str, &MediaType)> {
    content
        .get_key_value(DEFAULT_CONTENT_TYPE)
        .or_else(|| content.iter().next())
        .map(|(k, m)| (k.as_str(), m))
}
