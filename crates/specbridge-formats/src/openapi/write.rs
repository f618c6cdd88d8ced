use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::{json, Map, Value};
use specbridge_model::{
    Api, MediaType, Operation, Parameter, ParameterLocation, PathItem, RequestBody,
    Response, Schema, Server, Warning,
};

use super::reason_phrase;
use crate::document::{escape_pointer, info_to_value, map_value, put_all, put_opt};
use crate::schema::{schema_to_value, SchemaDialect};
use crate::warnings;
use crate::{OpenApiVersion, WriteOptions};

const ERROR_SCHEMA: &str = "Error";
const DEFAULT_MEDIA_TYPE: &str = "application/json";
const FORM_MEDIA_TYPES: &[&str] = &["application/x-www-form-urlencoded", "multipart/form-data"];

struct Writer<'a> {
    version: OpenApiVersion,
    dialect: SchemaDialect,
    warnings: &'a mut Vec<Warning>,
}

pub(crate) fn write_document(
    api: &Api,
    options: &WriteOptions,
    warnings: &mut Vec<Warning>,
) -> Value {
    let version = options.openapi_version;
    // Normalization runs on a shallow copy; only touched items are cloned.
    let mut api = api.clone();
    merge_path_keys(&mut api, warnings);
    inject_error_contract(&mut api);

    let dialect = match version {
        OpenApiVersion::V2_0 => SchemaDialect::OPENAPI_2,
        OpenApiVersion::V3_0 => SchemaDialect::OPENAPI_30,
        OpenApiVersion::V3_1 => SchemaDialect::OPENAPI_31,
    };
    let dialect = if options.nullable_keywords {
        dialect.with_nullable_keywords()
    } else {
        dialect
    };
    let mut writer = Writer {
        version,
        dialect,
        warnings,
    };
    writer.document(&api)
}

/// Path keys must begin with `/`. Keys that only differ by that prefix
/// (`evt` and `/evt`) are merged into one item; when both define the same
/// verb the slashed key's operation is kept and a warning is recorded.
fn merge_path_keys(api: &mut Api, warnings: &mut Vec<Warning>) {
    if api.paths.keys().all(|k| k.starts_with('/')) {
        return;
    }
    let (slashed, bare): (Vec<_>, Vec<_>) = std::mem::take(&mut api.paths)
        .into_iter()
        .partition(|(path, _)| path.starts_with('/'));
    let mut merged: BTreeMap<String, Arc<PathItem>> = slashed.into_iter().collect();
    for (path, item) in bare {
        let key = format!("/{}", path);
        let target = match merged.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(item);
                continue;
            }
            Entry::Occupied(slot) => Arc::make_mut(slot.into_mut()),
        };
        for (method, op) in item.operations() {
            if target.operation(method).is_some() {
                warnings.push(
                    Warning::new(
                        warnings::LOSSY_MAPPING,
                        format!("duplicate {} operation dropped while merging path keys", method),
                    )
                    .at(&key),
                );
            } else {
                target.set_operation(method, op.clone());
            }
        }
        for param in &item.parameters {
            if !target
                .parameters
                .iter()
                .any(|p| p.name == param.name && p.location == param.location)
            {
                target.parameters.push(param.clone());
            }
        }
        if target.summary.is_none() {
            target.summary = item.summary.clone();
        }
        if target.description.is_none() {
            target.description = item.description.clone();
        }
    }
    api.paths = merged;
}

/// Every document carries an `Error` schema and every operation a 4xx
/// response referencing it.
fn inject_error_contract(api: &mut Api) {
    if !api.has_schema(ERROR_SCHEMA) {
        let mut error = Schema::typed("object");
        error.insert_property(
            "code",
            Schema {
                format: Some("int32".into()),
                ..Schema::typed("integer")
            },
            true,
        );
        error.insert_property("message", Schema::typed("string"), true);
        api.add_schema(ERROR_SCHEMA, error);
    }

    for map in [&mut api.paths, &mut api.webhooks] {
        for item in map.values_mut() {
            let lacking = item
                .operations()
                .any(|(_, op)| !op.has_client_error_response());
            if !lacking {
                continue;
            }
            for (_, op) in std::sync::Arc::make_mut(item).operations_mut() {
                if !op.has_client_error_response() {
                    op.responses.insert(
                        "400".to_string(),
                        Response {
                            description: reason_phrase("400").to_string(),
                            content: BTreeMap::from([(
                                DEFAULT_MEDIA_TYPE.to_string(),
                                MediaType::with_schema(Schema::reference(ERROR_SCHEMA)),
                            )]),
                        },
                    );
                }
            }
        }
    }
}

impl Writer<'_> {
    fn legacy(&self) -> bool {
        self.version == OpenApiVersion::V2_0
    }

    fn warn(&mut self, code: &str, message: impl Into<String>, location: &str) {
        self.warnings.push(Warning::new(code, message).at(location));
    }

    fn document(&mut self, api: &Api) -> Value {
        let mut doc = Map::new();
        if self.legacy() {
            doc.insert("swagger".into(), json!("2.0"));
        } else {
            doc.insert("openapi".into(), json!(self.version.as_str()));
        }
        doc.insert("info".into(), info_to_value(&api.info));

        if self.legacy() {
            self.legacy_servers(&api.servers, &mut doc);
        } else if !api.servers.is_empty() {
            let servers = api.servers.iter().map(server).collect();
            doc.insert("servers".into(), Value::Array(servers));
        }

        if !api.tags.is_empty() {
            let tags = api
                .tags
                .iter()
                .map(|t| {
                    let mut tag = Map::new();
                    tag.insert("name".into(), json!(t.name));
                    put_opt(&mut tag, "description", t.description.clone());
                    Value::Object(tag)
                })
                .collect();
            doc.insert("tags".into(), Value::Array(tags));
        }
        if !api.security.is_empty() {
            doc.insert("security".into(), json!(api.security));
        }

        let mut paths = Map::new();
        for (path, item) in &api.paths {
            paths.insert(path.clone(), self.path_item(item, path));
        }
        doc.insert("paths".into(), Value::Object(paths));

        if !api.webhooks.is_empty() {
            if self.version == OpenApiVersion::V3_1 {
                let mut hooks = Map::new();
                for (name, item) in &api.webhooks {
                    hooks.insert(name.clone(), self.path_item(item, name));
                }
                doc.insert("webhooks".into(), Value::Object(hooks));
            } else {
                self.warn(
                    warnings::DROPPED_WEBHOOKS,
                    format!(
                        "{} webhook(s) cannot be expressed in OpenAPI {}",
                        api.webhooks.len(),
                        self.version.as_str()
                    ),
                    "webhooks",
                );
            }
        }

        if self.legacy() {
            self.legacy_components(api, &mut doc);
        } else {
            self.components(api, &mut doc);
        }

        put_all(&mut doc, &api.extensions);
        Value::Object(doc)
    }

    fn legacy_servers(&mut self, servers: &[Server], doc: &mut Map<String, Value>) {
        let Some(first) = servers.first() else {
            return;
        };
        if servers.len() > 1 {
            self.warn(
                warnings::LOSSY_MAPPING,
                format!(
                    "OpenAPI 2.0 holds one server; kept '{}', dropped {}",
                    first.url,
                    servers.len() - 1
                ),
                "servers",
            );
        }
        let url = expand_variables(first);
        let (scheme, rest) = match url.split_once("://") {
            Some((scheme, rest)) => (Some(scheme.to_string()), rest.to_string()),
            None => (None, url),
        };
        let (host, base_path) = if scheme.is_some() {
            match rest.find('/') {
                Some(idx) => (Some(rest[..idx].to_string()), rest[idx..].to_string()),
                None => (Some(rest), String::new()),
            }
        } else {
            (None, rest)
        };
        put_opt(doc, "host", host.filter(|h| !h.is_empty()));
        if !base_path.is_empty() && base_path != "/" {
            doc.insert("basePath".into(), json!(base_path));
        }
        if let Some(scheme) = scheme {
            doc.insert("schemes".into(), json!([scheme]));
        }
    }

    fn path_item(&mut self, item: &PathItem, path: &str) -> Value {
        let mut obj = Map::new();
        put_opt(&mut obj, "summary", item.summary.clone());
        put_opt(&mut obj, "description", item.description.clone());
        if !item.parameters.is_empty() {
            let params = item
                .parameters
                .iter()
                .filter_map(|p| self.parameter(p, path))
                .collect();
            obj.insert("parameters".into(), Value::Array(params));
        }
        if !item.bindings.is_empty() {
            self.warn(
                warnings::DROPPED_EXTENSION,
                "channel bindings have no OpenAPI equivalent",
                path,
            );
        }
        for (method, op) in item.operations() {
            let location = format!("{} {}", method, path);
            obj.insert(method.as_str().into(), self.operation(op, &location));
        }
        Value::Object(obj)
    }

    fn operation(&mut self, op: &Operation, location: &str) -> Value {
        let mut obj = Map::new();
        if !op.tags.is_empty() {
            obj.insert("tags".into(), json!(op.tags));
        }
        put_opt(&mut obj, "summary", op.summary.clone());
        put_opt(&mut obj, "description", op.description.clone());
        put_opt(&mut obj, "operationId", op.operation_id.clone());

        let mut params: Vec<Value> = op
            .parameters
            .iter()
            .filter_map(|p| self.parameter(p, location))
            .collect();

        if self.legacy() {
            if let Some(body) = &op.request_body {
                let consumes: Vec<&String> = body.content.keys().collect();
                if !consumes.is_empty() {
                    obj.insert("consumes".into(), json!(consumes));
                }
                params.extend(self.legacy_body(body));
            }
            let produces: BTreeSet<&String> =
                op.responses.values().flat_map(|r| r.content.keys()).collect();
            if !produces.is_empty() {
                obj.insert("produces".into(), json!(produces));
            }
        }
        if !params.is_empty() {
            obj.insert("parameters".into(), Value::Array(params));
        }
        if !self.legacy() {
            if let Some(body) = &op.request_body {
                obj.insert("requestBody".into(), self.request_body(body));
            }
        }

        let mut responses = Map::new();
        for (code, response) in &op.responses {
            responses.insert(code.clone(), self.response(code, response));
        }
        obj.insert("responses".into(), Value::Object(responses));

        if op.deprecated {
            obj.insert("deprecated".into(), json!(true));
        }
        if !op.bindings.is_empty() {
            self.warn(
                warnings::DROPPED_EXTENSION,
                "operation bindings have no OpenAPI equivalent",
                location,
            );
        }
        put_all(&mut obj, &op.extensions);
        Value::Object(obj)
    }

    fn parameter(&mut self, param: &Parameter, location: &str) -> Option<Value> {
        let mut obj = Map::new();
        obj.insert("name".into(), json!(param.name));
        obj.insert("in".into(), json!(param.location.as_str()));
        put_opt(&mut obj, "description", param.description.clone());
        if param.required || param.location == ParameterLocation::Path {
            obj.insert("required".into(), json!(true));
        }
        if param.deprecated {
            obj.insert("deprecated".into(), json!(true));
        }

        if !self.legacy() {
            if let Some(schema) = &param.schema {
                obj.insert("schema".into(), schema_to_value(schema, self.dialect));
            }
            if !param.content.is_empty() {
                obj.insert("content".into(), self.content(&param.content));
            }
            put_opt(&mut obj, "example", param.example.clone());
            return Some(Value::Object(obj));
        }

        if param.location == ParameterLocation::Cookie {
            self.warn(
                warnings::DROPPED_OPERATION,
                format!("cookie parameter '{}' cannot be expressed in OpenAPI 2.0", param.name),
                location,
            );
            return None;
        }
        // 2.0 non-body parameters carry a primitive schema inline.
        let schema = param
            .schema
            .as_ref()
            .or_else(|| param.content.values().find_map(|m| m.schema.as_ref()));
        let inline = match schema {
            Some(s) if !s.is_ref() && !s.type_is("object") => schema_to_value(s, self.dialect),
            Some(_) => {
                self.warn(
                    warnings::LOSSY_MAPPING,
                    format!("parameter '{}' schema flattened to string", param.name),
                    location,
                );
                json!({"type": "string"})
            }
            None => json!({"type": "string"}),
        };
        if let Value::Object(fields) = inline {
            for (k, v) in fields {
                if matches!(k.as_str(), "description" | "example" | "title") {
                    continue;
                }
                obj.insert(k, v);
            }
        }
        Some(Value::Object(obj))
    }

    fn request_body(&mut self, body: &RequestBody) -> Value {
        let mut obj = Map::new();
        put_opt(&mut obj, "description", body.description.clone());
        obj.insert("content".into(), self.content(&body.content));
        if body.required {
            obj.insert("required".into(), json!(true));
        }
        Value::Object(obj)
    }

    /// A 2.0 body parameter, or one `formData` parameter per property.
    fn legacy_body(&mut self, body: &RequestBody) -> Vec<Value> {
        let form = FORM_MEDIA_TYPES
            .iter()
            .find_map(|media| body.content.get(*media))
            .and_then(|m| m.schema.as_ref())
            .filter(|s| !s.properties.is_empty());
        if let Some(schema) = form {
            return schema
                .properties
                .iter()
                .map(|(name, prop)| {
                    let mut obj = Map::new();
                    obj.insert("name".into(), json!(name));
                    obj.insert("in".into(), json!("formData"));
                    put_opt(&mut obj, "description", prop.description.clone());
                    if schema.is_required(name) {
                        obj.insert("required".into(), json!(true));
                    }
                    if prop.type_is("string") && prop.format.as_deref() == Some("binary") {
                        obj.insert("type".into(), json!("file"));
                    } else {
                        let kind = prop.schema_type.clone().unwrap_or_else(|| "string".into());
                        obj.insert("type".into(), json!(kind));
                        put_opt(&mut obj, "format", prop.format.clone());
                    }
                    Value::Object(obj)
                })
                .collect();
        }

        let schema = preferred_media(&body.content).and_then(|m| m.schema.as_ref());
        let mut obj = Map::new();
        obj.insert("name".into(), json!("body"));
        obj.insert("in".into(), json!("body"));
        put_opt(&mut obj, "description", body.description.clone());
        if body.required {
            obj.insert("required".into(), json!(true));
        }
        obj.insert(
            "schema".into(),
            schema
                .map(|s| schema_to_value(s, self.dialect))
                .unwrap_or_else(|| json!({})),
        );
        vec![Value::Object(obj)]
    }

    fn response(&mut self, code: &str, response: &Response) -> Value {
        let mut obj = Map::new();
        let description = if response.description.is_empty() {
            reason_phrase(code).to_string()
        } else {
            response.description.clone()
        };
        obj.insert("description".into(), json!(description));

        if self.legacy() {
            if let Some(media) = preferred_media(&response.content) {
                if let Some(schema) = &media.schema {
                    obj.insert("schema".into(), schema_to_value(schema, self.dialect));
                }
            }
            let examples: Map<String, Value> = response
                .content
                .iter()
                .filter_map(|(k, m)| m.example.clone().map(|e| (k.clone(), e)))
                .collect();
            if !examples.is_empty() {
                obj.insert("examples".into(), Value::Object(examples));
            }
        } else if !response.content.is_empty() {
            obj.insert("content".into(), self.content(&response.content));
        }
        Value::Object(obj)
    }

    fn content(&self, content: &BTreeMap<String, MediaType>) -> Value {
        let map = content
            .iter()
            .map(|(media, m)| {
                let mut obj = Map::new();
                if let Some(schema) = &m.schema {
                    obj.insert("schema".into(), schema_to_value(schema, self.dialect));
                }
                put_opt(&mut obj, "example", m.example.clone());
                (media.clone(), Value::Object(obj))
            })
            .collect();
        Value::Object(map)
    }

    fn components(&mut self, api: &Api, doc: &mut Map<String, Value>) {
        let c = &api.components;
        let mut obj = Map::new();
        if !c.schemas.is_empty() {
            let schemas = c
                .schemas
                .iter()
                .map(|(name, s)| (name.clone(), schema_to_value(s, self.dialect)))
                .collect();
            obj.insert("schemas".into(), Value::Object(schemas));
        }
        if !c.responses.is_empty() {
            let mut responses = Map::new();
            for (name, r) in &c.responses {
                responses.insert(name.clone(), self.response("default", r));
            }
            obj.insert("responses".into(), Value::Object(responses));
        }
        if !c.parameters.is_empty() {
            let mut params = Map::new();
            for (name, p) in &c.parameters {
                let location = format!("#/components/parameters/{}", escape_pointer(name));
                if let Some(v) = self.parameter(p, &location) {
                    params.insert(name.clone(), v);
                }
            }
            obj.insert("parameters".into(), Value::Object(params));
        }
        if !c.request_bodies.is_empty() {
            let mut bodies = Map::new();
            for (name, b) in &c.request_bodies {
                bodies.insert(name.clone(), self.request_body(b));
            }
            obj.insert("requestBodies".into(), Value::Object(bodies));
        }
        if !c.security_schemes.is_empty() {
            obj.insert("securitySchemes".into(), map_value(&c.security_schemes));
        }
        if !obj.is_empty() {
            doc.insert("components".into(), Value::Object(obj));
        }
    }

    fn legacy_components(&mut self, api: &Api, doc: &mut Map<String, Value>) {
        let c = &api.components;
        if !c.schemas.is_empty() {
            let schemas = c
                .schemas
                .iter()
                .map(|(name, s)| (name.clone(), schema_to_value(s, self.dialect)))
                .collect();
            doc.insert("definitions".into(), Value::Object(schemas));
        }
        if !c.parameters.is_empty() {
            let mut params = Map::new();
            for (name, p) in &c.parameters {
                let location = format!("#/parameters/{}", escape_pointer(name));
                if let Some(v) = self.parameter(p, &location) {
                    params.insert(name.clone(), v);
                }
            }
            doc.insert("parameters".into(), Value::Object(params));
        }
        if !c.responses.is_empty() {
            let mut responses = Map::new();
            for (name, r) in &c.responses {
                responses.insert(name.clone(), self.response("default", r));
            }
            doc.insert("responses".into(), Value::Object(responses));
        }
        if !c.request_bodies.is_empty() {
            self.warn(
                warnings::LOSSY_MAPPING,
                "reusable request bodies cannot be expressed in OpenAPI 2.0",
                "components.requestBodies",
            );
        }
        if !c.security_schemes.is_empty() {
            doc.insert("securityDefinitions".into(), map_value(&c.security_schemes));
        }
    }
}

fn server(server: &Server) -> Value {
    let mut obj = Map::new();
    obj.insert("url".into(), json!(server.url));
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
    Value::Object(obj)
}

/// Substitute `{var}` placeholders with their defaults.
fn expand_variables(server: &Server) -> String {
    server
        .variables
        .iter()
        .fold(server.url.clone(), |url, (name, var)| {
            url.replace(&format!("{{{}}}", name), &var.default)
        })
}

/// JSON when present, otherwise the first media type.
fn preferred_media(content: &BTreeMap<String, MediaType>) -> Option<&MediaType> {
    content
        .get(DEFAULT_MEDIA_TYPE)
        .or_else(|| content.values().next())
}
