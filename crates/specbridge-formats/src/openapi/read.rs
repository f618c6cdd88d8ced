use std::collections::BTreeMap;

use serde_json::{Map, Value};
use specbridge_model::{
    Api, Components, Contact, Info, License, MediaType, Method, Operation, Parameter,
    ParameterLocation, PathItem, RequestBody, Response, Schema, SecurityRequirement, Server,
    ServerVariable, Tag, Warning,
};

use super::Dialect;
use crate::document::{
    bool_field, extract_extensions, follow_refs, obj_field, scalar_string, str_field, str_list,
};
use crate::error::ParseError;
use crate::schema::schema_from_value;
use crate::warnings;

const DEFAULT_MEDIA_TYPE: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// Keys of a 2.0 non-body parameter that describe its value schema.
const INLINE_SCHEMA_KEYS: &[&str] = &[
    "type",
    "format",
    "items",
    "enum",
    "default",
    "minimum",
    "maximum",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
    "pattern",
    "x-nullable",
];

struct Reader<'a> {
    root: &'a Value,
    dialect: Dialect,
    /// Document-level media types (2.0 only).
    consumes: Vec<String>,
    produces: Vec<String>,
    warnings: &'a mut Vec<Warning>,
}

pub(crate) fn read_document(
    root: &Value,
    dialect: Dialect,
    warnings: &mut Vec<Warning>,
) -> Result<Api, ParseError> {
    let obj = root
        .as_object()
        .ok_or_else(|| ParseError::structure("document root must be an object"))?;

    let mut reader = Reader {
        root,
        dialect,
        consumes: str_list(obj, "consumes"),
        produces: str_list(obj, "produces"),
        warnings,
    };

    let mut api = Api {
        info: read_info(obj)?,
        ..Api::default()
    };

    api.servers = match dialect {
        Dialect::Swagger => legacy_servers(obj),
        Dialect::OpenApi3 => read_servers(obj),
    };

    if let Some(paths) = obj_field(obj, "paths") {
        for (path, item) in paths {
            let item = reader.path_item(path, item)?;
            api.add_path(path.clone(), item);
        }
    }
    if let Some(webhooks) = obj_field(obj, "webhooks") {
        for (name, item) in webhooks {
            let item = reader.path_item(name, item)?;
            api.webhooks.insert(name.clone(), item.into());
        }
    }

    api.components = reader.components(obj)?;
    api.security = read_security(obj);
    api.tags = read_tags(obj);
    api.extensions = extract_extensions(obj);
    Ok(api)
}

fn read_info(root: &Map<String, Value>) -> Result<Info, ParseError> {
    let info = obj_field(root, "info").ok_or(ParseError::MissingTitle)?;
    let title = str_field(info, "title")
        .filter(|t| !t.trim().is_empty())
        .ok_or(ParseError::MissingTitle)?;

    Ok(Info {
        title,
        version: info
            .get("version")
            .and_then(scalar_string)
            .unwrap_or_default(),
        description: str_field(info, "description"),
        terms_of_service: str_field(info, "termsOfService"),
        contact: obj_field(info, "contact").map(|c| Contact {
            name: str_field(c, "name"),
            url: str_field(c, "url"),
            email: str_field(c, "email"),
        }),
        license: obj_field(info, "license").and_then(|l| {
            str_field(l, "name").map(|name| License {
                name,
                url: str_field(l, "url"),
            })
        }),
    })
}

fn read_servers(root: &Map<String, Value>) -> Vec<Server> {
    let Some(servers) = root.get("servers").and_then(Value::as_array) else {
        return Vec::new();
    };
    servers
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|s| {
            let url = str_field(s, "url")?;
            let variables = obj_field(s, "variables")
                .map(|vars| {
                    vars.iter()
                        .filter_map(|(name, v)| {
                            let v = v.as_object()?;
                            Some((
                                name.clone(),
                                ServerVariable {
                                    default: v.get("default").and_then(scalar_string)?,
                                    enum_values: str_list(v, "enum"),
                                    description: str_field(v, "description"),
                                },
                            ))
                        })
                        .collect()
                })
                .unwrap_or_default();
            Some(Server {
                url,
                description: str_field(s, "description"),
                variables,
                ..Server::default()
            })
        })
        .collect()
}

/// `host` + `basePath` + `schemes` → one server per scheme.
fn legacy_servers(root: &Map<String, Value>) -> Vec<Server> {
    let host = str_field(root, "host");
    let base_path = str_field(root, "basePath").unwrap_or_default();
    let Some(host) = host else {
        if base_path.is_empty() {
            return Vec::new();
        }
        return vec![Server::new(base_path)];
    };

    let mut schemes = str_list(root, "schemes");
    if schemes.is_empty() {
        schemes.push("https".to_string());
    }
    schemes
        .iter()
        .map(|scheme| Server::new(format!("{}://{}{}", scheme, host, base_path)))
        .collect()
}

fn read_security(root: &Map<String, Value>) -> Vec<SecurityRequirement> {
    root.get("security")
        .and_then(Value::as_array)
        .map(|reqs| {
            reqs.iter()
                .filter_map(Value::as_object)
                .map(|req| req.keys().map(|k| (k.clone(), str_list(req, k))).collect())
                .collect()
        })
        .unwrap_or_default()
}

fn read_tags(root: &Map<String, Value>) -> Vec<Tag> {
    root.get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_object)
                .filter_map(|t| {
                    Some(Tag {
                        name: str_field(t, "name")?,
                        description: str_field(t, "description"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

impl Reader<'_> {
    fn path_item(&mut self, path: &str, value: &Value) -> Result<PathItem, ParseError> {
        let obj = value.as_object().ok_or_else(|| {
            ParseError::structure(format!("path item for '{}' must be an object", path))
        })?;

        let mut item = PathItem {
            summary: str_field(obj, "summary"),
            description: str_field(obj, "description"),
            ..PathItem::default()
        };

        let mut shared = ParameterSet::default();
        self.parameters(obj, path, &mut shared)?;
        if shared.body.is_some() || !shared.form.is_empty() {
            self.warnings.push(
                Warning::new(
                    warnings::UNSUPPORTED_CONSTRUCT,
                    "path-level body parameters are not supported",
                )
                .at(path),
            );
        }
        item.parameters = shared.params;

        for method in Method::ALL {
            if let Some(op) = obj.get(method.as_str()) {
                let location = format!("{} {}", method, path);
                let op = self.operation(op, &location)?;
                item.set_operation(method, op);
            }
        }
        Ok(item)
    }

    fn operation(&mut self, value: &Value, location: &str) -> Result<Operation, ParseError> {
        let obj = value.as_object().ok_or_else(|| {
            ParseError::structure(format!("operation {} must be an object", location))
        })?;

        let mut op = Operation {
            operation_id: str_field(obj, "operationId"),
            summary: str_field(obj, "summary"),
            description: str_field(obj, "description"),
            tags: str_list(obj, "tags"),
            deprecated: bool_field(obj, "deprecated"),
            extensions: extract_extensions(obj),
            ..Operation::default()
        };

        let mut params = ParameterSet::default();
        self.parameters(obj, location, &mut params)?;
        op.parameters = params.params;

        match self.dialect {
            Dialect::Swagger => {
                let consumes = media_types(obj, "consumes", &self.consumes);
                if let Some(body) = params.body {
                    op.request_body = Some(legacy_body(body, &consumes));
                } else if !params.form.is_empty() {
                    op.request_body = Some(form_body(params.form, &consumes));
                }
            }
            Dialect::OpenApi3 => {
                if let Some(body) = obj.get("requestBody") {
                    op.request_body = Some(self.request_body(body)?);
                }
            }
        }

        if let Some(responses) = obj_field(obj, "responses") {
            let produces = media_types(obj, "produces", &self.produces);
            for (code, response) in responses {
                if code.starts_with("x-") {
                    continue;
                }
                let response = self.response(response, &produces)?;
                op.responses.insert(code.clone(), response);
            }
        }
        Ok(op)
    }

    fn parameters(
        &mut self,
        obj: &Map<String, Value>,
        location: &str,
        set: &mut ParameterSet,
    ) -> Result<(), ParseError> {
        let Some(list) = obj.get("parameters").and_then(Value::as_array) else {
            return Ok(());
        };
        for value in list {
            let param = follow_refs(self.root, value)?;
            let Some(param) = param.as_object() else {
                continue;
            };
            let Some(name) = str_field(param, "name") else {
                self.warnings.push(
                    Warning::new(warnings::UNSUPPORTED_CONSTRUCT, "parameter without a name")
                        .at(location),
                );
                continue;
            };
            let kind = str_field(param, "in").unwrap_or_default();
            match (self.dialect, kind.as_str()) {
                (Dialect::Swagger, "body") => set.body = Some(param.clone()),
                (Dialect::Swagger, "formData") => set.form.push((name, param.clone())),
                (_, kind) => {
                    let Some(location_kind) = ParameterLocation::parse(kind) else {
                        self.warnings.push(
                            Warning::new(
                                warnings::UNSUPPORTED_CONSTRUCT,
                                format!("parameter '{}' has unknown location '{}'", name, kind),
                            )
                            .at(location),
                        );
                        continue;
                    };
                    let parameter = self.parameter(name, location_kind, param);
                    set.push(parameter);
                }
            }
        }
        Ok(())
    }

    fn parameter(
        &self,
        name: String,
        location: ParameterLocation,
        obj: &Map<String, Value>,
    ) -> Parameter {
        let schema = match self.dialect {
            Dialect::Swagger => Some(inline_schema(obj)),
            Dialect::OpenApi3 => obj.get("schema").map(schema_from_value),
        };
        Parameter {
            name,
            location,
            description: str_field(obj, "description"),
            required: bool_field(obj, "required") || location == ParameterLocation::Path,
            deprecated: bool_field(obj, "deprecated"),
            schema,
            content: obj_field(obj, "content")
                .map(read_content)
                .unwrap_or_default(),
            example: obj.get("example").cloned(),
        }
    }

    fn request_body(&self, value: &Value) -> Result<RequestBody, ParseError> {
        let obj = follow_refs(self.root, value)?
            .as_object()
            .ok_or_else(|| ParseError::structure("requestBody must be an object"))?;
        Ok(RequestBody {
            description: str_field(obj, "description"),
            required: bool_field(obj, "required"),
            content: obj_field(obj, "content")
                .map(read_content)
                .unwrap_or_default(),
        })
    }

    fn response(&self, value: &Value, produces: &[String]) -> Result<Response, ParseError> {
        let obj = follow_refs(self.root, value)?
            .as_object()
            .ok_or_else(|| ParseError::structure("response must be an object"))?;
        let description = str_field(obj, "description").unwrap_or_default();

        let content = match self.dialect {
            Dialect::OpenApi3 => obj_field(obj, "content")
                .map(read_content)
                .unwrap_or_default(),
            Dialect::Swagger => match obj.get("schema") {
                Some(schema) => {
                    let schema = schema_from_value(schema);
                    let examples = obj_field(obj, "examples");
                    produces
                        .iter()
                        .map(|media| {
                            (
                                media.clone(),
                                MediaType {
                                    schema: Some(schema.clone()),
                                    example: examples.and_then(|e| e.get(media)).cloned(),
                                },
                            )
                        })
                        .collect()
                }
                None => BTreeMap::new(),
            },
        };
        Ok(Response {
            description,
            content,
        })
    }

    fn components(&mut self, root: &Map<String, Value>) -> Result<Components, ParseError> {
        let mut components = Components::default();
        match self.dialect {
            Dialect::OpenApi3 => {
                let Some(registry) = obj_field(root, "components") else {
                    return Ok(components);
                };
                if let Some(schemas) = obj_field(registry, "schemas") {
                    for (name, schema) in schemas {
                        components
                            .schemas
                            .insert(name.clone(), schema_from_value(schema).into());
                    }
                }
                if let Some(responses) = obj_field(registry, "responses") {
                    for (name, response) in responses {
                        let response = self.response(response, &[])?;
                        components.responses.insert(name.clone(), response);
                    }
                }
                if let Some(bodies) = obj_field(registry, "requestBodies") {
                    for (name, body) in bodies {
                        let body = self.request_body(body)?;
                        components.request_bodies.insert(name.clone(), body);
                    }
                }
                self.component_parameters(registry, &mut components)?;
                if let Some(schemes) = obj_field(registry, "securitySchemes") {
                    components.security_schemes =
                        schemes.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                }
            }
            Dialect::Swagger => {
                if let Some(definitions) = obj_field(root, "definitions") {
                    for (name, schema) in definitions {
                        components
                            .schemas
                            .insert(name.clone(), schema_from_value(schema).into());
                    }
                }
                if let Some(responses) = obj_field(root, "responses") {
                    let produces = self.produces_or_default();
                    for (name, response) in responses {
                        let response = self.response(response, &produces)?;
                        components.responses.insert(name.clone(), response);
                    }
                }
                self.component_parameters(root, &mut components)?;
                if let Some(schemes) = obj_field(root, "securityDefinitions") {
                    components.security_schemes =
                        schemes.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                }
            }
        }
        Ok(components)
    }

    fn component_parameters(
        &mut self,
        registry: &Map<String, Value>,
        components: &mut Components,
    ) -> Result<(), ParseError> {
        let Some(params) = obj_field(registry, "parameters") else {
            return Ok(());
        };
        for (key, value) in params {
            let param = follow_refs(self.root, value)?;
            let Some(param) = param.as_object() else {
                continue;
            };
            let name = str_field(param, "name").unwrap_or_else(|| key.clone());
            let kind = str_field(param, "in").unwrap_or_default();
            match ParameterLocation::parse(&kind) {
                Some(location) => {
                    let parameter = self.parameter(name, location, param);
                    components.parameters.insert(key.clone(), parameter);
                }
                None => self.warnings.push(
                    Warning::new(
                        warnings::UNSUPPORTED_CONSTRUCT,
                        format!("component parameter '{}' ({}) skipped", key, kind),
                    )
                    .at("parameters"),
                ),
            }
        }
        Ok(())
    }

    fn produces_or_default(&self) -> Vec<String> {
        if self.produces.is_empty() {
            vec![DEFAULT_MEDIA_TYPE.to_string()]
        } else {
            self.produces.clone()
        }
    }
}

/// Parameters of one path item or operation, split by 2.0 role.
#[derive(Default)]
struct ParameterSet {
    params: Vec<Parameter>,
    body: Option<Map<String, Value>>,
    form: Vec<(String, Map<String, Value>)>,
}

impl ParameterSet {
    /// A later `(name, location)` duplicate replaces the earlier one.
    fn push(&mut self, param: Parameter) {
        self.params
            .retain(|p| !(p.name == param.name && p.location == param.location));
        self.params.push(param);
    }
}

/// Operation-level list, then document-level, then `application/json`.
fn media_types(obj: &Map<String, Value>, key: &str, document: &[String]) -> Vec<String> {
    let own = str_list(obj, key);
    if !own.is_empty() {
        own
    } else if !document.is_empty() {
        document.to_vec()
    } else {
        vec![DEFAULT_MEDIA_TYPE.to_string()]
    }
}

fn read_content(obj: &Map<String, Value>) -> BTreeMap<String, MediaType> {
    obj.iter()
        .map(|(media, value)| {
            let media_obj = value.as_object();
            (
                media.clone(),
                MediaType {
                    schema: media_obj
                        .and_then(|m| m.get("schema"))
                        .map(schema_from_value),
                    example: media_obj.and_then(|m| {
                        m.get("example").cloned().or_else(|| {
                            obj_field(m, "examples")
                                .and_then(|ex| ex.values().next())
                                .and_then(|ex| ex.get("value"))
                                .cloned()
                        })
                    }),
                },
            )
        })
        .collect()
}

/// Fold the inline type fields of a 2.0 non-body parameter into a schema.
fn inline_schema(param: &Map<String, Value>) -> Schema {
    let mut obj: Map<String, Value> = INLINE_SCHEMA_KEYS
        .iter()
        .filter_map(|k| param.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect();
    if obj.get("type").and_then(Value::as_str) == Some("file") {
        obj.insert("type".into(), Value::String("string".into()));
        obj.insert("format".into(), Value::String("binary".into()));
    }
    schema_from_value(&Value::Object(obj))
}

fn legacy_body(param: Map<String, Value>, consumes: &[String]) -> RequestBody {
    let schema = param.get("schema").map(schema_from_value);
    RequestBody {
        description: str_field(&param, "description"),
        required: bool_field(&param, "required"),
        content: consumes
            .iter()
            .map(|media| {
                (
                    media.clone(),
                    MediaType {
                        schema: schema.clone(),
                        example: None,
                    },
                )
            })
            .collect(),
    }
}

fn form_body(fields: Vec<(String, Map<String, Value>)>, consumes: &[String]) -> RequestBody {
    let media = if consumes.iter().any(|c| c == MULTIPART) {
        MULTIPART
    } else {
        FORM_URLENCODED
    };
    let mut schema = Schema::typed("object");
    let mut required = false;
    for (name, param) in fields {
        let is_required = bool_field(&param, "required");
        required |= is_required;
        let mut field = inline_schema(&param);
        field.description = str_field(&param, "description");
        schema.insert_property(name, field, is_required);
    }
    RequestBody {
        description: None,
        required,
        content: BTreeMap::from([(media.to_string(), MediaType::with_schema(schema))]),
    }
}
