use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::{Map, Value};
use specbridge_model::{
    schema_ref, Api, Components, Contact, Info, License, MediaType, Method, Operation, Parameter,
    ParameterLocation, PathItem, RequestBody, Response, Schema, Server, ServerVariable, Tag,
    Warning,
};

use super::{Major, DEFAULT_CONTENT_TYPE, SUBSCRIBED_MESSAGE};
use crate::document::{
    extract_extensions, obj_field, resolve_pointer, scalar_string, str_field, str_list, value_map,
};
use crate::error::ParseError;
use crate::schema::schema_from_value;
use crate::warnings;

const MESSAGES_PREFIX: &str = "#/components/messages/";
const CHANNELS_PREFIX: &str = "#/channels/";

/// A message reduced to what the IR keeps.
#[derive(Debug, Default)]
struct Message {
    payload: Option<Schema>,
    content_type: Option<String>,
    description: Option<String>,
    example: Option<Value>,
}

struct Reader<'a> {
    root: &'a Value,
    default_content_type: String,
    warnings: &'a mut Vec<Warning>,
    /// Component message name to the schema name its payload is
    /// registered under.
    message_schemas: BTreeMap<String, String>,
}

pub(crate) fn read_document(
    root: &Value,
    major: Major,
    warnings: &mut Vec<Warning>,
) -> Result<Api, ParseError> {
    let obj = root
        .as_object()
        .ok_or_else(|| ParseError::structure("document root must be an object"))?;

    let mut reader = Reader {
        root,
        default_content_type: str_field(obj, "defaultContentType")
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        warnings,
        message_schemas: message_schema_names(obj),
    };

    let mut api = Api {
        info: read_info(obj)?,
        servers: read_servers(obj, major),
        ..Api::default()
    };
    api.tags = read_tags(obj.get("tags"))
        .into_iter()
        .map(|name| Tag {
            name,
            description: None,
        })
        .collect();
    if let Some(info) = obj_field(obj, "info") {
        // 3.0 moved tags under info.
        api.tags.extend(read_tags(info.get("tags")).into_iter().map(|name| Tag {
            name,
            description: None,
        }));
    }

    match major {
        Major::V2 => reader.channels_v2(obj, &mut api)?,
        Major::V3 => reader.channels_v3(obj, &mut api)?,
    }

    api.components = reader.components(obj)?;
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

fn read_servers(root: &Map<String, Value>, major: Major) -> Vec<Server> {
    let Some(servers) = obj_field(root, "servers") else {
        return Vec::new();
    };
    servers
        .iter()
        .filter_map(|(name, s)| {
            let s = s.as_object()?;
            let protocol = str_field(s, "protocol");
            let url = match major {
                Major::V2 => str_field(s, "url")?,
                Major::V3 => {
                    let host = str_field(s, "host")?;
                    let pathname = str_field(s, "pathname").unwrap_or_default();
                    match &protocol {
                        Some(p) if !host.contains("://") => format!("{}://{}{}", p, host, pathname),
                        _ => format!("{}{}", host, pathname),
                    }
                }
            };
            Some(Server {
                url,
                name: Some(name.clone()),
                description: str_field(s, "description"),
                protocol,
                protocol_version: str_field(s, "protocolVersion"),
                variables: read_variables(s),
                bindings: value_map(s, "bindings"),
            })
        })
        .collect()
}

fn read_variables(server: &Map<String, Value>) -> BTreeMap<String, ServerVariable> {
    obj_field(server, "variables")
        .map(|vars| {
            vars.iter()
                .filter_map(|(name, v)| {
                    let v = v.as_object()?;
                    Some((
                        name.clone(),
                        ServerVariable {
                            default: v
                                .get("default")
                                .and_then(scalar_string)
                                .unwrap_or_default(),
                            enum_values: str_list(v, "enum"),
                            description: str_field(v, "description"),
                        },
                    ))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Tag names from a `[{name: ...}]` list.
fn read_tags(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl<'a> Reader<'a> {
    fn channels_v2(&mut self, root: &Map<String, Value>, api: &mut Api) -> Result<(), ParseError> {
        let Some(channels) = obj_field(root, "channels") else {
            return Ok(());
        };
        for (name, channel) in channels {
            let channel = self.resolve(channel)?;
            let Some(channel) = channel.as_object() else {
                continue;
            };
            let mut item = self.channel_item(channel);

            if let Some(publish) = obj_field(channel, "publish") {
                let mut op = self.operation(publish);
                if let Some(message) = publish.get("message") {
                    let message = self.message(message)?;
                    op.request_body = Some(self.request_body(message));
                }
                item.set_operation(Method::Post, op);
            }
            if let Some(subscribe) = obj_field(channel, "subscribe") {
                let mut op = self.operation(subscribe);
                let message = match subscribe.get("message") {
                    Some(message) => self.message(message)?,
                    None => Message::default(),
                };
                op.responses.insert("200".to_string(), self.response(message));
                item.set_operation(Method::Get, op);
            }
            api.add_path(name.clone(), item);
        }
        Ok(())
    }

    fn channels_v3(&mut self, root: &Map<String, Value>, api: &mut Api) -> Result<(), ParseError> {
        // Channel id → address (the path key).
        let mut addresses: BTreeMap<String, String> = BTreeMap::new();

        if let Some(channels) = obj_field(root, "channels") {
            for (id, channel) in channels {
                let channel = self.resolve(channel)?;
                let Some(channel) = channel.as_object() else {
                    continue;
                };
                let address = str_field(channel, "address").unwrap_or_else(|| id.clone());
                let mut item = self.channel_item(channel);
                if *id != address {
                    item.name = Some(id.clone());
                }
                addresses.insert(id.clone(), address.clone());
                api.add_path(address, item);
            }
        }

        let Some(operations) = obj_field(root, "operations") else {
            return Ok(());
        };
        for (op_id, value) in operations {
            let value = self.resolve(value)?;
            let Some(obj) = value.as_object() else {
                continue;
            };
            let method = match str_field(obj, "action").as_deref() {
                Some("send") => Method::Post,
                Some("receive") => Method::Get,
                other => {
                    self.warnings.push(
                        Warning::new(
                            warnings::UNSUPPORTED_CONSTRUCT,
                            format!("unknown action {:?}", other.unwrap_or_default()),
                        )
                        .at(format!("operations.{}", op_id)),
                    );
                    continue;
                }
            };

            let channel_ref = obj
                .get("channel")
                .and_then(|c| c.get("$ref"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ParseError::structure(format!("operation '{}' has no channel $ref", op_id))
                })?;
            let channel_id = channel_ref
                .strip_prefix(CHANNELS_PREFIX)
                .map(|id| id.replace("~1", "/").replace("~0", "~"))
                .ok_or_else(|| ParseError::UnresolvedRef(channel_ref.to_string()))?;
            let address = addresses
                .get(&channel_id)
                .cloned()
                .ok_or_else(|| ParseError::UnresolvedRef(channel_ref.to_string()))?;

            let mut op = self.operation(obj);
            op.operation_id = Some(op_id.clone());

            let message = self.operation_message(obj, channel_ref)?;
            match method {
                Method::Post => op.request_body = Some(self.request_body(message)),
                _ => {
                    op.responses
                        .insert("200".to_string(), self.response(message));
                }
            }

            let item = api.path_entry(&address);
            if item.operation(method).is_some() {
                self.warnings.push(
                    Warning::new(
                        warnings::DROPPED_OPERATION,
                        format!("channel already has a {} operation; '{}' dropped", method, op_id),
                    )
                    .at(address),
                );
                continue;
            }
            item.set_operation(method, op);
        }
        Ok(())
    }

    /// The message an operation carries: its own `messages` list, or every
    /// message of its channel.
    fn operation_message(
        &self,
        op: &Map<String, Value>,
        channel_ref: &str,
    ) -> Result<Message, ParseError> {
        let mut refs: Vec<&Value> = op
            .get("messages")
            .and_then(Value::as_array)
            .map(|list| list.iter().collect())
            .unwrap_or_default();

        if refs.is_empty() {
            let channel = resolve_pointer(self.root, channel_ref)
                .ok_or_else(|| ParseError::UnresolvedRef(channel_ref.to_string()))?;
            let channel = self.resolve(channel)?;
            if let Some(messages) = channel.get("messages").and_then(Value::as_object) {
                refs = messages.values().collect();
            }
        }

        let mut messages = Vec::with_capacity(refs.len());
        for value in refs {
            messages.push(self.message(value)?);
        }
        Ok(combine(messages))
    }

    fn channel_item(&self, channel: &Map<String, Value>) -> PathItem {
        let mut item = PathItem {
            summary: str_field(channel, "summary").or_else(|| str_field(channel, "title")),
            description: str_field(channel, "description"),
            bindings: value_map(channel, "bindings"),
            ..PathItem::default()
        };
        if let Some(params) = obj_field(channel, "parameters") {
            for (name, param) in params {
                let param = self.resolve(param).ok().and_then(Value::as_object);
                item.parameters.push(Parameter {
                    name: name.clone(),
                    location: ParameterLocation::Path,
                    description: param.and_then(|p| str_field(p, "description")),
                    required: true,
                    schema: param.and_then(|p| p.get("schema")).map(schema_from_value),
                    example: param
                        .and_then(|p| p.get("examples"))
                        .and_then(Value::as_array)
                        .and_then(|e| e.first())
                        .cloned(),
                    ..Parameter::default()
                });
            }
        }
        item
    }

    fn operation(&self, obj: &Map<String, Value>) -> Operation {
        Operation {
            operation_id: str_field(obj, "operationId"),
            summary: str_field(obj, "summary").or_else(|| str_field(obj, "title")),
            description: str_field(obj, "description"),
            tags: read_tags(obj.get("tags")),
            bindings: value_map(obj, "bindings"),
            extensions: extract_extensions(obj),
            ..Operation::default()
        }
    }

    /// Reduce a message (inline, `$ref`, or `oneOf` list) to payload and
    /// content type. A reference to a component message becomes a schema
    /// reference of the same name.
    fn message(&self, value: &Value) -> Result<Message, ParseError> {
        let mut current = value;
        for _ in 0..16 {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                break;
            };
            let target = resolve_pointer(self.root, reference)
                .ok_or_else(|| ParseError::UnresolvedRef(reference.to_string()))?;
            if let Some(name) = reference.strip_prefix(MESSAGES_PREFIX) {
                let mut message = self.inline_message(target)?;
                let schema_name = self
                    .message_schemas
                    .get(name)
                    .map(String::as_str)
                    .unwrap_or(name);
                message.payload = Some(Schema {
                    reference: Some(schema_ref(schema_name)),
                    ..Schema::default()
                });
                return Ok(message);
            }
            current = target;
        }
        self.inline_message(current)
    }

    fn inline_message(&self, value: &Value) -> Result<Message, ParseError> {
        if let Some(variants) = value.get("oneOf").and_then(Value::as_array) {
            let mut messages = Vec::with_capacity(variants.len());
            for v in variants {
                messages.push(self.message(v)?);
            }
            return Ok(combine(messages));
        }
        let Some(obj) = value.as_object() else {
            return Ok(Message::default());
        };
        Ok(Message {
            payload: obj.get("payload").map(schema_from_value),
            content_type: str_field(obj, "contentType"),
            description: str_field(obj, "description").or_else(|| str_field(obj, "summary")),
            example: obj
                .get("examples")
                .and_then(Value::as_array)
                .and_then(|e| e.first())
                .and_then(|e| e.get("payload"))
                .cloned(),
        })
    }

    fn request_body(&self, message: Message) -> RequestBody {
        let content_type = message
            .content_type
            .unwrap_or_else(|| self.default_content_type.clone());
        RequestBody {
            description: message.description,
            required: false,
            content: BTreeMap::from([(
                content_type,
                MediaType {
                    schema: message.payload,
                    example: message.example,
                },
            )]),
        }
    }

    fn response(&self, message: Message) -> Response {
        let content_type = message
            .content_type
            .unwrap_or_else(|| self.default_content_type.clone());
        Response {
            description: message
                .description
                .unwrap_or_else(|| SUBSCRIBED_MESSAGE.to_string()),
            content: BTreeMap::from([(
                content_type,
                MediaType {
                    schema: message.payload,
                    example: message.example,
                },
            )]),
        }
    }

    fn components(&mut self, root: &Map<String, Value>) -> Result<Components, ParseError> {
        let mut components = Components::default();
        let Some(registry) = obj_field(root, "components") else {
            return Ok(components);
        };
        if let Some(schemas) = obj_field(registry, "schemas") {
            for (name, schema) in schemas {
                components
                    .schemas
                    .insert(name.clone(), Arc::new(schema_from_value(schema)));
            }
        }
        if let Some(messages) = obj_field(registry, "messages") {
            for (name, message) in messages {
                let schema_name = self
                    .message_schemas
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| name.clone());
                let message = self.inline_message(self.resolve(message)?)?;
                if let Some(payload) = message.payload {
                    components.schemas.insert(schema_name, Arc::new(payload));
                }
            }
        }
        if let Some(schemes) = obj_field(registry, "securitySchemes") {
            components.security_schemes = schemes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
        Ok(components)
    }

    /// Follow `$ref` chains on channels, operations and parameters.
    fn resolve<'v>(&self, value: &'v Value) -> Result<&'v Value, ParseError>
    where
        'a: 'v,
    {
        crate::document::follow_refs(self.root, value)
    }
}

/// Schema names for component message payloads. A message keeps its own
/// name unless a component schema already owns it, in which case it becomes
/// `<Name>Message` (then `<Name>Message_2`, ...).
fn message_schema_names(root: &Map<String, Value>) -> BTreeMap<String, String> {
    let Some(registry) = obj_field(root, "components") else {
        return BTreeMap::new();
    };
    let Some(messages) = obj_field(registry, "messages") else {
        return BTreeMap::new();
    };
    let mut taken: BTreeSet<String> = obj_field(registry, "schemas")
        .map(|schemas| schemas.keys().cloned().collect())
        .unwrap_or_default();
    let mut names = BTreeMap::new();
    for name in messages.keys() {
        let mut candidate = name.clone();
        if taken.contains(&candidate) {
            let base = format!("{}Message", name);
            candidate = base.clone();
            let mut n = 2;
            while taken.contains(&candidate) || messages.contains_key(&candidate) {
                candidate = format!("{}_{}", base, n);
                n += 1;
            }
        }
        taken.insert(candidate.clone());
        names.insert(name.clone(), candidate);
    }
    names
}

/// Several messages become one `oneOf` payload; the first content type wins.
fn combine(mut messages: Vec<Message>) -> Message {
    if messages.len() <= 1 {
        return messages.pop().unwrap_or_default();
    }
    let content_type = messages.iter().find_map(|m| m.content_type.clone());
    let one_of = messages
        .into_iter()
        .map(|m| m.payload.unwrap_or_default())
        .collect();
    Message {
        payload: Some(Schema {
            one_of,
            ..Schema::default()
        }),
        content_type,
        description: None,
        example: None,
    }
}
