//! Mapping between native JSON-Schema-like objects and IR [`Schema`] trees.

use serde_json::{Map, Value};
use specbridge_model::{AdditionalProperties, Schema};

use crate::document::{bool_field, extract_extensions, str_field, str_list};
use crate::refs::{self, RefRoot};

/// How a target encodes nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullableStyle {
    /// `type: [T, "null"]` (OpenAPI 3.1, AsyncAPI).
    TypeArray,
    /// `type: T` plus `nullable: true` (OpenAPI 3.0).
    Keyword,
    /// `type: T` plus `x-nullable: true` (OpenAPI 2.0).
    Extension,
    /// Plain `type: T`; the null marker is dropped.
    Omitted,
}

/// Target conventions for writing schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDialect {
    pub ref_root: RefRoot,
    pub nullable: NullableStyle,
}

impl SchemaDialect {
    pub const OPENAPI_2: SchemaDialect = SchemaDialect {
        ref_root: RefRoot::Definitions,
        nullable: NullableStyle::Omitted,
    };
    pub const OPENAPI_30: SchemaDialect = SchemaDialect {
        ref_root: RefRoot::Components,
        nullable: NullableStyle::Omitted,
    };
    pub const OPENAPI_31: SchemaDialect = SchemaDialect {
        ref_root: RefRoot::Components,
        nullable: NullableStyle::TypeArray,
    };
    pub const ASYNCAPI: SchemaDialect = SchemaDialect {
        ref_root: RefRoot::Components,
        nullable: NullableStyle::TypeArray,
    };

    /// The same dialect with the null marker carried as the keyword an
    /// older OpenAPI version understands (`x-nullable` for 2.0,
    /// `nullable` for 3.0). Array-form dialects are unchanged.
    pub fn with_nullable_keywords(self) -> Self {
        let nullable = match (self.nullable, self.ref_root) {
            (NullableStyle::Omitted, RefRoot::Definitions) => NullableStyle::Extension,
            (NullableStyle::Omitted, _) => NullableStyle::Keyword,
            (style, _) => style,
        };
        SchemaDialect { nullable, ..self }
    }
}

/// Read a native schema object. Non-object values (boolean schemas
/// included) yield an empty schema.
pub fn schema_from_value(value: &Value) -> Schema {
    match value.as_object() {
        Some(obj) => schema_from_object(obj),
        None => Schema::default(),
    }
}

fn schema_from_object(obj: &Map<String, Value>) -> Schema {
    if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
        // A reference node is a leaf; siblings are ignored.
        return Schema {
            reference: Some(refs::canonicalize(reference)),
            ..Schema::default()
        };
    }

    let mut schema = Schema::default();

    match obj.get("type") {
        Some(Value::String(kind)) if kind == "null" => schema.nullable = true,
        Some(Value::String(kind)) => schema.schema_type = Some(kind.clone()),
        Some(Value::Array(kinds)) => {
            let kinds: Vec<&str> = kinds.iter().filter_map(Value::as_str).collect();
            schema.nullable = kinds.contains(&"null");
            schema.schema_type = kinds
                .iter()
                .find(|k| **k != "null")
                .map(|k| k.to_string());
        }
        _ => {}
    }
    if bool_field(obj, "nullable") || bool_field(obj, "x-nullable") {
        schema.nullable = true;
    }

    schema.format = str_field(obj, "format");
    schema.title = str_field(obj, "title");
    schema.description = str_field(obj, "description");
    schema.pattern = str_field(obj, "pattern");

    if let Some(props) = obj.get("properties").and_then(Value::as_object) {
        for (name, prop) in props {
            schema
                .properties
                .insert(name.clone(), schema_from_value(prop));
        }
    }
    schema.required = str_list(obj, "required");

    if let Some(items) = obj.get("items") {
        schema.items = Some(Box::new(schema_from_value(items)));
    }
    schema.additional_properties = match obj.get("additionalProperties") {
        Some(Value::Bool(b)) => Some(AdditionalProperties::Allowed(*b)),
        Some(v @ Value::Object(_)) => Some(AdditionalProperties::Schema(Box::new(
            schema_from_value(v),
        ))),
        _ => None,
    };

    if let Some(values) = obj.get("enum").and_then(Value::as_array) {
        schema.enum_values = values.clone();
    }
    schema.default = obj.get("default").cloned();
    schema.example = obj.get("example").cloned().or_else(|| {
        obj.get("examples")
            .and_then(Value::as_array)
            .and_then(|a| a.first())
            .cloned()
    });

    schema.all_of = schema_list(obj, "allOf");
    schema.any_of = schema_list(obj, "anyOf");
    schema.one_of = schema_list(obj, "oneOf");
    schema.not = obj.get("not").map(|v| Box::new(schema_from_value(v)));

    schema.minimum = obj.get("minimum").and_then(Value::as_f64);
    schema.maximum = obj.get("maximum").and_then(Value::as_f64);
    schema.min_length = obj.get("minLength").and_then(Value::as_u64);
    schema.max_length = obj.get("maxLength").and_then(Value::as_u64);
    schema.min_items = obj.get("minItems").and_then(Value::as_u64);
    schema.max_items = obj.get("maxItems").and_then(Value::as_u64);

    schema.read_only = bool_field(obj, "readOnly");
    schema.write_only = bool_field(obj, "writeOnly");
    schema.deprecated = bool_field(obj, "deprecated");

    schema.extensions = extract_extensions(obj);
    schema.extensions.remove("x-nullable");

    schema
}

fn schema_list(obj: &Map<String, Value>, key: &str) -> Vec<Schema> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(schema_from_value).collect())
        .unwrap_or_default()
}

/// Write an IR schema in the target dialect, with a fixed key order.
pub fn schema_to_value(schema: &Schema, dialect: SchemaDialect) -> Value {
    let mut obj = Map::new();

    if let Some(reference) = &schema.reference {
        obj.insert(
            "$ref".into(),
            Value::String(refs::to_native(reference, dialect.ref_root)),
        );
        return Value::Object(obj);
    }

    match (&schema.schema_type, schema.nullable, dialect.nullable) {
        (Some(kind), true, NullableStyle::TypeArray) => {
            obj.insert("type".into(), serde_json::json!([kind, "null"]));
        }
        (Some(kind), _, _) => {
            obj.insert("type".into(), Value::String(kind.clone()));
        }
        (None, _, _) => {}
    }
    if let Some(format) = &schema.format {
        obj.insert("format".into(), Value::String(format.clone()));
    }
    if schema.nullable {
        match dialect.nullable {
            NullableStyle::Keyword => {
                obj.insert("nullable".into(), Value::Bool(true));
            }
            NullableStyle::Extension => {
                obj.insert("x-nullable".into(), Value::Bool(true));
            }
            NullableStyle::TypeArray | NullableStyle::Omitted => {}
        }
    }
    if let Some(title) = &schema.title {
        obj.insert("title".into(), Value::String(title.clone()));
    }
    if let Some(description) = &schema.description {
        obj.insert("description".into(), Value::String(description.clone()));
    }
    if !schema.enum_values.is_empty() {
        obj.insert("enum".into(), Value::Array(schema.enum_values.clone()));
    }
    if let Some(default) = &schema.default {
        obj.insert("default".into(), default.clone());
    }
    if let Some(example) = &schema.example {
        obj.insert("example".into(), example.clone());
    }
    if !schema.properties.is_empty() {
        let props: Map<String, Value> = schema
            .properties
            .iter()
            .map(|(name, prop)| (name.clone(), schema_to_value(prop, dialect)))
            .collect();
        obj.insert("properties".into(), Value::Object(props));
    }
    if !schema.required.is_empty() {
        obj.insert("required".into(), serde_json::json!(schema.required));
    }
    if let Some(items) = &schema.items {
        obj.insert("items".into(), schema_to_value(items, dialect));
    }
    match &schema.additional_properties {
        Some(AdditionalProperties::Allowed(b)) => {
            obj.insert("additionalProperties".into(), Value::Bool(*b));
        }
        Some(AdditionalProperties::Schema(s)) => {
            obj.insert("additionalProperties".into(), schema_to_value(s, dialect));
        }
        None => {}
    }
    for (key, list) in [
        ("allOf", &schema.all_of),
        ("anyOf", &schema.any_of),
        ("oneOf", &schema.one_of),
    ] {
        if !list.is_empty() {
            let values = list.iter().map(|s| schema_to_value(s, dialect)).collect();
            obj.insert(key.into(), Value::Array(values));
        }
    }
    if let Some(not) = &schema.not {
        obj.insert("not".into(), schema_to_value(not, dialect));
    }

    if let Some(min) = schema.minimum {
        obj.insert("minimum".into(), number(min));
    }
    if let Some(max) = schema.maximum {
        obj.insert("maximum".into(), number(max));
    }
    for (key, bound) in [
        ("minLength", schema.min_length),
        ("maxLength", schema.max_length),
        ("minItems", schema.min_items),
        ("maxItems", schema.max_items),
    ] {
        if let Some(n) = bound {
            obj.insert(key.into(), Value::from(n));
        }
    }
    if let Some(pattern) = &schema.pattern {
        obj.insert("pattern".into(), Value::String(pattern.clone()));
    }
    for (key, flag) in [
        ("readOnly", schema.read_only),
        ("writeOnly", schema.write_only),
        ("deprecated", schema.deprecated),
    ] {
        if flag {
            obj.insert(key.into(), Value::Bool(true));
        }
    }
    for (key, value) in &schema.extensions {
        obj.insert(key.clone(), value.clone());
    }

    Value::Object(obj)
}

/// Integral bounds are written as integers so `minimum: 1` survives a
/// round trip unchanged.
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_array_with_null_becomes_flag() {
        let schema = schema_from_value(&json!({"type": ["string", "null"]}));
        assert_eq!(schema.schema_type.as_deref(), Some("string"));
        assert!(schema.nullable);

        let schema = schema_from_value(&json!({"type": ["null", "integer", "string"]}));
        assert_eq!(schema.schema_type.as_deref(), Some("integer"));
        assert!(schema.nullable);
    }

    #[test]
    fn nullable_keywords_map_to_flag() {
        assert!(schema_from_value(&json!({"type": "string", "nullable": true})).nullable);
        let legacy = schema_from_value(&json!({"type": "string", "x-nullable": true}));
        assert!(legacy.nullable);
        assert!(legacy.extensions.is_empty());
    }

    #[test]
    fn nullable_written_per_dialect() {
        let schema = Schema {
            schema_type: Some("string".into()),
            nullable: true,
            ..Schema::default()
        };
        assert_eq!(
            schema_to_value(&schema, SchemaDialect::OPENAPI_31),
            json!({"type": ["string", "null"]})
        );
        assert_eq!(
            schema_to_value(&schema, SchemaDialect::OPENAPI_30),
            json!({"type": "string"})
        );
        assert_eq!(
            schema_to_value(&schema, SchemaDialect::OPENAPI_2),
            json!({"type": "string"})
        );
        assert_eq!(
            schema_to_value(&schema, SchemaDialect::OPENAPI_30.with_nullable_keywords()),
            json!({"type": "string", "nullable": true})
        );
        assert_eq!(
            schema_to_value(&schema, SchemaDialect::OPENAPI_2.with_nullable_keywords()),
            json!({"type": "string", "x-nullable": true})
        );
        assert_eq!(
            SchemaDialect::OPENAPI_31.with_nullable_keywords(),
            SchemaDialect::OPENAPI_31
        );
    }

    #[test]
    fn ref_is_leaf_and_rewritten() {
        let schema = schema_from_value(&json!({
            "$ref": "#/definitions/Pet",
            "description": "ignored"
        }));
        assert_eq!(schema.ref_name(), Some("Pet"));
        assert!(schema.description.is_none());

        assert_eq!(
            schema_to_value(&schema, SchemaDialect::OPENAPI_2),
            json!({"$ref": "#/definitions/Pet"})
        );
        assert_eq!(
            schema_to_value(&schema, SchemaDialect::OPENAPI_30),
            json!({"$ref": "#/components/schemas/Pet"})
        );
    }

    #[test]
    fn nested_structure_round_trips() {
        let source = json!({
            "type": "object",
            "required": ["id"],
            "properties": {
                "id": {"type": "integer", "format": "int64", "minimum": 1},
                "tags": {"type": "array", "items": {"$ref": "#/components/schemas/Tag"}},
                "meta": {"type": "object", "additionalProperties": {"type": "string"}}
            },
            "x-internal": true
        });
        let schema = schema_from_value(&source);
        assert!(schema.is_required("id"));
        assert_eq!(schema.properties["id"].minimum, Some(1.0));
        assert_eq!(
            schema.properties["tags"].items.as_ref().and_then(|s| s.ref_name()),
            Some("Tag")
        );
        assert_eq!(schema_to_value(&schema, SchemaDialect::OPENAPI_30), source);
    }

    #[test]
    fn examples_array_supplies_example() {
        let schema = schema_from_value(&json!({"type": "string", "examples": ["a", "b"]}));
        assert_eq!(schema.example, Some(json!("a")));
    }
}
