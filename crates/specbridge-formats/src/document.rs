//! Decoding and encoding of JSON/YAML documents, plus small accessors over
//! `serde_json::Value` trees.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use specbridge_model::Info;

use crate::error::{ParseError, WriteError};

/// Output encoding for the structured formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Json,
    #[default]
    Yaml,
}

impl Encoding {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Decode JSON or YAML bytes into a JSON value tree.
///
/// Input that starts with `{` goes through `serde_json` for precise error
/// positions; everything else is read as YAML (which also covers JSON).
pub fn decode(input: &[u8]) -> Result<Value, ParseError> {
    let text = std::str::from_utf8(input).map_err(|_| ParseError::Encoding)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    if text.trim_start().starts_with('{') {
        return serde_json::from_str(text).map_err(|e| ParseError::Syntax {
            message: e.to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
        });
    }

    let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| {
        let location = e.location();
        ParseError::Syntax {
            message: e.to_string(),
            line: location.as_ref().map(|l| l.line()),
            column: location.as_ref().map(|l| l.column()),
        }
    })?;
    Ok(yaml_to_json(yaml))
}

/// Convert a YAML tree to JSON, stringifying non-string mapping keys
/// (unquoted status codes such as `200:` are integers in YAML).
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        serde_yaml::Value::Mapping(mapping) => {
            let mut obj = Map::with_capacity(mapping.len());
            for (k, v) in mapping {
                obj.insert(yaml_key(k), yaml_to_json(v));
            }
            Value::Object(obj)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Encode a value tree: JSON with 2-space indentation, or YAML.
pub fn encode(value: &Value, encoding: Encoding, out: &mut Vec<u8>) -> Result<(), WriteError> {
    match encoding {
        Encoding::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            out.push(b'\n');
        }
        Encoding::Yaml => serde_yaml::to_writer(&mut *out, value)?,
    }
    Ok(())
}

/// String field accessor.
pub(crate) fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// A scalar rendered as a string; unquoted YAML versions (`swagger: 2.0`)
/// decode as numbers.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

pub(crate) fn obj_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    obj.get(key).and_then(Value::as_object)
}

/// Strings of an array field; non-string entries are skipped.
pub(crate) fn str_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// All `x-*` keys of an object.
pub(crate) fn extract_extensions(obj: &Map<String, Value>) -> BTreeMap<String, Value> {
    obj.iter()
        .filter(|(k, _)| k.starts_with("x-"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Opaque map field (bindings), cloned entry by entry.
pub(crate) fn value_map(obj: &Map<String, Value>, key: &str) -> BTreeMap<String, Value> {
    obj_field(obj, key)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

/// Resolve a local JSON pointer (`#/a/b`) against the document root.
pub(crate) fn resolve_pointer<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let path = reference.strip_prefix("#/")?;
    let mut current = root;
    for segment in path.split('/') {
        let unescaped = segment.replace("~1", "/").replace("~0", "~");
        current = current.get(&unescaped)?;
    }
    Some(current)
}

/// Follow `$ref` chains until a concrete object is reached.
pub(crate) fn follow_refs<'a>(root: &'a Value, value: &'a Value) -> Result<&'a Value, ParseError> {
    let mut current = value;
    for _ in 0..16 {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return Ok(current);
        };
        current = resolve_pointer(root, reference)
            .ok_or_else(|| ParseError::UnresolvedRef(reference.to_string()))?;
    }
    Err(ParseError::structure("$ref chain too deep or circular"))
}

/// Escape a key for use as a JSON pointer segment.
pub(crate) fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Insert `key: value` into `obj` when `value` is `Some`.
pub(crate) fn put_opt<T: Into<Value>>(obj: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(v) = value {
        obj.insert(key.to_string(), v.into());
    }
}

/// Insert all entries of `map` into `obj`.
pub(crate) fn put_all(obj: &mut Map<String, Value>, map: &BTreeMap<String, Value>) {
    for (k, v) in map {
        obj.insert(k.clone(), v.clone());
    }
}

/// An opaque map as a JSON object.
pub(crate) fn map_value(map: &BTreeMap<String, Value>) -> Value {
    Value::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

/// The `info` object shared by OpenAPI and AsyncAPI. An empty version is
/// written as `1.0.0`.
pub(crate) fn info_to_value(info: &Info) -> Value {
    let mut obj = Map::new();
    obj.insert("title".into(), serde_json::json!(info.title));
    put_opt(&mut obj, "description", info.description.clone());
    put_opt(&mut obj, "termsOfService", info.terms_of_service.clone());
    if let Some(contact) = &info.contact {
        let mut c = Map::new();
        put_opt(&mut c, "name", contact.name.clone());
        put_opt(&mut c, "url", contact.url.clone());
        put_opt(&mut c, "email", contact.email.clone());
        obj.insert("contact".into(), Value::Object(c));
    }
    if let Some(license) = &info.license {
        let mut l = Map::new();
        l.insert("name".into(), serde_json::json!(license.name));
        put_opt(&mut l, "url", license.url.clone());
        obj.insert("license".into(), Value::Object(l));
    }
    let version = if info.version.is_empty() {
        "1.0.0"
    } else {
        info.version.as_str()
    };
    obj.insert("version".into(), serde_json::json!(version));
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_yaml_stringifies_numeric_keys() {
        let value = decode(b"responses:\n  200:\n    description: ok\n").unwrap();
        assert_eq!(value["responses"]["200"]["description"], "ok");
    }

    #[test]
    fn decode_json_reports_line_and_column() {
        let err = decode(b"{\n  \"a\": ,\n}").unwrap_err();
        match err {
            ParseError::Syntax { line, column, .. } => {
                assert_eq!(line, Some(2));
                assert!(column.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn decode_yaml_reports_position() {
        let err = decode(b"a: [1, 2\nb: c\n").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: Some(_), .. }));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        assert!(matches!(decode(&[0xff, 0xfe, 0x00]), Err(ParseError::Encoding)));
    }

    #[test]
    fn json_output_uses_two_space_indent() {
        let mut out = Vec::new();
        encode(&serde_json::json!({"a": {"b": 1}}), Encoding::Json, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\n  \"a\": {\n    \"b\": 1\n  }"));
    }

    #[test]
    fn resolve_pointer_unescapes_segments() {
        let root = serde_json::json!({"channels": {"a/b": {"x": 1}}});
        assert_eq!(resolve_pointer(&root, "#/channels/a~1b/x"), Some(&Value::from(1)));
        assert!(resolve_pointer(&root, "other.yaml#/x").is_none());
    }

    #[test]
    fn follow_refs_detects_cycles() {
        let root = serde_json::json!({
            "a": {"$ref": "#/b"},
            "b": {"$ref": "#/a"}
        });
        assert!(follow_refs(&root, &root["a"]).is_err());
    }
}
