//! Property bullets: `name: example (type, required) - description`.

use serde_json::Value;
use specbridge_model::{Schema, PRIMITIVE_TYPES};

/// One parsed property bullet.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Property {
    pub name: String,
    pub example: Option<String>,
    /// A recognized type keyword.
    pub kind: Option<String>,
    /// `Name` of an `array[Name]` attribute.
    pub items: Option<String>,
    pub required: bool,
    pub nullable: bool,
    pub description: Option<String>,
}

/// Strip a leading `+ ` or `- ` bullet.
pub(crate) fn bullet_text(trimmed: &str) -> Option<&str> {
    trimmed
        .strip_prefix("+ ")
        .or_else(|| trimmed.strip_prefix("- "))
        .map(str::trim)
}

/// Parse the text of a property bullet (bullet marker already removed).
///
/// The attribute list is the first parenthesized group followed by the end
/// of the line or a `-`. Unknown attribute tokens are ignored.
pub(crate) fn parse_property(text: &str) -> Option<Property> {
    let (head, attributes, description) = match attribute_group(text) {
        Some((open, close)) => {
            let tail = text[close + 1..].trim_start();
            let description = tail.strip_prefix('-').map(str::trim);
            (&text[..open], Some(&text[open + 1..close]), description)
        }
        None => match text.split_once(" - ") {
            Some((head, desc)) => (head, None, Some(desc.trim())),
            None => (text, None, None),
        },
    };

    let (name, example) = match head.split_once(':') {
        Some((name, example)) => (name, Some(example.trim())),
        None => (head, None),
    };
    let name = name.trim().trim_matches('`').trim();
    if name.is_empty() {
        return None;
    }

    let mut property = Property {
        name: name.to_string(),
        example: example
            .map(|e| e.trim_matches('`'))
            .filter(|e| !e.is_empty())
            .map(str::to_string),
        description: description.filter(|d| !d.is_empty()).map(str::to_string),
        ..Property::default()
    };

    for token in attributes.unwrap_or_default().split(',').map(str::trim) {
        match token {
            "required" => property.required = true,
            "optional" => property.required = false,
            "nullable" => property.nullable = true,
            "string" | "number" | "boolean" | "array" | "object" => {
                property.kind = Some(token.to_string())
            }
            _ => {
                if let Some(inner) = token
                    .strip_prefix("array[")
                    .and_then(|t| t.strip_suffix(']'))
                {
                    property.kind = Some("array".to_string());
                    property.items = Some(inner.trim().to_string()).filter(|s| !s.is_empty());
                }
            }
        }
    }
    Some(property)
}

fn attribute_group(text: &str) -> Option<(usize, usize)> {
    for (open, _) in text.match_indices('(') {
        let Some(rel) = text[open..].find(')') else {
            return None;
        };
        let close = open + rel;
        let after = text[close + 1..].trim_start();
        if after.is_empty() || after.starts_with('-') {
            return Some((open, close));
        }
    }
    None
}

impl Property {
    /// The IR schema of this property; `members` are its nested bullets.
    pub(crate) fn to_schema(&self, members: &[Property]) -> Schema {
        let mut schema = match (self.kind.as_deref(), &self.items) {
            (Some("array"), Some(items)) => Schema::array_of(Schema::reference(items)),
            (Some(kind), _) => Schema::typed(kind),
            (None, _) if !members.is_empty() => Schema::typed("object"),
            (None, _) => Schema::default(),
        };
        for member in members {
            schema.insert_property(member.name.clone(), member.to_schema(&[]), member.required);
        }
        schema.nullable = self.nullable;
        schema.description = self.description.clone();
        schema.example = self.example.as_deref().map(|e| example_value(e, schema.schema_type.as_deref()));
        schema
    }
}

/// Interpret an inline example according to the property type.
pub(crate) fn example_value(example: &str, kind: Option<&str>) -> Value {
    match kind {
        Some("number") | Some("integer") | Some("boolean") => {
            serde_json::from_str(example).unwrap_or_else(|_| Value::String(example.to_string()))
        }
        Some("array") => Value::Array(
            example
                .split(',')
                .map(|s| Value::String(s.trim().to_string()))
                .collect(),
        ),
        _ => Value::String(example.to_string()),
    }
}

/// Render an example back into bullet text; objects have no inline form.
pub(crate) fn example_text(example: &Value) -> Option<String> {
    match example {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Option<Vec<String>> = items
                .iter()
                .map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect();
            parts.map(|p| p.join(", "))
        }
        _ => None,
    }
}

/// The type keyword written for a schema. Integers are written as `number`;
/// references have no keyword of their own and are written as `object`.
pub(crate) fn kind_token(schema: &Schema) -> Option<String> {
    if schema.is_ref() {
        return Some("object".to_string());
    }
    match schema.schema_type.as_deref() {
        Some("array") => Some(
            match schema.items.as_deref().and_then(Schema::ref_name) {
                Some(name) => format!("array[{}]", name),
                None => "array".to_string(),
            },
        ),
        Some("integer") => Some("number".to_string()),
        Some(kind) if PRIMITIVE_TYPES.contains(&kind) => Some(kind.to_string()),
        _ if !schema.properties.is_empty() => Some("object".to_string()),
        _ => None,
    }
}

/// Render one property bullet (without indentation).
pub(crate) fn format_property(name: &str, schema: &Schema, required: bool) -> String {
    let mut line = format!("+ {}", name);
    if let Some(example) = schema.example.as_ref().and_then(example_text) {
        if !example.is_empty() {
            line.push_str(": ");
            line.push_str(&example);
        }
    }

    let mut attributes: Vec<String> = kind_token(schema).into_iter().collect();
    if required {
        attributes.push("required".to_string());
    }
    if schema.nullable {
        attributes.push("nullable".to_string());
    }
    if !attributes.is_empty() {
        line.push_str(&format!(" ({})", attributes.join(", ")));
    }
    if let Some(description) = &schema.description {
        let single: Vec<&str> = description.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if !single.is_empty() {
            line.push_str(" - ");
            line.push_str(&single.join(" "));
        }
    }
    line
}
