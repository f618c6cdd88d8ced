//! Recursive schema tree shared by every format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical prefix every schema reference is normalized to.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// The six primitive kinds a schema `type` may take.
pub const PRIMITIVE_TYPES: &[&str] = &["string", "number", "integer", "boolean", "array", "object"];

/// Build a canonical schema reference for `name`.
pub fn schema_ref(name: &str) -> String {
    format!("{}{}", SCHEMA_REF_PREFIX, name)
}

/// Extract the schema name from a canonical reference.
///
/// Returns `None` for anything not rooted at `#/components/schemas/`.
pub fn ref_name(reference: &str) -> Option<&str> {
    reference
        .strip_prefix(SCHEMA_REF_PREFIX)
        .filter(|name| !name.is_empty())
}

/// `additionalProperties` is either a boolean switch or a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<Schema>),
}

/// A schema node.
///
/// `reference` is exclusive with `schema_type` and `properties`: a node built
/// with [`Schema::reference`] is always a leaf. Nullability is carried as a
/// flag rather than as a `"null"` member of a type union.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Schema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub write_only: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,

    /// Vendor extensions (`x-*`), passed through best-effort.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Value>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Schema {
    /// A reference leaf pointing at the named component schema.
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(schema_ref(name)),
            ..Self::default()
        }
    }

    /// A schema with only its `type` set.
    pub fn typed(kind: &str) -> Self {
        Self {
            schema_type: Some(kind.to_string()),
            ..Self::default()
        }
    }

    /// An array schema whose items are `items`.
    pub fn array_of(items: Schema) -> Self {
        Self {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    /// The component name this node references, if it is a canonical ref.
    pub fn ref_name(&self) -> Option<&str> {
        self.reference.as_deref().and_then(ref_name)
    }

    pub fn is_ref(&self) -> bool {
        self.reference.is_some()
    }

    pub fn type_is(&self, kind: &str) -> bool {
        self.schema_type.as_deref() == Some(kind)
    }

    /// Whether `name` is listed as a required property.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Add a property, recording it as required when asked.
    pub fn insert_property(&mut self, name: impl Into<String>, schema: Schema, required: bool) {
        let name = name.into();
        if required && !self.is_required(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_ref_helpers() {
        assert_eq!(schema_ref("Pet"), "#/components/schemas/Pet");
        assert_eq!(ref_name("#/components/schemas/Pet"), Some("Pet"));
        assert_eq!(ref_name("#/definitions/Pet"), None);
        assert_eq!(ref_name("#/components/schemas/"), None);
    }

    #[test]
    fn reference_node_is_a_leaf() {
        let s = Schema::reference("User");
        assert_eq!(s.ref_name(), Some("User"));
        assert!(s.schema_type.is_none());
        assert!(s.properties.is_empty());
    }

    #[test]
    fn insert_property_tracks_required_once() {
        let mut s = Schema::typed("object");
        s.insert_property("id", Schema::typed("integer"), true);
        s.insert_property("id", Schema::typed("integer"), true);
        s.insert_property("name", Schema::typed("string"), false);
        assert_eq!(s.required, vec!["id".to_string()]);
        assert_eq!(s.properties.len(), 2);
    }
}
