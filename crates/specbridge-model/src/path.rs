//! Resources, channels and the operations bound to their verb slots.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::Schema;

/// The eight verb slots of a [`PathItem`], in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl Method {
    pub const ALL: [Method; 8] = [
        Method::Get,
        Method::Put,
        Method::Post,
        Method::Delete,
        Method::Options,
        Method::Head,
        Method::Patch,
        Method::Trace,
    ];

    /// Lowercase name as used for OpenAPI path item keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Put => "put",
            Method::Post => "post",
            Method::Delete => "delete",
            Method::Options => "options",
            Method::Head => "head",
            Method::Patch => "patch",
            Method::Trace => "trace",
        }
    }

    /// Uppercase name as used in Blueprint action headings.
    pub fn as_upper(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
            Method::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upper())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown method '{}'", s))
    }
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    #[default]
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }
}

/// A schema (and example) for one media type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

impl MediaType {
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema: Some(schema),
            example: None,
        }
    }
}

/// An operation parameter. `(name, location)` is unique per operation.
///
/// Producers set either `schema` or `content`, never both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Media type → payload.
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
}

/// One request/response (or publish/subscribe) contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The first tag selects the Blueprint group on write.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Keyed by status-code-like strings ("200", "4XX", "default").
    #[serde(default)]
    pub responses: BTreeMap<String, Response>,
    #[serde(default)]
    pub deprecated: bool,
    /// Opaque protocol bindings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Value>,
}

impl Operation {
    /// Whether any response is keyed in the 4xx range.
    pub fn has_client_error_response(&self) -> bool {
        self.responses.keys().any(|code| code.starts_with('4'))
    }

    /// Find a parameter by `(name, location)`.
    pub fn parameter(&self, name: &str, location: ParameterLocation) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name == name && p.location == location)
    }
}

/// A REST resource or pub/sub channel: up to eight verb-keyed operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    /// Channel ID when it differs from the path key (the address).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parameters shared by every operation on this path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, Value>,
}

impl PathItem {
    fn slot(&self, method: Method) -> &Option<Operation> {
        match method {
            Method::Get => &self.get,
            Method::Put => &self.put,
            Method::Post => &self.post,
            Method::Delete => &self.delete,
            Method::Options => &self.options,
            Method::Head => &self.head,
            Method::Patch => &self.patch,
            Method::Trace => &self.trace,
        }
    }

    fn slot_mut(&mut self, method: Method) -> &mut Option<Operation> {
        match method {
            Method::Get => &mut self.get,
            Method::Put => &mut self.put,
            Method::Post => &mut self.post,
            Method::Delete => &mut self.delete,
            Method::Options => &mut self.options,
            Method::Head => &mut self.head,
            Method::Patch => &mut self.patch,
            Method::Trace => &mut self.trace,
        }
    }

    pub fn operation(&self, method: Method) -> Option<&Operation> {
        self.slot(method).as_ref()
    }

    pub fn operation_mut(&mut self, method: Method) -> Option<&mut Operation> {
        self.slot_mut(method).as_mut()
    }

    /// Place `operation` in the verb slot, returning whatever occupied it.
    pub fn set_operation(&mut self, method: Method, operation: Operation) -> Option<Operation> {
        self.slot_mut(method).replace(operation)
    }

    /// Present operations in canonical verb order.
    pub fn operations(&self) -> impl Iterator<Item = (Method, &Operation)> {
        Method::ALL
            .into_iter()
            .filter_map(move |m| self.operation(m).map(|op| (m, op)))
    }

    pub fn operations_mut(&mut self) -> Vec<(Method, &mut Operation)> {
        let PathItem {
            get,
            put,
            post,
            delete,
            options,
            head,
            patch,
            trace,
            ..
        } = self;
        [
            (Method::Get, get),
            (Method::Put, put),
            (Method::Post, post),
            (Method::Delete, delete),
            (Method::Options, options),
            (Method::Head, head),
            (Method::Patch, patch),
            (Method::Trace, trace),
        ]
        .into_iter()
        .filter_map(|(m, slot)| slot.as_mut().map(|op| (m, op)))
        .collect()
    }

    /// First operation in canonical order, if any.
    pub fn first_operation(&self) -> Option<&Operation> {
        self.operations().next().map(|(_, op)| op)
    }

    pub fn is_empty(&self) -> bool {
        self.operations().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!("GET".parse::<Method>(), Ok(Method::Get));
        assert_eq!("patch".parse::<Method>(), Ok(Method::Patch));
        assert!("QUERY".parse::<Method>().is_err());
    }

    #[test]
    fn one_operation_per_slot() {
        let mut item = PathItem::default();
        let first = Operation {
            operation_id: Some("first".into()),
            ..Operation::default()
        };
        let second = Operation {
            operation_id: Some("second".into()),
            ..Operation::default()
        };
        assert!(item.set_operation(Method::Post, first).is_none());
        let replaced = item.set_operation(Method::Post, second);
        assert_eq!(replaced.and_then(|o| o.operation_id).as_deref(), Some("first"));
        assert_eq!(item.operations().count(), 1);
    }

    #[test]
    fn operations_iterate_in_canonical_order() {
        let mut item = PathItem::default();
        item.set_operation(Method::Delete, Operation::default());
        item.set_operation(Method::Get, Operation::default());
        item.set_operation(Method::Post, Operation::default());
        let order: Vec<Method> = item.operations().map(|(m, _)| m).collect();
        assert_eq!(order, vec![Method::Get, Method::Post, Method::Delete]);
    }

    #[test]
    fn detects_client_error_responses() {
        let mut op = Operation::default();
        op.responses.insert("200".into(), Response::default());
        assert!(!op.has_client_error_response());
        op.responses.insert("404".into(), Response::default());
        assert!(op.has_client_error_response());
    }
}
