//! The document root and its registries.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::{Method, Parameter, PathItem, RequestBody, Response};
use crate::schema::Schema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Document metadata. `title` is non-empty after any successful parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerVariable {
    pub default: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Transport protocol; only meaningful for pub/sub documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, ServerVariable>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, Value>,
}

impl Server {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Scheme name → required scopes.
pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

/// Name-keyed reusable registries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: BTreeMap<String, Arc<Schema>>,
    #[serde(default)]
    pub responses: BTreeMap<String, Response>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Parameter>,
    #[serde(default)]
    pub request_bodies: BTreeMap<String, RequestBody>,
    /// Passed through untranslated.
    #[serde(default)]
    pub security_schemes: BTreeMap<String, Value>,
}

impl Components {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
            && self.responses.is_empty()
            && self.parameters.is_empty()
            && self.request_bodies.is_empty()
            && self.security_schemes.is_empty()
    }
}

/// The canonical API document.
///
/// `Clone` is shallow by contract: the top-level maps are recreated while path
/// items, webhooks and component schemas stay shared behind `Arc`. Mutation
/// through [`Api::path_mut`] and friends is copy-on-write, so editing one clone
/// never shows through another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Api {
    /// Format version of the document this value was parsed from.
    pub version: String,
    pub info: Info,
    #[serde(default)]
    pub servers: Vec<Server>,
    /// Path (or channel address) → item.
    #[serde(default)]
    pub paths: BTreeMap<String, Arc<PathItem>>,
    #[serde(default)]
    pub webhooks: BTreeMap<String, Arc<PathItem>>,
    #[serde(default)]
    pub components: Components,
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub extensions: BTreeMap<String, Value>,
}

impl Api {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: Info {
                title: title.into(),
                version: version.into(),
                ..Info::default()
            },
            ..Self::default()
        }
    }

    /// Insert or replace the item at `path`.
    pub fn add_path(&mut self, path: impl Into<String>, item: PathItem) {
        self.paths.insert(path.into(), Arc::new(item));
    }

    pub fn path(&self, path: &str) -> Option<&PathItem> {
        self.paths.get(path).map(Arc::as_ref)
    }

    /// Mutable access to an existing item (copy-on-write).
    pub fn path_mut(&mut self, path: &str) -> Option<&mut PathItem> {
        self.paths.get_mut(path).map(Arc::make_mut)
    }

    /// Get-or-insert the item at `path`.
    pub fn path_entry(&mut self, path: &str) -> &mut PathItem {
        Arc::make_mut(self.paths.entry(path.to_string()).or_default())
    }

    pub fn add_schema(&mut self, name: impl Into<String>, schema: Schema) {
        self.components.schemas.insert(name.into(), Arc::new(schema));
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.components.schemas.get(name).map(Arc::as_ref)
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.components.schemas.contains_key(name)
    }

    /// Operation in the given verb slot of `path`.
    pub fn operation(&self, path: &str, method: Method) -> Option<&crate::Operation> {
        self.path(path).and_then(|item| item.operation(method))
    }

    /// Fill in missing operation IDs and make every ID unique.
    ///
    /// Missing IDs are synthesized from verb and path (`GET /users/{id}` →
    /// `getUsersId`). Collisions keep the first holder and suffix later ones
    /// with `_2`, `_3`, ... in path order.
    pub fn ensure_operation_ids(&mut self) {
        let mut seen: HashSet<String> = HashSet::new();
        for map in [&mut self.paths, &mut self.webhooks] {
            for (path, item) in map.iter_mut() {
                let settled = item.operations().all(|(_, op)| {
                    op.operation_id
                        .as_deref()
                        .is_some_and(|id| !id.is_empty() && !seen.contains(id))
                });
                if settled {
                    let ids: Vec<&str> = item
                        .operations()
                        .filter_map(|(_, op)| op.operation_id.as_deref())
                        .collect();
                    let unique: HashSet<&str> = ids.iter().copied().collect();
                    if unique.len() == ids.len() {
                        seen.extend(unique.into_iter().map(str::to_string));
                        continue;
                    }
                }
                for (method, op) in Arc::make_mut(item).operations_mut() {
                    let base = match op.operation_id.as_deref() {
                        Some(id) if !id.is_empty() => id.to_string(),
                        _ => synthesize_operation_id(method, path),
                    };
                    let mut candidate = base.clone();
                    let mut n = 2;
                    while seen.contains(&candidate) {
                        candidate = format!("{}_{}", base, n);
                        n += 1;
                    }
                    seen.insert(candidate.clone());
                    op.operation_id = Some(candidate);
                }
            }
        }
    }
}

/// `<verb><PascalCasedSegments>`: `GET /users/{id}` → `getUsersId`.
pub fn synthesize_operation_id(method: Method, path: &str) -> String {
    let mut id = method.as_str().to_string();
    for word in path
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            id.push(first.to_ascii_uppercase());
            id.push_str(chars.as_str());
        }
    }
    id
}
