//! Reference rewriting between native reference roots and the canonical
//! `#/components/schemas/<name>` form.

use specbridge_model::{ref_name, schema_ref};

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const MESSAGES_PREFIX: &str = "#/components/messages/";

/// Native root a writer rewrites canonical references to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefRoot {
    /// `#/definitions/` (OpenAPI 2.0).
    Definitions,
    /// `#/components/schemas/` (OpenAPI 3.x, AsyncAPI).
    Components,
}

/// Normalize a native reference. Legacy definitions and message refs land
/// under `#/components/schemas/`; anything else is returned unchanged.
pub fn canonicalize(reference: &str) -> String {
    if let Some(name) = reference.strip_prefix(DEFINITIONS_PREFIX) {
        schema_ref(name)
    } else if let Some(name) = reference.strip_prefix(MESSAGES_PREFIX) {
        schema_ref(name)
    } else {
        reference.to_string()
    }
}

/// Rewrite a canonical reference to the target root.
pub fn to_native(reference: &str, root: RefRoot) -> String {
    match (root, ref_name(reference)) {
        (RefRoot::Definitions, Some(name)) => format!("{}{}", DEFINITIONS_PREFIX, name),
        _ => reference.to_string(),
    }
}

/// Last segment of a local reference, whatever its root.
pub fn last_segment(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}
