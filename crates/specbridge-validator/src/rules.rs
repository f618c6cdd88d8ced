//! Built-in rules.

use std::collections::{BTreeMap, HashMap};

use specbridge_model::{
    ref_name, AdditionalProperties, Api, MediaType, Operation, Parameter, PathItem, Schema,
    PRIMITIVE_TYPES,
};

use crate::{Rule, Severity, ValidationError};

/// E5001: path keys must start with `/`.
pub const PATH_PREFIX: &str = "E5001";
/// E5002: schema `type` outside the primitive set.
pub const SCHEMA_TYPE: &str = "E5002";
/// E5003: `$ref` to a schema name that is not registered.
pub const UNRESOLVED_REF: &str = "E5003";
/// W5001: an operation ID used more than once.
pub const DUPLICATE_OPERATION_ID: &str = "W5001";

/// Every path key starts with `/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathPrefix;

impl Rule for PathPrefix {
    fn name(&self) -> &str {
        "path-prefix"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn validate(&self, api: &Api) -> Vec<ValidationError> {
        api.paths
            .keys()
            .filter(|path| !path.starts_with('/'))
            .map(|path| {
                ValidationError::new(self, PATH_PREFIX, format!("path '{}' must start with '/'", path))
                    .at(format!("paths.{}", path))
            })
            .collect()
    }
}

/// Every schema `type`, where set, is one of the JSON Schema primitives.
/// Walks the whole schema tree, composition included.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaType;

impl SchemaType {
    fn check(&self, schema: &Schema, location: &str, out: &mut Vec<ValidationError>) {
        if let Some(kind) = schema.schema_type.as_deref() {
            if !PRIMITIVE_TYPES.contains(&kind) {
                out.push(
                    ValidationError::new(self, SCHEMA_TYPE, format!("invalid schema type '{}'", kind))
                        .at(location),
                );
            }
        }
        for (name, property) in &schema.properties {
            self.check(property, &format!("{}.properties.{}", location, name), out);
        }
        if let Some(items) = &schema.items {
            self.check(items, &format!("{}.items", location), out);
        }
        if let Some(AdditionalProperties::Schema(extra)) = &schema.additional_properties {
            self.check(extra, &format!("{}.additionalProperties", location), out);
        }
        for (key, branches) in [
            ("allOf", &schema.all_of),
            ("anyOf", &schema.any_of),
            ("oneOf", &schema.one_of),
        ] {
            for (i, branch) in branches.iter().enumerate() {
                self.check(branch, &format!("{}.{}[{}]", location, key, i), out);
            }
        }
        if let Some(not) = &schema.not {
            self.check(not, &format!("{}.not", location), out);
        }
    }
}

impl Rule for SchemaType {
    fn name(&self) -> &str {
        "schema-type"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn validate(&self, api: &Api) -> Vec<ValidationError> {
        let mut out = Vec::new();
        for_each_schema(api, |schema, location| self.check(schema, location, &mut out));
        out
    }
}

/// Every `$ref` resolves to a registered schema name.
///
/// Recursion follows only `properties` and `items`; references inside
/// `allOf`/`anyOf`/`oneOf`/`not` are not checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefResolution;

impl RefResolution {
    fn check(&self, api: &Api, schema: &Schema, location: &str, out: &mut Vec<ValidationError>) {
        if let Some(reference) = schema.reference.as_deref() {
            let resolved = ref_name(reference).is_some_and(|name| api.has_schema(name));
            if !resolved {
                out.push(
                    ValidationError::new(self, UNRESOLVED_REF, format!("unresolved $ref '{}'", reference))
                        .at(location),
                );
            }
            return;
        }
        for (name, property) in &schema.properties {
            self.check(api, property, &format!("{}.properties.{}", location, name), out);
        }
        if let Some(items) = &schema.items {
            self.check(api, items, &format!("{}.items", location), out);
        }
    }
}

impl Rule for RefResolution {
    fn name(&self) -> &str {
        "ref-resolution"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn validate(&self, api: &Api) -> Vec<ValidationError> {
        let mut out = Vec::new();
        for_each_schema(api, |schema, location| self.check(api, schema, location, &mut out));
        out
    }
}

/// Operation IDs are unique across paths and webhooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationIdUnique;

impl Rule for OperationIdUnique {
    fn name(&self) -> &str {
        "operation-id-unique"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn validate(&self, api: &Api) -> Vec<ValidationError> {
        let mut seen: HashMap<&str, String> = HashMap::new();
        let mut out = Vec::new();
        for (prefix, map) in [("paths", &api.paths), ("webhooks", &api.webhooks)] {
            for (path, item) in map {
                for (method, op) in item.operations() {
                    let Some(id) = op.operation_id.as_deref() else {
                        continue;
                    };
                    let location = format!("{}.{}.{}", prefix, path, method.as_str());
                    match seen.get(id) {
                        Some(first) => out.push(
                            ValidationError::new(
                                self,
                                DUPLICATE_OPERATION_ID,
                                format!("duplicate operationId '{}' (first at {})", id, first),
                            )
                            .at(location),
                        ),
                        None => {
                            seen.insert(id, location);
                        }
                    }
                }
            }
        }
        out
    }
}

/// Visit every root schema reachable from components, parameters, request
/// bodies and responses, with a dotted location.
fn for_each_schema(api: &Api, mut visit: impl FnMut(&Schema, &str)) {
    let components = &api.components;
    for (name, schema) in &components.schemas {
        visit(schema.as_ref(), &format!("components.schemas.{}", name));
    }
    for (name, parameter) in &components.parameters {
        parameter_schemas(parameter, &format!("components.parameters.{}", name), &mut visit);
    }
    for (name, body) in &components.request_bodies {
        content_schemas(&body.content, &format!("components.requestBodies.{}", name), &mut visit);
    }
    for (name, response) in &components.responses {
        content_schemas(&response.content, &format!("components.responses.{}", name), &mut visit);
    }

    for (prefix, map) in [("paths", &api.paths), ("webhooks", &api.webhooks)] {
        for (path, item) in map {
            item_schemas(item, &format!("{}.{}", prefix, path), &mut visit);
        }
    }
}

fn item_schemas(item: &PathItem, location: &str, visit: &mut impl FnMut(&Schema, &str)) {
    for parameter in &item.parameters {
        let at = format!("{}.parameters.{}", location, parameter.name);
        parameter_schemas(parameter, &at, visit);
    }
    for (method, op) in item.operations() {
        operation_schemas(op, &format!("{}.{}", location, method.as_str()), visit);
    }
}

fn operation_schemas(op: &Operation, location: &str, visit: &mut impl FnMut(&Schema, &str)) {
    for parameter in &op.parameters {
        let at = format!("{}.parameters.{}", location, parameter.name);
        parameter_schemas(parameter, &at, visit);
    }
    if let Some(body) = &op.request_body {
        content_schemas(&body.content, &format!("{}.requestBody", location), visit);
    }
    for (code, response) in &op.responses {
        content_schemas(&response.content, &format!("{}.responses.{}", location, code), visit);
    }
}

fn parameter_schemas(parameter: &Parameter, location: &str, visit: &mut impl FnMut(&Schema, &str)) {
    if let Some(schema) = &parameter.schema {
        visit(schema, location);
    }
    content_schemas(&parameter.content, location, visit);
}

fn content_schemas(
    content: &BTreeMap<String, MediaType>,
    location: &str,
    visit: &mut impl FnMut(&Schema, &str),
) {
    for (media, entry) in content {
        if let Some(schema) = &entry.schema {
            visit(schema, &format!("{}.content.{}", location, media));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specbridge_model::{Method, RequestBody, Response};

    fn json_content(schema: Schema) -> BTreeMap<String, MediaType> {
        let mut content = BTreeMap::new();
        content.insert("application/json".to_string(), MediaType::with_schema(schema));
        content
    }

    fn api_with_response(schema: Schema) -> Api {
        let mut api = Api::new("T", "1");
        let mut op = Operation::default();
        op.responses.insert(
            "200".to_string(),
            Response {
                description: "OK".to_string(),
                content: json_content(schema),
            },
        );
        api.path_entry("/pets").set_operation(Method::Get, op);
        api
    }

    #[test]
    fn path_prefix_reports_each_bad_key() {
        let mut api = Api::new("T", "1");
        api.path_entry("/ok");
        api.path_entry("evt");
        api.path_entry("other");
        let results = PathPrefix.validate(&api);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].code, PATH_PREFIX);
        assert_eq!(results[0].location.as_deref(), Some("paths.evt"));
    }

    #[test]
    fn schema_type_walks_composition() {
        let mut schema = Schema::typed("object");
        schema.insert_property("name", Schema::typed("text"), false);
        schema.one_of.push(Schema::typed("date"));
        let api = api_with_response(schema);
        let results = SchemaType.validate(&api);
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].location.as_deref(),
            Some("paths./pets.get.responses.200.content.application/json.properties.name")
        );
        assert!(results[1].location.as_deref().is_some_and(|l| l.ends_with("oneOf[0]")));
    }

    #[test]
    fn integer_is_a_valid_type() {
        let api = api_with_response(Schema::array_of(Schema::typed("integer")));
        assert!(SchemaType.validate(&api).is_empty());
    }

    #[test]
    fn one_error_per_unresolved_occurrence() {
        let mut schema = Schema::typed("object");
        schema.insert_property("owner", Schema::reference("User"), true);
        schema.insert_property("friends", Schema::array_of(Schema::reference("User")), false);
        let mut api = api_with_response(schema);
        api.add_schema("Pet", Schema::reference("Missing"));

        let results = RefResolution.validate(&api);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.code == UNRESOLVED_REF));
        assert_eq!(results[0].location.as_deref(), Some("components.schemas.Pet"));
    }

    #[test]
    fn resolved_refs_pass() {
        let mut api = api_with_response(Schema::array_of(Schema::reference("Pet")));
        api.add_schema("Pet", Schema::typed("object"));
        assert!(RefResolution.validate(&api).is_empty());
    }

    #[test]
    fn ref_resolution_skips_composition_branches() {
        let schema = Schema {
            all_of: vec![Schema::reference("Missing")],
            any_of: vec![Schema::reference("AlsoMissing")],
            ..Schema::default()
        };
        let api = api_with_response(schema);
        assert!(RefResolution.validate(&api).is_empty());
    }

    #[test]
    fn refs_in_request_bodies_and_parameters_are_checked() {
        let mut api = Api::new("T", "1");
        let op = Operation {
            parameters: vec![Parameter {
                name: "filter".to_string(),
                schema: Some(Schema::reference("Filter")),
                ..Parameter::default()
            }],
            request_body: Some(RequestBody {
                content: json_content(Schema::reference("Body")),
                ..RequestBody::default()
            }),
            ..Operation::default()
        };
        api.path_entry("/search").set_operation(Method::Post, op);
        let results = RefResolution.validate(&api);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn non_canonical_refs_do_not_resolve() {
        let mut api = api_with_response(Schema {
            reference: Some("other.yaml#/Pet".to_string()),
            ..Schema::default()
        });
        api.add_schema("Pet", Schema::typed("object"));
        assert_eq!(RefResolution.validate(&api).len(), 1);
    }

    #[test]
    fn duplicate_operation_ids_warn() {
        let mut api = Api::new("T", "1");
        let op = |id: &str| Operation {
            operation_id: Some(id.to_string()),
            ..Operation::default()
        };
        api.path_entry("/a").set_operation(Method::Get, op("list"));
        api.path_entry("/b").set_operation(Method::Get, op("list"));
        api.path_entry("/b").set_operation(Method::Post, op("create"));

        let results = OperationIdUnique.validate(&api);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].severity, Severity::Warning);
        assert_eq!(results[0].location.as_deref(), Some("paths./b.get"));
        assert!(results[0].message.contains("paths./a.get"));
    }
}
