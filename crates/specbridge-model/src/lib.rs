//! Canonical intermediate representation (IR) for API description documents.
//!
//! Every conversion parses its source into an [`Api`] and writes the target
//! from it; adapters never talk to each other. The IR holds the union of REST
//! and pub/sub concepts: pub/sub channels are path items whose publish/send
//! side sits in the POST slot and subscribe/receive side in the GET slot.

pub mod api;
pub mod path;
pub mod schema;
pub mod warning;

pub use api::{
    synthesize_operation_id, Api, Components, Contact, Info, License, SecurityRequirement, Server,
    ServerVariable, Tag,
};
pub use path::{
    MediaType, Method, Operation, Parameter, ParameterLocation, PathItem, RequestBody, Response,
};
pub use schema::{ref_name, schema_ref, AdditionalProperties, Schema, PRIMITIVE_TYPES, SCHEMA_REF_PREFIX};
pub use warning::Warning;
