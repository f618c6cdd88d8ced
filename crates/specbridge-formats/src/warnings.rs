//! Warning codes emitted by the adapters.

/// A value was mapped with loss of detail (e.g. several servers collapsed to one).
pub const LOSSY_MAPPING: &str = "W1001";

/// An operation the target format cannot express was left out.
pub const DROPPED_OPERATION: &str = "W1002";

/// Bindings or vendor extensions were left out.
pub const DROPPED_EXTENSION: &str = "W1003";

/// Webhooks were left out.
pub const DROPPED_WEBHOOKS: &str = "W1004";

/// A construct the reader does not understand was skipped.
pub const UNSUPPORTED_CONSTRUCT: &str = "W1005";
