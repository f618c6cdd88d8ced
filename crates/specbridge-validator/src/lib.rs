//! Structural validation of the specbridge IR.
//!
//! A [`Validator`] runs an ordered list of [`Rule`]s over an [`Api`] and
//! concatenates their findings. Built-in rules live in [`rules`]; custom
//! rules implement the same trait and are registered alongside them.

pub mod rules;

use std::fmt;

use serde::{Deserialize, Serialize};
use specbridge_model::Api;
use tracing::debug;

pub use rules::{OperationIdUnique, PathPrefix, RefResolution, SchemaType};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// One finding produced by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Name of the rule that produced it.
    pub rule: String,
    pub severity: Severity,
    /// Stable code (`E5xxx` errors, `W5xxx` warnings).
    pub code: String,
    pub message: String,
    /// Where in the document, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ValidationError {
    pub fn new(rule: &dyn Rule, code: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.name().to_string(),
            severity: rule.severity(),
            code: code.to_string(),
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{} [{}] {}: {}", self.code, self.rule, loc, self.message),
            None => write!(f, "{} [{}]: {}", self.code, self.rule, self.message),
        }
    }
}

/// A validation rule over the whole document.
pub trait Rule: Send + Sync {
    /// Short kebab-case identifier, e.g. `path-prefix`.
    fn name(&self) -> &str;

    fn severity(&self) -> Severity;

    fn validate(&self, api: &Api) -> Vec<ValidationError>;
}

/// Whether any finding is error-level.
pub fn has_errors(results: &[ValidationError]) -> bool {
    results.iter().any(ValidationError::is_error)
}

/// An ordered rule set.
pub struct Validator {
    rules: Vec<Box<dyn Rule>>,
    stop_on_first_error: bool,
}

impl Default for Validator {
    /// All built-in rules, running to completion.
    fn default() -> Self {
        Self::empty()
            .with_rule(PathPrefix)
            .with_rule(SchemaType)
            .with_rule(RefResolution)
            .with_rule(OperationIdUnique)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("rules", &self.rule_names().collect::<Vec<_>>())
            .field("stop_on_first_error", &self.stop_on_first_error)
            .finish()
    }
}

impl Validator {
    /// A validator with no rules.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            stop_on_first_error: false,
        }
    }

    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Stop after the first rule that yields an error-level finding.
    /// Warning-level findings never stop the run.
    pub fn with_stop_on_first_error(mut self, stop: bool) -> Self {
        self.stop_on_first_error = stop;
        self
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name())
    }

    pub fn validate(&self, api: &Api) -> Vec<ValidationError> {
        self.run(api, self.stop_on_first_error)
    }

    /// Run with an explicit stop-on-first-error setting for this call.
    pub fn run(&self, api: &Api, stop_on_first_error: bool) -> Vec<ValidationError> {
        let mut results = Vec::new();
        for rule in &self.rules {
            let found = rule.validate(api);
            debug!(rule = rule.name(), findings = found.len(), "rule finished");
            let failed = has_errors(&found);
            results.extend(found);
            if failed && stop_on_first_error {
                debug!(rule = rule.name(), "stopping on first error");
                break;
            }
        }
        results
    }
}
