//! Argument Validation
//!
//! The registry never interprets parameter shapes itself; it asks a
//! [`Validator`] whether an argument bag conforms before any handler runs.

use std::sync::Arc;

use jsonschema::JSONSchema;
use serde_json::Value;

/// A parameter shape prepared once, ready to check many argument bags.
pub trait PreparedShape: Send + Sync {
    /// Check `value`, returning one human-readable message per violation.
    fn check(&self, value: &Value) -> Result<(), Vec<String>>;
}

/// Checks an argument bag against a declared parameter shape.
///
/// The registry calls [`Validator::prepare`] once per tool at registration
/// time and keeps the prepared shape for every later invocation.
pub trait Validator: Send + Sync {
    /// Prepare `shape` for repeated checks.
    ///
    /// # Errors
    ///
    /// One message per problem when the shape itself is unusable.
    fn prepare(&self, shape: &Value) -> Result<Arc<dyn PreparedShape>, Vec<String>>;

    /// One-off check of `value` against `shape`.
    fn validate(&self, shape: &Value, value: &Value) -> Result<(), Vec<String>> {
        self.prepare(shape)?.check(value)
    }
}

/// JSON Schema validator backed by the `jsonschema` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSchemaValidator;

/// A compiled JSON Schema.
pub struct CompiledSchema(JSONSchema);

impl Validator for JsonSchemaValidator {
    fn prepare(&self, shape: &Value) -> Result<Arc<dyn PreparedShape>, Vec<String>> {
        let compiled = JSONSchema::compile(shape)
            .map_err(|err| vec![format!("invalid parameter shape: {err}")])?;
        Ok(Arc::new(CompiledSchema(compiled)))
    }
}

impl PreparedShape for CompiledSchema {
    fn check(&self, value: &Value) -> Result<(), Vec<String>> {
        match self.0.validate(value) {
            Ok(()) => Ok(()),
            Err(errors) => Err(errors
                .map(|err| {
                    let path = err.instance_path.to_string();
                    if path.is_empty() {
                        err.to_string()
                    } else {
                        format!("{path}: {err}")
                    }
                })
                .collect()),
        }
    }
}
