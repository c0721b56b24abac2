//! Core validation traits

use crate::error::ValidationResult;
use serde_json::Value;

/// A rule checked against one exported field value.
///
/// Rules run synchronously: model validation happens inside field mutation
/// and graph traversal, which never suspend.
pub trait ValidationRule: Send + Sync {
    /// Validate a single value. `field` is the display name used in messages.
    fn validate(&self, value: &Value, field: &str) -> ValidationResult<()>;

    fn rule_name(&self) -> &'static str;

    /// Rule configuration, for introspection and error reporting
    fn parameters(&self) -> Option<Value> {
        None
    }
}
