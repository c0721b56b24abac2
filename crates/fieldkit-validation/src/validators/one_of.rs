//! Allowed-values validator

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use serde_json::Value;

/// Accepts only values from a fixed list. Comparison is on the exported
/// JSON value, so `1` and `"1"` are different.
#[derive(Debug, Clone, Default)]
pub struct OneOfValidator {
    pub allowed: Vec<Value>,
    pub message: Option<String>,
}

impl OneOfValidator {
    pub fn new(allowed: impl IntoIterator<Item = Value>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
            message: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn describe(&self) -> String {
        self.allowed
            .iter()
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl ValidationRule for OneOfValidator {
    fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if value.is_null() || self.allowed.is_empty() || self.allowed.contains(value) {
            return Ok(());
        }
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("{} must be one of: {}", field, self.describe()));
        Err(ValidationError::with_code(field, message, "not_in_list").into())
    }

    fn rule_name(&self) -> &'static str {
        "one_of"
    }

    fn parameters(&self) -> Option<Value> {
        Some(Value::Array(self.allowed.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_of() {
        let validator = OneOfValidator::new(["active".into(), "pending".into()]);
        assert!(validator.validate(&Value::String("active".into()), "status").is_ok());

        let errors = validator
            .validate(&Value::String("unknown".into()), "status")
            .unwrap_err();
        assert_eq!(errors.messages(), vec!["status must be one of: active, pending"]);
    }

    #[test]
    fn test_empty_list_accepts_everything() {
        let validator = OneOfValidator::default();
        assert!(validator.validate(&Value::from(3), "n").is_ok());
    }

    #[test]
    fn test_compares_json_values_strictly() {
        let validator = OneOfValidator::new([Value::from(1), Value::from(2)]);
        assert!(validator.validate(&Value::from(2), "n").is_ok());
        assert!(validator.validate(&Value::String("2".into()), "n").is_err());
    }
}
