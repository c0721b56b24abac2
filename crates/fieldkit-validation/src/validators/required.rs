//! Required value validator

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use serde_json::Value;

/// Fails when a value is missing.
///
/// By default blank strings and empty collections count as missing; with
/// [`RequiredValidator::allow_blank`] only `null` does.
#[derive(Debug, Clone, Default)]
pub struct RequiredValidator {
    pub message: Option<String>,
    pub allow_blank: bool,
}

impl RequiredValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            allow_blank: false,
        }
    }

    /// Only `null` is treated as missing
    pub fn allow_blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    fn is_missing(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            _ if self.allow_blank => false,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl ValidationRule for RequiredValidator {
    fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if !self.is_missing(value) {
            return Ok(());
        }
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("{} is required", field));
        Err(ValidationError::with_code(field, message, "required").into())
    }

    fn rule_name(&self) -> &'static str {
        "required"
    }

    fn parameters(&self) -> Option<Value> {
        Some(serde_json::json!({
            "allow_blank": self.allow_blank,
            "message": self.message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_null_and_blank() {
        let validator = RequiredValidator::new();
        assert!(validator.validate(&Value::Null, "email").is_err());
        assert!(validator.validate(&Value::String("   ".into()), "name").is_err());
        assert!(validator.validate(&Value::Array(vec![]), "tags").is_err());
        assert!(validator.validate(&Value::String("John".into()), "name").is_ok());
        assert!(validator.validate(&Value::from(0), "count").is_ok());
    }

    #[test]
    fn test_allow_blank_only_rejects_null() {
        let validator = RequiredValidator::new().allow_blank();
        assert!(validator.validate(&Value::String(String::new()), "name").is_ok());
        assert!(validator.validate(&Value::Array(vec![]), "tags").is_ok());
        assert!(validator.validate(&Value::Null, "name").is_err());
    }

    #[test]
    fn test_required_messages() {
        let errors = RequiredValidator::new()
            .validate(&Value::Null, "email")
            .unwrap_err();
        let email_errors = errors.get_field_errors("email").unwrap();
        assert_eq!(email_errors[0].message, "email is required");
        assert_eq!(email_errors[0].code, "required");

        let errors = RequiredValidator::with_message("Field is required")
            .validate(&Value::Null, "email")
            .unwrap_err();
        assert_eq!(errors.messages(), vec!["Field is required"]);
    }
}
