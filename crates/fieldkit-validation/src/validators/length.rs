//! Length constraints for strings and arrays

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct LengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub exact: Option<usize>,
    pub message: Option<String>,
}

impl LengthValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn exact(mut self, exact: usize) -> Self {
        self.exact = Some(exact);
        self
    }

    pub fn range(self, min: usize, max: usize) -> Self {
        self.min(min).max(max)
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Characters for strings, items for arrays
    fn length_of(value: &Value) -> Option<usize> {
        match value {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            _ => None,
        }
    }

    fn error_message(&self, field: &str) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        match (self.exact, self.min, self.max) {
            (Some(exact), _, _) => format!("{} must be exactly {} long", field, exact),
            (None, Some(min), Some(max)) => {
                format!("{} must be between {} and {} long", field, min, max)
            }
            (None, Some(min), None) => format!("{} must be at least {} long", field, min),
            (None, None, Some(max)) => format!("{} must be at most {} long", field, max),
            (None, None, None) => format!("{} has an invalid length", field),
        }
    }

    fn fail(&self, field: &str, code: &str) -> ValidationResult<()> {
        Err(ValidationError::with_code(field, self.error_message(field), code).into())
    }
}

impl ValidationRule for LengthValidator {
    fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        // null is the required rule's business
        if value.is_null() {
            return Ok(());
        }

        let Some(length) = Self::length_of(value) else {
            return Err(ValidationError::with_code(
                field,
                format!("{} must be a string or array", field),
                "invalid_type",
            )
            .into());
        };

        if self.exact.is_some_and(|exact| length != exact) {
            return self.fail(field, "length_exact");
        }
        if self.min.is_some_and(|min| length < min) {
            return self.fail(field, "length_min");
        }
        if self.max.is_some_and(|max| length > max) {
            return self.fail(field, "length_max");
        }
        Ok(())
    }

    fn rule_name(&self) -> &'static str {
        "length"
    }

    fn parameters(&self) -> Option<Value> {
        Some(serde_json::json!({
            "min": self.min,
            "max": self.max,
            "exact": self.exact,
        }))
    }
}
