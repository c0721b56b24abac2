//! Numeric constraints

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct NumericValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub integer_only: bool,
    pub message: Option<String>,
}

impl NumericValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    pub fn integer_only(mut self) -> Self {
        self.integer_only = true;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Numbers, and strings that parse as numbers
    fn numeric_value(value: &Value) -> Option<f64> {
        match value {
            Value::Number(number) => number.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn fail(&self, field: &str, default: String, code: &str) -> ValidationResult<()> {
        let message = self.message.clone().unwrap_or(default);
        Err(ValidationError::with_code(field, message, code).into())
    }
}

impl ValidationRule for NumericValidator {
    fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if value.is_null() {
            return Ok(());
        }

        let Some(number) = Self::numeric_value(value).filter(|n| n.is_finite()) else {
            return self.fail(field, format!("{} must be a number", field), "invalid_type");
        };

        if self.integer_only && number.fract() != 0.0 {
            return self.fail(field, format!("{} must be an integer", field), "not_integer");
        }
        if let Some(min) = self.min.filter(|min| number < *min) {
            return self.fail(field, format!("{} must be at least {}", field, min), "too_small");
        }
        if let Some(max) = self.max.filter(|max| number > *max) {
            return self.fail(field, format!("{} must be at most {}", field, max), "too_large");
        }
        Ok(())
    }

    fn rule_name(&self) -> &'static str {
        "numeric"
    }

    fn parameters(&self) -> Option<Value> {
        Some(serde_json::json!({
            "min": self.min,
            "max": self.max,
            "integer_only": self.integer_only,
        }))
    }
}
