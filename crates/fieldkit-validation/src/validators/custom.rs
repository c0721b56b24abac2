//! Closure-backed validators

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub type ValidationFn = Arc<dyn Fn(&Value, &str) -> ValidationResult<()> + Send + Sync>;

/// Validator backed by a user-supplied function.
///
/// Unlike the built-in rules, `null` is passed through to the function when
/// the validator is created with [`CustomValidator::including_null`].
#[derive(Clone)]
pub struct CustomValidator {
    pub name: String,
    validator: ValidationFn,
    pub message: Option<String>,
    pub check_null: bool,
}

impl CustomValidator {
    pub fn new<F>(name: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Value, &str) -> ValidationResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            validator: Arc::new(validator),
            message: None,
            check_null: false,
        }
    }

    /// Build a validator from a predicate; failures use `message`
    pub fn predicate<F>(name: impl Into<String>, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let message = message.into();
        Self::new(name, move |value, field| {
            if check(value) {
                Ok(())
            } else {
                Err(ValidationError::with_code(field, message.clone(), "custom").into())
            }
        })
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn including_null(mut self) -> Self {
        self.check_null = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValidator")
            .field("name", &self.name)
            .field("message", &self.message)
            .field("check_null", &self.check_null)
            .finish()
    }
}

impl ValidationRule for CustomValidator {
    fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if value.is_null() && !self.check_null {
            return Ok(());
        }
        let mut result = (self.validator)(value, field);
        if let (Err(errors), Some(message)) = (&mut result, &self.message) {
            errors.replace_messages(message);
        }
        result
    }

    fn rule_name(&self) -> &'static str {
        "custom"
    }

    fn parameters(&self) -> Option<Value> {
        Some(serde_json::json!({ "name": self.name, "message": self.message }))
    }
}
