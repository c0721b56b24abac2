//! Regular expression validator

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use regex::Regex;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct PatternValidator {
    pattern: Regex,
    pub message: Option<String>,
    /// Require the whole string to match rather than any substring
    pub full_match: bool,
}

impl PatternValidator {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::from_regex(Regex::new(pattern)?))
    }

    pub fn new_case_insensitive(pattern: &str) -> Result<Self, regex::Error> {
        Self::new(&format!("(?i){}", pattern))
    }

    pub fn from_regex(pattern: Regex) -> Self {
        Self {
            pattern,
            message: None,
            full_match: true,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn full_match(mut self, full_match: bool) -> Self {
        self.full_match = full_match;
        self
    }

    pub fn pattern_string(&self) -> &str {
        self.pattern.as_str()
    }

    fn matches(&self, text: &str) -> bool {
        if self.full_match {
            self.pattern
                .find(text)
                .is_some_and(|m| m.start() == 0 && m.end() == text.len())
        } else {
            self.pattern.is_match(text)
        }
    }
}

impl ValidationRule for PatternValidator {
    fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if value.is_null() {
            return Ok(());
        }

        let Some(text) = value.as_str() else {
            return Err(ValidationError::with_code(
                field,
                format!("{} must be a string", field),
                "invalid_type",
            )
            .into());
        };

        if self.matches(text) {
            return Ok(());
        }
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("{} does not match the required pattern", field));
        Err(ValidationError::with_code(field, message, "pattern_mismatch").into())
    }

    fn rule_name(&self) -> &'static str {
        "pattern"
    }

    fn parameters(&self) -> Option<Value> {
        Some(serde_json::json!({
            "pattern": self.pattern.as_str(),
            "full_match": self.full_match,
        }))
    }
}
