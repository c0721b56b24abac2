//! Error types for the model layer
//!
//! Most core operations are lenient and report local failures through
//! `Option` or [`ValidationState`](crate::field::ValidationState). The
//! fallible entry points (strict decoding, polymorphic resolution, data
//! store operations) return [`ModelResult`].

use fieldkit_validation::ValidationErrors;
use thiserror::Error;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Error types for model operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// An attribute map could not be turned into a model
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// No concrete model type is registered for a discriminator value
    #[error("No model kind registered for '{discriminator}' = {value}")]
    UnresolvedKind { discriminator: String, value: String },

    /// The model has no identifier field, or no identifier value
    #[error("Model '{0}' has no identifier")]
    MissingIdentifier(String),

    /// No record with this identifier exists
    #[error("{model} '{identifier}' not found")]
    NotFound { model: String, identifier: String },

    /// The model failed validation
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// A model of one type was supplied where another was expected
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
}

impl ModelError {
    pub fn not_found(model: impl Into<String>, identifier: impl Into<String>) -> Self {
        ModelError::NotFound {
            model: model.into(),
            identifier: identifier.into(),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Deserialization(err.to_string())
    }
}

impl From<ValidationErrors> for ModelError {
    fn from(errors: ValidationErrors) -> Self {
        ModelError::Validation(errors.messages())
    }
}
