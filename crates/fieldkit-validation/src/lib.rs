//! # fieldkit-validation
//!
//! Framework-agnostic validation rules for single values. Model fields export
//! their value as `serde_json::Value` and run every attached rule against it;
//! failures come back as [`ValidationErrors`] keyed by field name.

pub mod error;
pub mod traits;
pub mod validators;

pub use error::{ValidationError, ValidationErrors, ValidationResult};
pub use traits::ValidationRule;

pub use validators::{
    custom::CustomValidator,
    length::LengthValidator,
    numeric::NumericValidator,
    one_of::OneOfValidator,
    pattern::PatternValidator,
    required::RequiredValidator,
};
