//! Built-in validators

pub mod custom;
pub mod length;
pub mod numeric;
pub mod one_of;
pub mod pattern;
pub mod required;

pub use custom::CustomValidator;
pub use length::LengthValidator;
pub use numeric::NumericValidator;
pub use one_of::OneOfValidator;
pub use pattern::PatternValidator;
pub use required::RequiredValidator;
