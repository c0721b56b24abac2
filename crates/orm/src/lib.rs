//! # fieldkit-orm: reactive fields and model graphs
//!
//! Typed model objects whose properties are reactive [`Field`]s. Models
//! serialize to and from attribute maps, reference each other through
//! relationship fields that keep both sides consistent, and decode into
//! canonical instances through an [`IdentityRegistry`].
//!
//! The engine is synchronous and performs no I/O. [`store`] holds the
//! asynchronous collaborator interface and an in-memory implementation.

pub mod config;
pub mod error;
pub mod field;
pub mod model;
pub mod registry;
pub mod relationships;
pub mod store;
pub mod transformer;

#[cfg(test)]
mod tests;

// Re-export core traits and types
pub use config::*;
pub use error::*;
pub use field::*;
pub use model::*;
pub use registry::*;
pub use relationships::*;
pub use store::*;
pub use transformer::*;

pub use fieldkit_validation as validation;
