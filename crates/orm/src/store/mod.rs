//! Data stores - asynchronous collaborators that persist model graphs
//!
//! The core engine never performs I/O. A [`DataStore`] drives the model
//! lifecycle hooks (`before_save`, `after_create`, `after_delete`) and the
//! cascade walk, and is where identifiers get assigned.

mod memory;

pub use memory::MemoryDataStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ModelResult;
use crate::model::Model;

/// Storage backend for models
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Store a new model, assigning an identifier when it has none
    async fn create(&self, model: Arc<dyn Model>) -> ModelResult<Arc<dyn Model>>;

    /// Replace the stored record for an already-persisted model
    async fn update(&self, model: Arc<dyn Model>) -> ModelResult<Arc<dyn Model>>;

    /// Remove the model and everything it cascades to
    async fn delete(&self, model: Arc<dyn Model>) -> ModelResult<Arc<dyn Model>>;

    async fn lookup<M: Model>(&self, identifier: &str) -> ModelResult<Arc<M>>;

    async fn list<M: Model>(&self) -> ModelResult<Vec<Arc<M>>>;

    /// Whether the model already exists in this store
    fn contains_model(&self, model: &dyn Model) -> bool {
        model.persisted()
    }

    /// Create or update, depending on [`DataStore::contains_model`]
    async fn save(&self, model: Arc<dyn Model>) -> ModelResult<Arc<dyn Model>> {
        if self.contains_model(&*model) {
            self.update(model).await
        } else {
            self.create(model).await
        }
    }
}
