//! In-memory data store, keyed by model type and identifier

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::DataStore;
use crate::config::DecodeOptions;
use crate::error::{ModelError, ModelResult};
use crate::field::ValidationState;
use crate::model::{downcast_model, Model};
use crate::registry::IdentityRegistry;
use crate::transformer::ImportContext;

type Collection = BTreeMap<String, Arc<dyn Model>>;

/// Keeps models in process memory. Not a persistence engine: nothing
/// survives the store being dropped.
#[derive(Default)]
pub struct MemoryDataStore {
    records: RwLock<HashMap<TypeId, Collection>>,
    registry: Option<Arc<IdentityRegistry>>,
    validate_on_save: bool,
}

fn short_type_name<M>() -> &'static str {
    let name = std::any::type_name::<M>();
    name.rsplit("::").next().unwrap_or(name)
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register created models as canonical instances in `registry`
    pub fn with_registry(mut self, registry: Arc<IdentityRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Reject invalid models on create and update
    pub fn validate_on_save(mut self, validate: bool) -> Self {
        self.validate_on_save = validate;
        self
    }

    /// Number of stored models of type `M`
    pub async fn count<M: Model>(&self) -> usize {
        self.records
            .read()
            .await
            .get(&TypeId::of::<M>())
            .map_or(0, BTreeMap::len)
    }

    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    fn check(&self, model: &dyn Model) -> ModelResult<()> {
        if !self.validate_on_save {
            return Ok(());
        }
        match model.validate() {
            ValidationState::Invalid(messages) => Err(ModelError::Validation(messages)),
            _ => Ok(()),
        }
    }

    fn assign_identifier(model: &dyn Model) -> ModelResult<String> {
        let missing = || ModelError::MissingIdentifier(model.model_name().to_string());
        let field = model.identifier_field().ok_or_else(missing)?;
        let options = DecodeOptions::default().without_registry();
        field.import_identifier(&Uuid::new_v4().to_string(), &ImportContext::new(&options));
        model.identifier().ok_or_else(missing)
    }

    /// Whether `model` itself is the record stored under `identifier`
    fn is_stored(records: &HashMap<TypeId, Collection>, identifier: &str, model: &dyn Model) -> bool {
        records
            .get(&model.model_type())
            .and_then(|collection| collection.get(identifier))
            .is_some_and(|stored| stored.core().id() == model.core().id())
    }

    async fn insert(&self, identifier: String, model: &Arc<dyn Model>) {
        self.records
            .write()
            .await
            .entry(model.model_type())
            .or_default()
            .insert(identifier, model.clone());
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn create(&self, model: Arc<dyn Model>) -> ModelResult<Arc<dyn Model>> {
        model.before_save();
        self.check(&*model)?;

        let identifier = match model.identifier() {
            Some(identifier) => identifier,
            None => Self::assign_identifier(&*model)?,
        };
        self.insert(identifier.clone(), &model).await;
        if let Some(registry) = &self.registry {
            if !registry.register(&model) {
                warn!(
                    model = model.model_name(),
                    identifier = %identifier,
                    "another live instance is canonical for this identifier"
                );
            }
        }
        debug!(model = model.model_name(), identifier = %identifier, "created");

        model.after_create();
        Ok(model)
    }

    async fn update(&self, model: Arc<dyn Model>) -> ModelResult<Arc<dyn Model>> {
        model.before_save();
        self.check(&*model)?;

        let identifier = model
            .identifier()
            .ok_or_else(|| ModelError::MissingIdentifier(model.model_name().to_string()))?;
        self.insert(identifier.clone(), &model).await;
        debug!(model = model.model_name(), identifier = %identifier, "updated");
        Ok(model)
    }

    async fn delete(&self, model: Arc<dyn Model>) -> ModelResult<Arc<dyn Model>> {
        let identifier = model
            .identifier()
            .ok_or_else(|| ModelError::MissingIdentifier(model.model_name().to_string()))?;

        let mut seen = HashSet::new();
        let mut pending = vec![model.clone()];
        let mut doomed = Vec::new();
        while let Some(next) = pending.pop() {
            next.cascade_delete(&mut seen, &mut |target, _| pending.push(target.clone()));
            doomed.push(next);
        }

        let removed: Vec<Arc<dyn Model>> = {
            let mut records = self.records.write().await;
            if !Self::is_stored(&records, &identifier, &*model) {
                return Err(ModelError::not_found(model.model_name(), identifier));
            }
            doomed
                .into_iter()
                .filter(|target| {
                    let Some(identifier) = target.identifier() else {
                        return false;
                    };
                    if !Self::is_stored(&records, &identifier, &**target) {
                        return false;
                    }
                    if let Some(collection) = records.get_mut(&target.model_type()) {
                        collection.remove(&identifier);
                    }
                    true
                })
                .collect()
        };

        for target in &removed {
            if let Some(registry) = &self.registry {
                registry.remove(&**target);
            }
            debug!(model = target.model_name(), "deleted");
            target.after_delete();
        }
        Ok(model)
    }

    async fn lookup<M: Model>(&self, identifier: &str) -> ModelResult<Arc<M>> {
        let records = self.records.read().await;
        records
            .get(&TypeId::of::<M>())
            .and_then(|collection| collection.get(identifier))
            .and_then(downcast_model::<M>)
            .ok_or_else(|| ModelError::not_found(short_type_name::<M>(), identifier))
    }

    async fn list<M: Model>(&self) -> ModelResult<Vec<Arc<M>>> {
        let records = self.records.read().await;
        Ok(records
            .get(&TypeId::of::<M>())
            .map(|collection| collection.values().filter_map(downcast_model::<M>).collect())
            .unwrap_or_default())
    }
}
