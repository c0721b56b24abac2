//! To-many relationship field

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use serde_json::Value;
use tracing::{trace, warn};

use super::{InverseField, InverseFn, ModelRef, Relation};
use crate::field::{
    AnyField, Field, FieldId, FieldObserver, FieldState, ObserverId, ValidationState,
};
use crate::model::{downcast_model, Model};
use crate::transformer::{
    ArrayTransformer, ExportContext, ForeignKeyTransformer, ImportContext, ModelValueTransformer,
};

/// An ordered list of related models. A model appears at most once.
pub struct ModelArrayField<M: Model> {
    field: Field<Vec<ModelRef<M>>>,
    relation: Relation<M>,
}

impl<M: Model> Default for ModelArrayField<M> {
    fn default() -> Self {
        Self::new()
    }
}

fn dedupe<M>(models: impl IntoIterator<Item = ModelRef<M>>) -> Vec<ModelRef<M>> {
    let mut unique: Vec<ModelRef<M>> = Vec::new();
    for model in models {
        if !unique.contains(&model) {
            unique.push(model);
        }
    }
    unique
}

impl<M: Model> ModelArrayField<M> {
    pub fn new() -> Self {
        Self {
            field: Field::with_transformer(ArrayTransformer::new(ModelValueTransformer::<M>::new())),
            relation: Relation::default(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.field = self.field.with_key(key);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.field = self.field.with_name(name);
        self
    }

    pub fn inverse(mut self, inverse: InverseFn<M>) -> Self {
        self.relation.inverse = Some(inverse);
        self
    }

    /// Serialize the list as identifiers
    pub fn foreign_key(mut self) -> Self {
        self.relation.foreign_key = true;
        self.field
            .set_transformer(Arc::new(ArrayTransformer::new(ForeignKeyTransformer::<M>::new())));
        self
    }

    pub fn cascade_delete(mut self) -> Self {
        self.relation.cascade_delete = true;
        self
    }

    /// The owner is only valid when every related model is
    pub fn require_valid(mut self) -> Self {
        self.relation.require_valid = true;
        self
    }

    pub fn require_not_nil(mut self) -> Self {
        self.field = self.field.require_not_nil();
        self
    }

    /// Run `action` after every change, including changes made through the
    /// inverse. The action cannot be removed.
    pub fn observe<F>(&self, action: F)
    where
        F: Fn(&Field<Vec<ModelRef<M>>>) + Send + Sync + 'static,
    {
        self.field.observe(action);
    }

    /// Register an observer object, held weakly
    pub fn add_observer<O: FieldObserver + 'static>(&self, observer: &Arc<O>) -> ObserverId {
        self.field.add_observer(observer)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.field.remove_observer(id)
    }

    fn current(&self) -> Vec<ModelRef<M>> {
        self.field.value().unwrap_or_default()
    }

    pub fn value(&self) -> Vec<Arc<M>> {
        self.current().into_iter().map(ModelRef::into_inner).collect()
    }

    pub fn state(&self) -> FieldState {
        self.field.state()
    }

    pub fn is_set(&self) -> bool {
        self.field.is_set()
    }

    pub fn len(&self) -> usize {
        self.field.value().map_or(0, |models| models.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, model: &Arc<M>) -> bool {
        self.current().iter().any(|m| Arc::ptr_eq(m.arc(), model))
    }

    /// Replace the list. Duplicates are dropped, keeping the first
    /// occurrence.
    pub fn set(&self, models: impl IntoIterator<Item = Arc<M>>) {
        let models = dedupe(models.into_iter().map(ModelRef::new));
        self.assign(Some(models));
    }

    pub fn push(&self, model: Arc<M>) {
        let mut models = self.current();
        models.push(ModelRef::new(model));
        self.assign(Some(dedupe(models)));
    }

    /// Returns false when `model` was not in the list
    pub fn remove(&self, model: &Arc<M>) -> bool {
        let mut models = self.current();
        let before = models.len();
        models.retain(|m| !Arc::ptr_eq(m.arc(), model));
        if models.len() == before {
            return false;
        }
        self.assign(Some(models));
        true
    }

    pub fn clear(&self) {
        self.assign(Some(Vec::new()));
    }

    /// Return to `Unset`, detaching every element's inverse
    pub fn reset(&self) {
        if let Some((owner, inverse)) = self.relation.wiring() {
            for model in self.current() {
                inverse(model.model()).inverse_value_removed(&owner);
            }
        }
        self.field.reset();
    }

    /// Apply inverses for the elements that left and joined, then store once
    fn assign(&self, new: Option<Vec<ModelRef<M>>>) {
        let old = self.current();
        if let Some((owner, inverse)) = self.relation.wiring() {
            let incoming = new.as_deref().unwrap_or_default();
            let removed = old.iter().filter(|m| !incoming.contains(m));
            let added = incoming.iter().filter(|m| !old.contains(m));
            for model in removed {
                trace!(owner = owner.model_name(), "removing from inverse");
                inverse(model.model()).inverse_value_removed(&owner);
            }
            for model in added {
                trace!(owner = owner.model_name(), "adding to inverse");
                inverse(model.model()).inverse_value_added(&owner);
            }
        }
        self.field.set(new);
    }
}

impl<M: Model> InverseField for ModelArrayField<M> {
    fn inverse_value_added(&self, owner: &Arc<dyn Model>) {
        let Some(model) = downcast_model::<M>(owner) else {
            warn!(
                expected = std::any::type_name::<M>(),
                found = owner.model_name(),
                "inverse received a model of the wrong type"
            );
            return;
        };
        let model = ModelRef::new(model);
        let mut models = self.current();
        if models.contains(&model) {
            return;
        }
        models.push(model);
        self.field.store(Some(models));
    }

    fn inverse_value_removed(&self, owner: &Arc<dyn Model>) {
        let mut models = self.current();
        let before = models.len();
        models.retain(|m| m.model_id() != owner.core().id());
        if models.len() != before {
            self.field.store(Some(models));
        }
    }
}

impl<M: Model> AnyField for ModelArrayField<M> {
    fn field_id(&self) -> FieldId {
        self.field.id()
    }

    fn key(&self) -> Option<String> {
        self.field.key()
    }

    fn assign_default_key(&self, key: &str) {
        self.field.assign_default_key(key);
    }

    fn name(&self) -> Option<String> {
        self.field.name()
    }

    fn set_name(&self, name: &str) {
        AnyField::set_name(&self.field, name);
    }

    fn state(&self) -> FieldState {
        self.field.state()
    }

    fn has_value(&self) -> bool {
        self.field.has_value()
    }

    fn reset(&self) {
        ModelArrayField::reset(self);
    }

    fn export_value(&self, ctx: &mut ExportContext) -> Value {
        self.field.export(ctx)
    }

    fn import_value(&self, raw: &Value, ctx: &ImportContext<'_>) {
        let models = self.field.import(raw, ctx).map(dedupe);
        self.assign(models);
    }

    fn validate(&self) -> ValidationState {
        let mut failures = Vec::new();
        if self.relation.require_valid && self.value().iter().any(|m| m.validate().is_invalid()) {
            failures.push(format!("{} is invalid", self.field.label()));
        }
        self.field.validate_with(failures)
    }

    fn validation_state(&self) -> ValidationState {
        self.field.validation_state()
    }

    fn add_validation_error(&self, message: &str) {
        self.field.add_validation_error(message);
    }

    fn reset_validation_state(&self) {
        self.field.reset_validation_state();
    }

    fn bind_owner(&self, owner: &Weak<dyn Model>) {
        self.relation.bind_owner(owner);
    }

    fn is_relationship(&self) -> bool {
        true
    }

    fn is_foreign_key(&self) -> bool {
        self.relation.foreign_key
    }

    fn cascades_delete(&self) -> bool {
        self.relation.cascade_delete
    }

    fn related_models(&self) -> Vec<Arc<dyn Model>> {
        self.current().iter().map(ModelRef::as_dyn).collect()
    }

    /// Keeps the replaced element's position
    fn replace_related(&self, current: &Arc<dyn Model>, replacement: Arc<dyn Model>) -> bool {
        let mut models = self.current();
        let Some(index) = models.iter().position(|m| m.model_id() == current.core().id()) else {
            return false;
        };
        let Some(replacement) = downcast_model::<M>(&replacement) else {
            return false;
        };
        models[index] = ModelRef::new(replacement);
        self.assign(Some(dedupe(models)));
        true
    }

    fn unlink(&self) {
        self.field.reset();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<M: Model> fmt::Debug for ModelArrayField<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArrayField")
            .field("field", &self.field)
            .field("relation", &self.relation)
            .finish()
    }
}
