//! Single-valued relationship field

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use fieldkit_validation::ValidationRule;
use serde_json::Value;
use tracing::{trace, warn};

use super::{InverseField, InverseFn, ModelRef, Relation};
use crate::field::{
    AnyField, Field, FieldId, FieldObserver, FieldState, ObserverId, ValidationState,
};
use crate::model::{downcast_model, Model};
use crate::transformer::{ExportContext, ForeignKeyTransformer, ImportContext, ModelValueTransformer};

/// A field referencing at most one related model.
///
/// ```ignore
/// company: ModelField::new().inverse(|c: &Company| &c.employees),
/// parent: ModelField::new().foreign_key(),
/// ```
pub struct ModelField<M: Model> {
    field: Field<ModelRef<M>>,
    relation: Relation<M>,
}

impl<M: Model> Default for ModelField<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> ModelField<M> {
    /// Serialized as a nested attribute map
    pub fn new() -> Self {
        Self {
            field: Field::with_transformer(ModelValueTransformer::<M>::new()),
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

    /// Name the field on `M` that points back at the owner
    pub fn inverse(mut self, inverse: InverseFn<M>) -> Self {
        self.relation.inverse = Some(inverse);
        self
    }

    /// Serialize only the related model's identifier. A scalar identifier
    /// imports as a shell.
    pub fn foreign_key(mut self) -> Self {
        self.relation.foreign_key = true;
        self.field.set_transformer(Arc::new(ForeignKeyTransformer::<M>::new()));
        self
    }

    /// Deleting the owner through a data store also deletes the target
    pub fn cascade_delete(mut self) -> Self {
        self.relation.cascade_delete = true;
        self
    }

    /// The owner is only valid when the related model is
    pub fn require_valid(mut self) -> Self {
        self.relation.require_valid = true;
        self
    }

    pub fn require_not_nil(mut self) -> Self {
        self.field = self.field.require_not_nil();
        self
    }

    pub fn rule(mut self, rule: impl ValidationRule + 'static) -> Self {
        self.field = self.field.rule(rule);
        self
    }

    /// Run `action` after every change, including changes made through the
    /// inverse. The action cannot be removed.
    pub fn observe<F>(&self, action: F)
    where
        F: Fn(&Field<ModelRef<M>>) + Send + Sync + 'static,
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

    pub fn value(&self) -> Option<Arc<M>> {
        self.field.value().map(ModelRef::into_inner)
    }

    pub fn state(&self) -> FieldState {
        self.field.state()
    }

    pub fn is_set(&self) -> bool {
        self.field.is_set()
    }

    pub fn is_foreign_key(&self) -> bool {
        self.relation.foreign_key
    }

    /// Assign the related model, updating the inverse on both the old and the
    /// new target
    pub fn set(&self, value: impl Into<Option<Arc<M>>>) {
        self.assign(value.into().map(ModelRef::new));
    }

    fn assign(&self, new: Option<ModelRef<M>>) {
        let old = self.field.value();
        if old != new {
            if let Some((owner, inverse)) = self.relation.wiring() {
                trace!(owner = owner.model_name(), key = ?self.field.key(), "updating inverse");
                if let Some(old) = &old {
                    inverse(old.model()).inverse_value_removed(&owner);
                }
                if let Some(new) = &new {
                    inverse(new.model()).inverse_value_added(&owner);
                }
            }
        }
        self.field.set(new);
    }

    /// Return to `Unset`, detaching from the old target's inverse
    pub fn reset(&self) {
        if let (Some(old), Some((owner, inverse))) = (self.field.value(), self.relation.wiring()) {
            inverse(old.model()).inverse_value_removed(&owner);
        }
        self.field.reset();
    }
}

impl<M: Model> InverseField for ModelField<M> {
    fn inverse_value_added(&self, owner: &Arc<dyn Model>) {
        let Some(new) = downcast_model::<M>(owner) else {
            warn!(
                expected = std::any::type_name::<M>(),
                found = owner.model_name(),
                "inverse received a model of the wrong type"
            );
            return;
        };
        let new = ModelRef::new(new);
        let old = self.field.value();
        if old.as_ref() == Some(&new) {
            return;
        }
        if let (Some(old), Some((this, inverse))) = (&old, self.relation.wiring()) {
            inverse(old.model()).inverse_value_removed(&this);
        }
        self.field.store(Some(new));
    }

    fn inverse_value_removed(&self, owner: &Arc<dyn Model>) {
        let current = self.field.value();
        if current.is_some_and(|current| current.model_id() == owner.core().id()) {
            self.field.store(None);
        }
    }
}

impl<M: Model> AnyField for ModelField<M> {
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
        ModelField::reset(self);
    }

    fn export_value(&self, ctx: &mut ExportContext) -> Value {
        self.field.export(ctx)
    }

    fn import_value(&self, raw: &Value, ctx: &ImportContext<'_>) {
        let value = self.field.import(raw, ctx);
        self.assign(value);
    }

    fn validate(&self) -> ValidationState {
        let mut failures = Vec::new();
        if self.relation.require_valid {
            if let Some(target) = self.value() {
                if target.validate().is_invalid() {
                    failures.push(format!("{} is invalid", self.field.label()));
                }
            }
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
        self.field.value().map(|target| target.as_dyn()).into_iter().collect()
    }

    fn replace_related(&self, current: &Arc<dyn Model>, replacement: Arc<dyn Model>) -> bool {
        let holds_current = self
            .field
            .value()
            .is_some_and(|target| target.model_id() == current.core().id());
        if !holds_current {
            return false;
        }
        match downcast_model::<M>(&replacement) {
            Some(replacement) => {
                self.set(replacement);
                true
            }
            None => false,
        }
    }

    fn unlink(&self) {
        self.field.reset();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<M: Model> fmt::Debug for ModelField<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelField")
            .field("field", &self.field)
            .field("relation", &self.relation)
            .finish()
    }
}
