//! Type-erased view of a field, used by models to walk their field registry

use std::any::Any;
use std::sync::{Arc, Weak};

use serde_json::Value;

use super::{FieldId, FieldState, ValidationState};
use crate::model::Model;
use crate::transformer::{ExportContext, ImportContext};

/// Operations every field supports regardless of its value type.
///
/// The relationship methods have no-op defaults; only model-valued fields
/// override them.
pub trait AnyField: Send + Sync {
    fn field_id(&self) -> FieldId;

    /// Serialization key
    fn key(&self) -> Option<String>;

    /// Set the key unless one was given explicitly
    fn assign_default_key(&self, key: &str);

    /// Display name
    fn name(&self) -> Option<String>;

    fn set_name(&self, name: &str);

    fn state(&self) -> FieldState;

    fn is_set(&self) -> bool {
        self.state() == FieldState::Set
    }

    fn has_value(&self) -> bool;

    fn reset(&self);

    /// Export the current value; `Value::Null` when there is none
    fn export_value(&self, ctx: &mut ExportContext) -> Value;

    /// Import a raw value and assign it. `null` assigns `None`.
    fn import_value(&self, raw: &Value, ctx: &ImportContext<'_>);

    /// Assign an identifier string, falling back to an integer when the
    /// field does not accept strings
    fn import_identifier(&self, identifier: &str, ctx: &ImportContext<'_>) {
        self.import_value(&Value::String(identifier.to_string()), ctx);
        if self.has_value() {
            return;
        }
        if let Ok(number) = identifier.parse::<i64>() {
            self.import_value(&Value::from(number), ctx);
        }
    }

    fn validate(&self) -> ValidationState;

    fn validation_state(&self) -> ValidationState;

    fn add_validation_error(&self, message: &str);

    fn reset_validation_state(&self);

    /// Record the model that declares this field
    fn bind_owner(&self, _owner: &Weak<dyn Model>) {}

    fn is_relationship(&self) -> bool {
        false
    }

    fn is_foreign_key(&self) -> bool {
        false
    }

    fn cascades_delete(&self) -> bool {
        false
    }

    /// Models currently referenced by this field
    fn related_models(&self) -> Vec<Arc<dyn Model>> {
        Vec::new()
    }

    /// Swap one referenced model for another, maintaining inverses.
    /// Returns false when `current` is not referenced or the replacement has
    /// the wrong type.
    fn replace_related(&self, _current: &Arc<dyn Model>, _replacement: Arc<dyn Model>) -> bool {
        false
    }

    /// Drop referenced models without touching inverse fields
    fn unlink(&self) {}

    fn as_any(&self) -> &dyn Any;
}

impl dyn AnyField {
    pub fn downcast_ref<F: AnyField + 'static>(&self) -> Option<&F> {
        self.as_any().downcast_ref::<F>()
    }
}

/// Normalize an exported identifier value to a string
pub(crate) fn identifier_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
