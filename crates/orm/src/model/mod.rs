//! Model System - entities built from reactive fields
//!
//! - `core`: per-instance bookkeeping ([`ModelCore`], [`ModelId`])
//! - `serialization`: attribute map export and decoding with canonicalization
//! - `traversal`: cycle-safe walks over the field graph
//! - `kinds`: discriminator-based polymorphic decoding
//!
//! A model declares its fields explicitly through
//! [`Model::declare_fields`]. The registry built from that declaration is
//! memoized on first access and binds each field's key and owner.

mod core;
mod kinds;
mod serialization;
mod traversal;

pub use self::core::{ModelCore, ModelId};
pub use kinds::ModelKinds;
pub use traversal::{FieldHandle, FieldValueRef};

pub(crate) use serialization::{decode, export_nested, shell};

use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use serde_json::Value;
use tracing::warn;

use crate::config::{DecodeOptions, SerializeOptions};
use crate::error::{ModelError, ModelResult};
use crate::field::{identifier_string, AnyField, ValidationState};
use crate::registry::IdentityRegistry;
use crate::transformer::{ExportContext, ImportContext};
use serialization::FieldSelection;

/// String-keyed map of JSON-compatible values, in field registration order
pub type AttributeMap = serde_json::Map<String, Value>;

/// Callback run after decoding, with whether the instance is newly created
pub type Configure<'a, M> = &'a dyn Fn(&Arc<M>, bool);

/// Upcast helpers every model gets for free
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Declaration of a model's fields, in registration order
pub struct FieldList<'a> {
    entries: Vec<(&'static str, &'a dyn AnyField)>,
}

impl<'a> FieldList<'a> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a field under its property name. The name becomes the
    /// field's key unless the field was given one explicitly.
    pub fn add(&mut self, name: &'static str, field: &'a dyn AnyField) -> &mut Self {
        self.entries.push((name, field));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An entity whose properties are reactive fields.
///
/// Instances live in an `Arc` and are built with [`Model::create`] (or one
/// of the decoding constructors) so that relationship fields can refer back
/// to their owner.
pub trait Model: AsAny {
    /// A bare instance. Prefer [`Model::create`], which also binds the
    /// instance to its allocation.
    fn new() -> Self
    where
        Self: Sized;

    fn core(&self) -> &ModelCore;

    /// Register every field, in serialization order
    fn declare_fields<'a>(&'a self, fields: &mut FieldList<'a>);

    fn model_name(&self) -> &'static str {
        let name = std::any::type_name::<Self>();
        name.rsplit("::").next().unwrap_or(name)
    }

    fn model_type(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    /// The field holding this model's identifier
    fn identifier_field(&self) -> Option<&dyn AnyField> {
        None
    }

    /// Called once per field while the registry is built. Must not access
    /// the registry itself.
    fn initialize_field(&self, _key: &str, _field: &dyn AnyField) {}

    fn collection_path(&self) -> Option<String> {
        None
    }

    /// `collection_path/identifier`, when both are known
    fn path(&self) -> Option<String> {
        let collection = self.collection_path()?;
        let identifier = self.identifier()?;
        Some(format!("{}/{}", collection.trim_end_matches('/'), identifier))
    }

    fn after_init(&self) {}

    fn after_create(&self) {}

    fn before_save(&self) {
        self.reset_validation_state();
    }

    fn after_delete(&self) {}

    /// Registered fields with their keys
    fn fields(&self) -> Vec<(&str, &dyn AnyField)> {
        serialization::registered_fields(self)
    }

    fn field(&self, key: &str) -> Option<&dyn AnyField> {
        self.fields()
            .into_iter()
            .find(|(field_key, _)| *field_key == key)
            .map(|(_, field)| field)
    }

    /// The identifier field's value, normalized to a string
    fn identifier(&self) -> Option<String> {
        let field = self.identifier_field()?;
        identifier_string(&field.export_value(&mut ExportContext::default()))
    }

    fn persisted(&self) -> bool {
        self.identifier().is_some()
    }

    /// Whether this instance only carries an identifier taken from a
    /// foreign key
    fn is_shell(&self) -> bool {
        self.core().is_shell()
    }

    fn to_attributes(&self, options: &SerializeOptions) -> AttributeMap {
        let mut ctx = ExportContext::new(options.explicit_null);
        ctx.mark_seen(self.core().id());
        let selection = match &options.fields {
            Some(ids) => FieldSelection::Only(ids),
            None => FieldSelection::Set,
        };
        serialization::export_attributes(self, &mut ctx, selection)
    }

    /// Every set field, with default options
    fn attributes(&self) -> AttributeMap {
        self.to_attributes(&SerializeOptions::default())
    }

    /// Import the keys present in `map` into this instance
    fn update_attributes(&self, map: &AttributeMap, options: &DecodeOptions) {
        let ctx = ImportContext::new(options);
        serialization::import_attributes(self, map, &ctx);
    }

    /// Visit every field depth-first. When `recursive`, the walk follows
    /// relationships, visiting each model at most once.
    fn visit_all_fields(&self, recursive: bool, visitor: &mut dyn FnMut(&str, &dyn AnyField)) {
        let mut seen = HashSet::new();
        traversal::walk_fields(self, recursive, &mut seen, visitor);
    }

    /// Visit every field value: scalars as exported values, relationships
    /// as the referenced models
    fn visit_all_field_values(&self, recursive: bool, visitor: &mut dyn FnMut(FieldValueRef<'_>)) {
        let mut seen = HashSet::new();
        traversal::walk_values(self, recursive, &mut seen, visitor);
    }

    /// Referenced models still flagged as shells
    fn shells(&self, recursive: bool) -> Vec<Arc<dyn Model>> {
        let mut found: Vec<Arc<dyn Model>> = Vec::new();
        self.visit_all_field_values(recursive, &mut |value| {
            if let FieldValueRef::Model { model, .. } = value {
                let id = model.core().id();
                if model.is_shell() && !found.iter().any(|m| m.core().id() == id) {
                    found.push(model.clone());
                }
            }
        });
        found
    }

    /// Models referenced directly through foreign-key fields
    fn foreign_key_models(&self) -> Vec<Arc<dyn Model>> {
        self.fields()
            .into_iter()
            .filter(|(_, field)| field.is_foreign_key())
            .flat_map(|(_, field)| field.related_models())
            .collect()
    }

    /// Replace shell references with the result of `lookup`. Shells the
    /// lookup cannot resolve stay in place.
    fn fill_shells(&self, recursive: bool, lookup: &dyn Fn(&Arc<dyn Model>) -> Option<Arc<dyn Model>>) {
        let mut seen = HashSet::new();
        traversal::fill_shells(self, recursive, lookup, &mut seen);
    }

    /// Hand every `cascade_delete` target not yet in `seen` to `delete`.
    /// Targets are added to `seen` before the continuation runs.
    fn cascade_delete(
        &self,
        seen: &mut HashSet<ModelId>,
        delete: &mut dyn FnMut(&Arc<dyn Model>, &mut HashSet<ModelId>),
    ) {
        seen.insert(self.core().id());
        for (_, field) in self.fields() {
            if !field.cascades_delete() {
                continue;
            }
            for target in field.related_models() {
                if seen.insert(target.core().id()) {
                    delete(&target, seen);
                }
            }
        }
    }

    /// Validate this model's own fields. Related models are only checked
    /// through fields marked `require_valid`.
    fn validate(&self) -> ValidationState {
        let Some(_guard) = self.core().begin_validation() else {
            return ValidationState::Unknown;
        };
        self.reset_validation_state();

        let mut messages = Vec::new();
        self.visit_all_fields(false, &mut |_, field| {
            messages.extend(field.validate().messages().iter().cloned());
        });
        ValidationState::from_messages(messages)
    }

    fn reset_validation_state(&self) {
        for (_, field) in self.fields() {
            field.reset_validation_state();
        }
    }

    /// Split a key path such as `address.street` into field keys
    fn key_path_components(&self, key_path: &str) -> Vec<String> {
        key_path.split('.').map(str::to_string).collect()
    }

    fn field_for_key_path(&self, key_path: &str) -> Option<FieldHandle> {
        let components = self.key_path_components(key_path);
        traversal::resolve_key_path(self.core().this()?, &components)
    }

    /// Attach a validation message to the field at `key_path`. Returns false
    /// when no such field exists.
    fn add_error(&self, key_path: &str, message: &str) -> bool {
        let components = self.key_path_components(key_path);
        if let [key] = components.as_slice() {
            return self
                .field(key)
                .map(|field| field.add_validation_error(message))
                .is_some();
        }
        self.field_for_key_path(key_path)
            .and_then(|handle| handle.field().map(|field| field.add_validation_error(message)))
            .is_some()
    }

    /// Drop every relationship reference held by this model, leaving inverse
    /// fields alone. Breaks reference cycles before a graph is discarded.
    fn unlink(&self) {
        for (_, field) in self.fields() {
            field.unlink();
        }
    }

    /// A new instance bound to its `Arc`, with its field registry built
    fn create() -> Arc<Self>
    where
        Self: Sized,
    {
        let model = Arc::new_cyclic(|this: &Weak<Self>| {
            let model = Self::new();
            let this: Weak<dyn Model> = this.clone();
            model.core().bind(this);
            model
        });
        model.fields();
        model.after_init();
        model
    }

    /// The canonical instance for `identifier` in the default registry
    fn with_identifier(identifier: &str) -> Arc<Self>
    where
        Self: Sized,
    {
        Self::with_identifier_in(identifier, &IdentityRegistry::global())
    }

    fn with_identifier_in(identifier: &str, registry: &IdentityRegistry) -> Arc<Self>
    where
        Self: Sized,
    {
        if let Some(existing) = registry.get::<Self>(identifier) {
            return existing;
        }

        let model = Self::create();
        let options = DecodeOptions::default().without_registry();
        match model.identifier_field() {
            Some(field) => field.import_identifier(identifier, &ImportContext::new(&options)),
            None => {
                warn!(model = model.model_name(), "model has no identifier field");
                return model;
            }
        }
        registry.canonicalize(model, identifier).0
    }

    /// Decode with default options, canonicalizing through the default
    /// registry
    fn from_attributes(map: &AttributeMap) -> Arc<Self>
    where
        Self: Sized,
    {
        Self::from_attributes_with(map, &DecodeOptions::default(), None)
    }

    fn from_attributes_with(
        map: &AttributeMap,
        options: &DecodeOptions,
        configure: Option<Configure<'_, Self>>,
    ) -> Arc<Self>
    where
        Self: Sized,
    {
        let ctx = ImportContext::new(options);
        decode::<Self>(map, &ctx, configure)
    }

    /// Decode a raw value, failing when it is not an attribute map
    fn try_from_attributes(value: &Value, options: &DecodeOptions) -> ModelResult<Arc<Self>>
    where
        Self: Sized,
    {
        match value.as_object() {
            Some(map) => Ok(Self::from_attributes_with(map, options, None)),
            None => Err(ModelError::Deserialization(format!(
                "expected an attribute map for {}, found {}",
                std::any::type_name::<Self>(),
                serialization::describe(value)
            ))),
        }
    }
}

impl dyn Model {
    pub fn is<M: Model>(&self) -> bool {
        self.model_type() == TypeId::of::<M>()
    }

    pub fn downcast_ref<M: Model>(&self) -> Option<&M> {
        AsAny::as_any(self).downcast_ref::<M>()
    }
}

impl fmt::Debug for dyn Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.model_name(), self.core().id())
    }
}

/// Recover the concrete type of a shared model
pub fn downcast_model<M: Model>(model: &Arc<dyn Model>) -> Option<Arc<M>> {
    model.clone().into_any_arc().downcast::<M>().ok()
}
