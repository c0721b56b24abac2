//! Transformers for model-valued fields

use std::fmt;
use std::marker::PhantomData;

use serde_json::Value;
use tracing::debug;

use super::{ExportContext, ImportContext, ValueTransformer};
use crate::model::{decode, export_nested, shell, Model};
use crate::relationships::ModelRef;

/// Embeds a related model as a nested attribute map
pub struct ModelValueTransformer<M> {
    _model: PhantomData<fn() -> M>,
}

impl<M> ModelValueTransformer<M> {
    pub fn new() -> Self {
        Self { _model: PhantomData }
    }
}

impl<M> Default for ModelValueTransformer<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for ModelValueTransformer<M> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for ModelValueTransformer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelValueTransformer<{}>", std::any::type_name::<M>())
    }
}

impl<M: Model> ValueTransformer<ModelRef<M>> for ModelValueTransformer<M> {
    fn import_value(&self, raw: &Value, ctx: &ImportContext<'_>) -> Option<ModelRef<M>> {
        match raw {
            Value::Object(map) => Some(ModelRef::new(decode::<M>(map, ctx, None))),
            other => {
                debug!(found = %other, "expected a nested attribute map");
                None
            }
        }
    }

    fn export_value(&self, value: &ModelRef<M>, ctx: &mut ExportContext) -> Value {
        Value::Object(export_nested(value.model(), ctx))
    }
}

/// Serializes a related model as its identifier only.
///
/// On import a scalar becomes a shell instance (or the live instance already
/// registered for that identifier); a nested map is decoded in full.
pub struct ForeignKeyTransformer<M> {
    _model: PhantomData<fn() -> M>,
}

impl<M> ForeignKeyTransformer<M> {
    pub fn new() -> Self {
        Self { _model: PhantomData }
    }
}

impl<M> Default for ForeignKeyTransformer<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for ForeignKeyTransformer<M> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for ForeignKeyTransformer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForeignKeyTransformer<{}>", std::any::type_name::<M>())
    }
}

impl<M: Model> ValueTransformer<ModelRef<M>> for ForeignKeyTransformer<M> {
    fn import_value(&self, raw: &Value, ctx: &ImportContext<'_>) -> Option<ModelRef<M>> {
        match raw {
            Value::Object(map) => Some(ModelRef::new(decode::<M>(map, ctx, None))),
            Value::String(_) | Value::Number(_) => shell::<M>(raw, ctx).map(ModelRef::new),
            other => {
                debug!(found = %other, "expected an identifier");
                None
            }
        }
    }

    fn export_value(&self, value: &ModelRef<M>, ctx: &mut ExportContext) -> Value {
        value
            .identifier_field()
            .map_or(Value::Null, |field| field.export_value(ctx))
    }
}
