//! Value transformers
//!
//! A transformer converts between a field's native value and the
//! `serde_json::Value` stored in attribute maps. Import is lenient: a raw
//! value of the wrong shape yields `None` rather than an error.

mod model;

pub use model::{ForeignKeyTransformer, ModelValueTransformer};

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::DecodeOptions;
use crate::model::ModelId;
use crate::registry::IdentityRegistry;

/// Converts between a field value and its serialized form
pub trait ValueTransformer<T>: Send + Sync {
    fn import_value(&self, raw: &Value, ctx: &ImportContext<'_>) -> Option<T>;

    fn export_value(&self, value: &T, ctx: &mut ExportContext) -> Value;
}

/// State shared by every import within one decode
pub struct ImportContext<'a> {
    options: &'a DecodeOptions,
    registry: Option<Arc<IdentityRegistry>>,
}

impl<'a> ImportContext<'a> {
    pub fn new(options: &'a DecodeOptions) -> Self {
        Self {
            options,
            registry: options.registry(),
        }
    }

    pub fn options(&self) -> &'a DecodeOptions {
        self.options
    }

    /// The registry to canonicalize through, when canonicalization is on
    pub fn registry(&self) -> Option<&Arc<IdentityRegistry>> {
        self.registry.as_ref()
    }
}

/// State threaded through one serialization call.
///
/// `seen_models` records every model exported so far; a model met again is
/// written as its identifier only.
#[derive(Debug, Default)]
pub struct ExportContext {
    explicit_null: bool,
    seen_models: HashSet<ModelId>,
}

impl ExportContext {
    pub fn new(explicit_null: bool) -> Self {
        Self {
            explicit_null,
            seen_models: HashSet::new(),
        }
    }

    pub fn explicit_null(&self) -> bool {
        self.explicit_null
    }

    /// Record a model as exported. Returns false if it already was.
    pub fn mark_seen(&mut self, id: ModelId) -> bool {
        self.seen_models.insert(id)
    }

    pub fn has_seen(&self, id: ModelId) -> bool {
        self.seen_models.contains(&id)
    }
}

/// Identity transformer backed by serde
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeTransformer;

impl<T: Serialize + DeserializeOwned> ValueTransformer<T> for SerdeTransformer {
    fn import_value(&self, raw: &Value, _ctx: &ImportContext<'_>) -> Option<T> {
        match serde_json::from_value(raw.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(error = %err, "ignoring value of unexpected shape");
                None
            }
        }
    }

    fn export_value(&self, value: &T, _ctx: &mut ExportContext) -> Value {
        serde_json::to_value(value).unwrap_or_else(|err| {
            debug!(error = %err, "value could not be exported");
            Value::Null
        })
    }
}

/// Applies an element transformer to every item of an array.
/// Elements that fail to import are skipped.
pub struct ArrayTransformer<T> {
    element: Arc<dyn ValueTransformer<T>>,
}

impl<T> ArrayTransformer<T> {
    pub fn new(element: impl ValueTransformer<T> + 'static) -> Self {
        Self {
            element: Arc::new(element),
        }
    }
}

impl<T> ValueTransformer<Vec<T>> for ArrayTransformer<T> {
    fn import_value(&self, raw: &Value, ctx: &ImportContext<'_>) -> Option<Vec<T>> {
        let items = raw.as_array()?;
        Some(
            items
                .iter()
                .filter_map(|item| self.element.import_value(item, ctx))
                .collect(),
        )
    }

    fn export_value(&self, value: &Vec<T>, ctx: &mut ExportContext) -> Value {
        Value::Array(
            value
                .iter()
                .map(|item| self.element.export_value(item, ctx))
                .collect(),
        )
    }
}

type ImportFn<T> = Box<dyn Fn(&Value) -> Option<T> + Send + Sync>;
type ExportFn<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;

/// Transformer built from a pair of closures
pub struct ClosureTransformer<T> {
    import: ImportFn<T>,
    export: ExportFn<T>,
}

impl<T> ClosureTransformer<T> {
    pub fn new<I, E>(import: I, export: E) -> Self
    where
        I: Fn(&Value) -> Option<T> + Send + Sync + 'static,
        E: Fn(&T) -> Value + Send + Sync + 'static,
    {
        Self {
            import: Box::new(import),
            export: Box::new(export),
        }
    }
}

impl<T> fmt::Debug for ClosureTransformer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureTransformer").finish_non_exhaustive()
    }
}

impl<T> ValueTransformer<T> for ClosureTransformer<T> {
    fn import_value(&self, raw: &Value, _ctx: &ImportContext<'_>) -> Option<T> {
        (self.import)(raw)
    }

    fn export_value(&self, value: &T, _ctx: &mut ExportContext) -> Value {
        (self.export)(value)
    }
}
