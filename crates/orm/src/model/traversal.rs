//! Depth-first walks over the model graph.
//!
//! Every walk threads one visited set keyed by [`ModelId`] through the
//! whole traversal, so a model reachable along several paths (or through a
//! cycle) is processed once.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use super::{Model, ModelId};
use crate::field::AnyField;
use crate::transformer::ExportContext;

/// A field value met during [`Model::visit_all_field_values`]
pub enum FieldValueRef<'a> {
    /// A non-relationship value, as exported by its transformer
    Value { key: &'a str, value: Value },
    /// A model referenced by a relationship field
    Model { key: &'a str, model: &'a Arc<dyn Model> },
}

impl FieldValueRef<'_> {
    pub fn key(&self) -> &str {
        match self {
            FieldValueRef::Value { key, .. } | FieldValueRef::Model { key, .. } => key,
        }
    }
}

/// A field located through a key path, kept alive with its model
pub struct FieldHandle {
    model: Arc<dyn Model>,
    key: String,
}

impl FieldHandle {
    pub fn model(&self) -> &Arc<dyn Model> {
        &self.model
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn field(&self) -> Option<&dyn AnyField> {
        self.model.field(&self.key)
    }
}

pub(crate) fn walk_fields<M: Model + ?Sized>(
    model: &M,
    recursive: bool,
    seen: &mut HashSet<ModelId>,
    visitor: &mut dyn FnMut(&str, &dyn AnyField),
) {
    if !seen.insert(model.core().id()) {
        return;
    }
    for (key, field) in model.fields() {
        visitor(key, field);
        if recursive {
            for target in field.related_models() {
                walk_fields(&*target, recursive, seen, visitor);
            }
        }
    }
}

pub(crate) fn walk_values<M: Model + ?Sized>(
    model: &M,
    recursive: bool,
    seen: &mut HashSet<ModelId>,
    visitor: &mut dyn FnMut(FieldValueRef<'_>),
) {
    if !seen.insert(model.core().id()) {
        return;
    }
    for (key, field) in model.fields() {
        if field.is_relationship() {
            for target in field.related_models() {
                visitor(FieldValueRef::Model { key, model: &target });
                if recursive {
                    walk_values(&*target, recursive, seen, visitor);
                }
            }
        } else if field.has_value() {
            let value = field.export_value(&mut ExportContext::default());
            visitor(FieldValueRef::Value { key, value });
        }
    }
}

pub(crate) fn fill_shells<M: Model + ?Sized>(
    model: &M,
    recursive: bool,
    lookup: &dyn Fn(&Arc<dyn Model>) -> Option<Arc<dyn Model>>,
    seen: &mut HashSet<ModelId>,
) {
    if !seen.insert(model.core().id()) {
        return;
    }
    for (_, field) in model.fields() {
        for target in field.related_models() {
            if !target.is_shell() {
                if recursive {
                    fill_shells(&*target, recursive, lookup, seen);
                }
                continue;
            }
            let Some(replacement) = lookup(&target) else {
                continue;
            };
            if recursive {
                fill_shells(&*replacement, recursive, lookup, seen);
            }
            field.replace_related(&target, replacement);
        }
    }
}

pub(crate) fn resolve_key_path(model: Arc<dyn Model>, components: &[String]) -> Option<FieldHandle> {
    let (first, rest) = components.split_first()?;
    if rest.is_empty() {
        model.field(first)?;
        return Some(FieldHandle {
            model,
            key: first.clone(),
        });
    }
    let next = model.field(first)?.related_models().into_iter().next()?;
    resolve_key_path(next, rest)
}
