//! Field registry, attribute map export, and decoding through the identity
//! registry

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::{AttributeMap, Configure, FieldList, Model};
use crate::field::{identifier_string, AnyField, FieldId};
use crate::transformer::{ExportContext, ImportContext};

/// Which fields an export includes
pub(crate) enum FieldSelection<'a> {
    /// Fields whose state is `Set`
    Set,
    /// Every registered field
    All,
    /// Exactly these fields
    Only(&'a [FieldId]),
}

impl FieldSelection<'_> {
    fn includes(&self, field: &dyn AnyField) -> bool {
        match self {
            FieldSelection::Set => field.is_set(),
            FieldSelection::All => true,
            FieldSelection::Only(ids) => ids.contains(&field.field_id()),
        }
    }
}

pub(crate) fn registered_fields<M: Model + ?Sized>(model: &M) -> Vec<(&str, &dyn AnyField)> {
    let mut list = FieldList::new();
    model.declare_fields(&mut list);
    let keys = model
        .core()
        .keys()
        .get_or_init(|| build_registry(model, &list));

    keys.iter()
        .map(String::as_str)
        .zip(list.entries.into_iter().map(|(_, field)| field))
        .collect()
}

/// Assign default keys, bind owners and run the `initialize_field` hook
fn build_registry<M: Model + ?Sized>(model: &M, list: &FieldList<'_>) -> Vec<String> {
    let owner = model.core().this_weak();
    let mut seen = HashSet::new();
    let mut keys = Vec::with_capacity(list.len());

    for (name, field) in &list.entries {
        field.assign_default_key(name);
        let key = field.key().unwrap_or_else(|| name.to_string());
        if !seen.insert(key.clone()) {
            warn!(model = model.model_name(), key = %key, "duplicate field key");
        }
        if let Some(owner) = owner {
            field.bind_owner(owner);
        }
        model.initialize_field(&key, *field);
        keys.push(key);
    }
    keys
}

pub(crate) fn export_attributes<M: Model + ?Sized>(
    model: &M,
    ctx: &mut ExportContext,
    selection: FieldSelection<'_>,
) -> AttributeMap {
    let mut map = AttributeMap::new();
    for (key, field) in model.fields() {
        if !selection.includes(field) {
            continue;
        }
        let value = field.export_value(ctx);
        if value.is_null() && !ctx.explicit_null() {
            continue;
        }
        map.insert(key.to_string(), value);
    }
    map
}

/// Export a related model. A model already written in this call degrades to
/// its identifier; with `explicit_null` every field is written.
pub(crate) fn export_nested(model: &dyn Model, ctx: &mut ExportContext) -> AttributeMap {
    if !ctx.mark_seen(model.core().id()) {
        return identifier_attributes(model, ctx);
    }
    let selection = if ctx.explicit_null() {
        FieldSelection::All
    } else {
        FieldSelection::Set
    };
    export_attributes(model, ctx, selection)
}

fn identifier_attributes(model: &dyn Model, ctx: &mut ExportContext) -> AttributeMap {
    let mut map = AttributeMap::new();
    if let Some(field) = model.identifier_field() {
        if let Some(key) = field.key() {
            map.insert(key, field.export_value(ctx));
        }
    }
    map
}

/// Import every registered key present in `map`. Absent keys leave fields
/// untouched. A scalar identifier goes through
/// [`AnyField::import_identifier`], so `"7"` and `7` both reach an integer
/// or a string identifier field.
pub(crate) fn import_attributes<M: Model + ?Sized>(model: &M, map: &AttributeMap, ctx: &ImportContext<'_>) {
    let identifier_field = model.identifier_field().map(|field| field.field_id());
    for (key, field) in model.fields() {
        let Some(raw) = map.get(key) else {
            continue;
        };
        match identifier_string(raw) {
            Some(identifier) if identifier_field == Some(field.field_id()) => {
                field.import_identifier(&identifier, ctx)
            }
            _ => field.import_value(raw, ctx),
        }
    }
}

/// Build (or find) the instance described by `map`.
///
/// The identifier is imported first so the canonical instance can be chosen
/// before any relationship field wires inverses; the remaining fields are
/// then imported into whichever instance wins.
pub(crate) fn decode<M: Model>(
    map: &AttributeMap,
    ctx: &ImportContext<'_>,
    configure: Option<Configure<'_, M>>,
) -> Arc<M> {
    let fresh = M::create();
    let identifier = fresh.identifier_field().and_then(|field| {
        let raw = map.get(&field.key()?)?;
        field.import_identifier(&identifier_string(raw)?, ctx);
        fresh.identifier()
    });

    let (model, is_new) = match (ctx.registry(), identifier) {
        (Some(registry), Some(identifier)) => registry.canonicalize(fresh, &identifier),
        _ => (fresh, true),
    };

    import_attributes(&*model, map, ctx);
    model.core().set_shell(false);

    if let Some(configure) = configure {
        configure(&model, is_new);
    }
    model
}

/// A placeholder carrying only an identifier, or the canonical instance for
/// it when one is registered
pub(crate) fn shell<M: Model>(raw: &Value, ctx: &ImportContext<'_>) -> Option<Arc<M>> {
    let identifier = identifier_string(raw)?;

    if let Some(existing) = ctx.registry().and_then(|registry| registry.get::<M>(&identifier)) {
        debug!(identifier = %identifier, "foreign key resolved to a live instance");
        return Some(existing);
    }

    let shell = M::create();
    {
        let Some(field) = shell.identifier_field() else {
            debug!(model = shell.model_name(), "cannot build a shell without an identifier field");
            return None;
        };
        field.import_identifier(&identifier, ctx);
        if !field.has_value() {
            debug!(identifier = %identifier, "identifier rejected by the identifier field");
            return None;
        }
    }
    shell.core().set_shell(true);

    match ctx.registry() {
        Some(registry) => Some(registry.canonicalize(shell, &identifier).0),
        None => Some(shell),
    }
}

pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
