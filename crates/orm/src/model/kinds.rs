//! Polymorphic decoding through a discriminator dispatch table

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{decode, AttributeMap, Model};
use crate::config::DecodeOptions;
use crate::error::{ModelError, ModelResult};
use crate::field::identifier_string;
use crate::transformer::ImportContext;

type Constructor = Arc<dyn Fn(&AttributeMap, &ImportContext<'_>) -> Arc<dyn Model> + Send + Sync>;

fn constructor<M: Model>() -> Constructor {
    Arc::new(|map: &AttributeMap, ctx: &ImportContext<'_>| -> Arc<dyn Model> {
        decode::<M>(map, ctx, None)
    })
}

/// Maps discriminator values to concrete model types.
///
/// ```ignore
/// let letters = ModelKinds::new("letter")
///     .register::<A>("a")
///     .register::<B>("b")
///     .fallback::<Letter>();
/// let model = letters.from_attributes(&map);
/// ```
#[derive(Clone)]
pub struct ModelKinds {
    discriminator: String,
    kinds: HashMap<String, Constructor>,
    fallback: Option<Constructor>,
}

impl ModelKinds {
    pub fn new(discriminator: impl Into<String>) -> Self {
        Self {
            discriminator: discriminator.into(),
            kinds: HashMap::new(),
            fallback: None,
        }
    }

    pub fn register<M: Model>(mut self, kind: impl Into<String>) -> Self {
        self.kinds.insert(kind.into(), constructor::<M>());
        self
    }

    /// Type used when the discriminator is missing or unregistered
    pub fn fallback<M: Model>(mut self) -> Self {
        self.fallback = Some(constructor::<M>());
        self
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// The discriminator value in `map`, normalized to a string
    pub fn kind_of(&self, map: &AttributeMap) -> Option<String> {
        map.get(&self.discriminator).and_then(identifier_string)
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    fn resolve(&self, map: &AttributeMap) -> Option<&Constructor> {
        self.kind_of(map)
            .and_then(|kind| self.kinds.get(&kind))
            .or(self.fallback.as_ref())
    }

    pub fn from_attributes(&self, map: &AttributeMap) -> Option<Arc<dyn Model>> {
        self.from_attributes_with(map, &DecodeOptions::default())
    }

    /// Decode into the registered type, or `None` when no type is selected
    pub fn from_attributes_with(&self, map: &AttributeMap, options: &DecodeOptions) -> Option<Arc<dyn Model>> {
        let Some(constructor) = self.resolve(map) else {
            debug!(discriminator = %self.discriminator, "no model kind selected");
            return None;
        };
        let ctx = ImportContext::new(options);
        Some(constructor(map, &ctx))
    }

    pub fn try_from_attributes(&self, map: &AttributeMap, options: &DecodeOptions) -> ModelResult<Arc<dyn Model>> {
        self.from_attributes_with(map, options)
            .ok_or_else(|| ModelError::UnresolvedKind {
                discriminator: self.discriminator.clone(),
                value: map
                    .get(&self.discriminator)
                    .map_or_else(|| "missing".to_string(), |value| value.to_string()),
            })
    }
}

impl fmt::Debug for ModelKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.kinds.keys().collect();
        kinds.sort();
        f.debug_struct("ModelKinds")
            .field("discriminator", &self.discriminator)
            .field("kinds", &kinds)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
