//! Option structs for serialization, decoding and the identity registry

use std::sync::Arc;

use crate::field::{AnyField, FieldId};
use crate::registry::IdentityRegistry;

/// Options for [`Model::to_attributes`](crate::model::Model::to_attributes)
#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
    /// Write `null` for fields without a value instead of omitting the key
    pub explicit_null: bool,
    /// Export exactly these fields, whatever their state
    pub fields: Option<Vec<FieldId>>,
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_explicit_null(mut self, explicit_null: bool) -> Self {
        self.explicit_null = explicit_null;
        self
    }

    /// Add a field to the selection. The first call switches from
    /// "every set field" to "only the selected fields".
    pub fn only(mut self, field: &dyn AnyField) -> Self {
        self.fields.get_or_insert_with(Vec::new).push(field.field_id());
        self
    }
}

/// Options for [`Model::from_attributes_with`](crate::model::Model::from_attributes_with)
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Canonicalize decoded models through an identity registry
    pub use_registry: bool,
    /// Registry to use; `None` selects the process-wide default
    pub registry: Option<Arc<IdentityRegistry>>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            use_registry: true,
            registry: None,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: Arc<IdentityRegistry>) -> Self {
        self.use_registry = true;
        self.registry = Some(registry);
        self
    }

    pub fn without_registry(mut self) -> Self {
        self.use_registry = false;
        self
    }

    /// The registry decoding should consult, if any
    pub fn registry(&self) -> Option<Arc<IdentityRegistry>> {
        if !self.use_registry {
            return None;
        }
        Some(
            self.registry
                .clone()
                .unwrap_or_else(IdentityRegistry::global),
        )
    }
}

/// How the identity registry holds canonical instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    /// Entries never keep a model alive; dead entries are replaced on demand
    #[default]
    Weak,
    /// Entries keep models alive until removed or cleared
    Strong,
}

/// Configuration for an [`IdentityRegistry`]
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    pub retention: Retention,
}

impl RegistryConfig {
    pub fn strong() -> Self {
        Self {
            retention: Retention::Strong,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_options_registry_selection() {
        let options = DecodeOptions::default();
        assert!(options.use_registry);
        assert!(Arc::ptr_eq(
            &options.registry().unwrap(),
            &IdentityRegistry::global()
        ));

        let registry = Arc::new(IdentityRegistry::new());
        let options = DecodeOptions::new().with_registry(registry.clone());
        assert!(Arc::ptr_eq(&options.registry().unwrap(), &registry));

        assert!(options.without_registry().registry().is_none());
    }

    #[test]
    fn test_registry_config_defaults_to_weak() {
        assert_eq!(RegistryConfig::default().retention, Retention::Weak);
        assert_eq!(RegistryConfig::strong().retention, Retention::Strong);
    }
}
