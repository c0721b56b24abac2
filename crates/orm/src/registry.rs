//! Identity Registry - one canonical live instance per (model type, identifier)
//!
//! Decoding consults the registry so that the same identifier arriving
//! through different attribute maps (or as a foreign key) resolves to a
//! single shared instance. Entries are weak by default; a dead entry counts
//! as absent and is replaced on the next insert.

use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::config::{RegistryConfig, Retention};
use crate::model::{downcast_model, Model};

type RegistryKey = (TypeId, String);

enum Slot {
    Weak(Weak<dyn Model>),
    Strong(Arc<dyn Model>),
}

impl Slot {
    fn new(model: Arc<dyn Model>, retention: Retention) -> Self {
        match retention {
            Retention::Weak => Slot::Weak(Arc::downgrade(&model)),
            Retention::Strong => Slot::Strong(model),
        }
    }

    fn get(&self) -> Option<Arc<dyn Model>> {
        match self {
            Slot::Weak(model) => model.upgrade(),
            Slot::Strong(model) => Some(model.clone()),
        }
    }

    fn is_live(&self) -> bool {
        match self {
            Slot::Weak(model) => model.strong_count() > 0,
            Slot::Strong(_) => true,
        }
    }
}

static GLOBAL: Lazy<Arc<IdentityRegistry>> = Lazy::new(|| Arc::new(IdentityRegistry::new()));

/// Thread-safe identity map for decoded models
pub struct IdentityRegistry {
    entries: DashMap<RegistryKey, Slot>,
    config: RegistryConfig,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// The process-wide default registry
    pub fn global() -> Arc<IdentityRegistry> {
        GLOBAL.clone()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn key<M: Model>(identifier: &str) -> RegistryKey {
        (TypeId::of::<M>(), identifier.to_string())
    }

    /// The live canonical instance of `M` for `identifier`
    pub fn get<M: Model>(&self, identifier: &str) -> Option<Arc<M>> {
        let model = self.entries.get(&Self::key::<M>(identifier))?.get()?;
        downcast_model::<M>(&model)
    }

    pub fn get_dyn(&self, model_type: TypeId, identifier: &str) -> Option<Arc<dyn Model>> {
        self.entries
            .get(&(model_type, identifier.to_string()))?
            .get()
    }

    /// Register `model` as canonical for `identifier` unless a live instance
    /// already is. Returns the canonical instance and whether `model` became
    /// it.
    pub fn canonicalize<M: Model>(&self, model: Arc<M>, identifier: &str) -> (Arc<M>, bool) {
        match self.entries.entry(Self::key::<M>(identifier)) {
            Entry::Occupied(mut entry) => {
                if let Some(existing) = entry.get().get().and_then(|m| downcast_model::<M>(&m)) {
                    debug!(model = existing.model_name(), identifier, "registry hit");
                    return (existing, false);
                }
                entry.insert(Slot::new(model.clone(), self.config.retention));
                debug!(model = model.model_name(), identifier, "replaced dead registry entry");
                (model, true)
            }
            Entry::Vacant(entry) => {
                entry.insert(Slot::new(model.clone(), self.config.retention));
                debug!(model = model.model_name(), identifier, "registered canonical instance");
                (model, true)
            }
        }
    }

    /// Register an already-identified model. Returns false when another live
    /// instance holds its identifier.
    pub fn register(&self, model: &Arc<dyn Model>) -> bool {
        let Some(identifier) = model.identifier() else {
            return false;
        };
        match self.entries.entry((model.model_type(), identifier)) {
            Entry::Occupied(mut entry) => match entry.get().get() {
                Some(existing) => existing.core().id() == model.core().id(),
                None => {
                    entry.insert(Slot::new(model.clone(), self.config.retention));
                    true
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(Slot::new(model.clone(), self.config.retention));
                true
            }
        }
    }

    /// Forget `model` if it is the canonical instance for its identifier
    pub fn remove(&self, model: &dyn Model) -> bool {
        let Some(identifier) = model.identifier() else {
            return false;
        };
        let id = model.core().id();
        self.entries
            .remove_if(&(model.model_type(), identifier), |_, slot| {
                slot.get().map_or(true, |existing| existing.core().id() == id)
            })
            .is_some()
    }

    pub fn remove_identifier<M: Model>(&self, identifier: &str) -> bool {
        self.entries.remove(&Self::key::<M>(identifier)).is_some()
    }

    pub fn contains<M: Model>(&self, identifier: &str) -> bool {
        self.get::<M>(identifier).is_some()
    }

    /// Number of entries, including dead weak ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop entries whose model is gone. Returns how many were removed.
    pub fn purge(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.is_live());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "purged dead registry entries");
        }
        removed
    }
}

impl fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("entries", &self.entries.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{Company, Person};

    fn identified(identifier: &str) -> Arc<Person> {
        let person = Person::create();
        person.id.set(identifier.to_string());
        person
    }

    #[test]
    fn test_first_insert_wins() {
        let registry = IdentityRegistry::new();
        let first = identified("p1");
        let second = identified("p1");

        let (canonical, inserted) = registry.canonicalize(first.clone(), "p1");
        assert!(inserted);
        assert!(Arc::ptr_eq(&canonical, &first));

        let (canonical, inserted) = registry.canonicalize(second, "p1");
        assert!(!inserted);
        assert!(Arc::ptr_eq(&canonical, &first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_keys_include_model_type() {
        let registry = IdentityRegistry::new();
        let person = identified("42");
        registry.canonicalize(person, "42");
        assert!(registry.get::<Company>("42").is_none());
        assert!(registry.get_dyn(TypeId::of::<Company>(), "42").is_none());
    }

    #[test]
    fn test_weak_entries_expire() {
        let registry = IdentityRegistry::new();
        let person = identified("p1");
        registry.canonicalize(person.clone(), "p1");
        assert!(registry.contains::<Person>("p1"));

        drop(person);
        assert!(!registry.contains::<Person>("p1"));
        assert_eq!(registry.len(), 1);

        // a dead entry is replaced by the next instance
        let replacement = identified("p1");
        let (canonical, inserted) = registry.canonicalize(replacement.clone(), "p1");
        assert!(inserted);
        assert!(Arc::ptr_eq(&canonical, &replacement));

        drop(canonical);
        drop(replacement);
        assert_eq!(registry.purge(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_strong_retention() {
        let registry = IdentityRegistry::with_config(RegistryConfig::strong());
        assert_eq!(registry.config().retention, Retention::Strong);
        registry.canonicalize(identified("p1"), "p1");

        let person = registry.get::<Person>("p1").unwrap();
        assert_eq!(person.id.value(), Some("p1".to_string()));
        assert_eq!(registry.purge(), 0);

        assert!(registry.remove_identifier::<Person>("p1"));
        assert!(!registry.contains::<Person>("p1"));
    }

    #[test]
    fn test_register_and_remove() {
        let registry = IdentityRegistry::new();
        let person: Arc<dyn Model> = identified("p1");
        let twin: Arc<dyn Model> = identified("p1");
        let anonymous: Arc<dyn Model> = Person::create();

        assert!(registry.register(&person));
        assert!(registry.register(&person));
        assert!(!registry.register(&twin));
        assert!(!registry.register(&anonymous));
        assert!(registry.get_dyn(TypeId::of::<Person>(), "p1").is_some());

        assert!(!registry.remove(&*twin));
        assert!(registry.remove(&*person));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_global_registry_is_shared() {
        assert!(Arc::ptr_eq(&IdentityRegistry::global(), &IdentityRegistry::global()));
    }

    #[test]
    fn test_clear() {
        let registry = IdentityRegistry::new();
        let person = identified("p1");
        registry.canonicalize(person, "p1");
        registry.clear();
        assert!(registry.is_empty());
    }
}
