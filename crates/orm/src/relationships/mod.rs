//! Relationships Module - model-valued fields with inverse maintenance
//!
//! - [`ModelField`]: a reference to at most one related model
//! - [`ModelArrayField`]: an ordered, de-duplicated list of related models
//!
//! A relationship may name its inverse, the field on the related model that
//! points back. Assigning one side then updates the other side exactly once:
//! the originating side calls `inverse_value_added`/`inverse_value_removed`
//! on the related field, which stores directly and never calls back.

mod array_field;
mod model_field;

pub use array_field::ModelArrayField;
pub use model_field::ModelField;

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use tracing::warn;

use crate::model::{Model, ModelId};

/// Shared reference to a related model. Equality is reference identity.
pub struct ModelRef<M>(Arc<M>);

impl<M: Model> ModelRef<M> {
    pub fn new(model: Arc<M>) -> Self {
        ModelRef(model)
    }

    pub fn model(&self) -> &M {
        &self.0
    }

    pub fn arc(&self) -> &Arc<M> {
        &self.0
    }

    pub fn into_inner(self) -> Arc<M> {
        self.0
    }

    pub fn model_id(&self) -> ModelId {
        self.0.core().id()
    }

    pub(crate) fn as_dyn(&self) -> Arc<dyn Model> {
        self.0.clone()
    }
}

impl<M> Clone for ModelRef<M> {
    fn clone(&self) -> Self {
        ModelRef(self.0.clone())
    }
}

impl<M> PartialEq for ModelRef<M> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<M> Eq for ModelRef<M> {}

impl<M> Deref for ModelRef<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.0
    }
}

impl<M: Model> From<Arc<M>> for ModelRef<M> {
    fn from(model: Arc<M>) -> Self {
        ModelRef(model)
    }
}

impl<M: Model> fmt::Debug for ModelRef<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.0.model_name(), self.0.core().id())
    }
}

/// The receiving side of inverse maintenance
pub trait InverseField: Send + Sync {
    /// `owner` started referencing the model that declares this field
    fn inverse_value_added(&self, owner: &Arc<dyn Model>);

    /// `owner` stopped referencing the model that declares this field
    fn inverse_value_removed(&self, owner: &Arc<dyn Model>);
}

/// Locates the inverse field on a related model
pub type InverseFn<M> = fn(&M) -> &dyn InverseField;

/// Wiring shared by both relationship field kinds
pub(crate) struct Relation<M> {
    owner: OnceCell<Weak<dyn Model>>,
    pub(crate) inverse: Option<InverseFn<M>>,
    pub(crate) foreign_key: bool,
    pub(crate) cascade_delete: bool,
    pub(crate) require_valid: bool,
}

impl<M> Default for Relation<M> {
    fn default() -> Self {
        Self {
            owner: OnceCell::new(),
            inverse: None,
            foreign_key: false,
            cascade_delete: false,
            require_valid: false,
        }
    }
}

impl<M> Relation<M> {
    pub(crate) fn bind_owner(&self, owner: &Weak<dyn Model>) {
        if let Err(owner) = self.owner.set(owner.clone()) {
            let bound = self.owner.get().is_some_and(|current| Weak::ptr_eq(current, &owner));
            if !bound {
                warn!("relationship field is already owned by another model");
            }
        }
    }

    /// The declaring model, while it is alive
    pub(crate) fn owner(&self) -> Option<Arc<dyn Model>> {
        self.owner.get().and_then(Weak::upgrade)
    }

    /// The owner together with the inverse accessor, when both exist
    pub(crate) fn wiring(&self) -> Option<(Arc<dyn Model>, InverseFn<M>)> {
        let inverse = self.inverse?;
        Some((self.owner()?, inverse))
    }
}

impl<M> fmt::Debug for Relation<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("has_owner", &self.owner.get().is_some())
            .field("has_inverse", &self.inverse.is_some())
            .field("foreign_key", &self.foreign_key)
            .field("cascade_delete", &self.cascade_delete)
            .field("require_valid", &self.require_valid)
            .finish()
    }
}
