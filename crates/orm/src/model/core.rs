//! Per-instance state every model embeds

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use tracing::warn;

use super::Model;

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Reference identity of a live model instance.
///
/// Two distinct instances with equal attributes have different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(u64);

impl ModelId {
    pub(crate) fn next() -> Self {
        ModelId(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bookkeeping shared by all models: identity, a weak self reference, the
/// memoized field registry and the shell/editable flags
#[derive(Debug)]
pub struct ModelCore {
    id: ModelId,
    this: OnceCell<Weak<dyn Model>>,
    keys: OnceCell<Vec<String>>,
    shell: AtomicBool,
    editable: AtomicBool,
    validating: AtomicBool,
}

impl Default for ModelCore {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelCore {
    pub fn new() -> Self {
        Self {
            id: ModelId::next(),
            this: OnceCell::new(),
            keys: OnceCell::new(),
            shell: AtomicBool::new(false),
            editable: AtomicBool::new(true),
            validating: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub(crate) fn bind(&self, this: Weak<dyn Model>) {
        if self.this.set(this).is_err() {
            warn!(model = %self.id, "model is already bound to an allocation");
        }
    }

    /// The `Arc` this model lives in, when it was built with
    /// [`Model::create`]
    pub fn this(&self) -> Option<Arc<dyn Model>> {
        self.this.get().and_then(Weak::upgrade)
    }

    pub(crate) fn this_weak(&self) -> Option<&Weak<dyn Model>> {
        self.this.get()
    }

    pub(crate) fn keys(&self) -> &OnceCell<Vec<String>> {
        &self.keys
    }

    pub fn is_shell(&self) -> bool {
        self.shell.load(Ordering::Acquire)
    }

    pub(crate) fn set_shell(&self, shell: bool) {
        self.shell.store(shell, Ordering::Release);
    }

    pub fn is_editable(&self) -> bool {
        self.editable.load(Ordering::Acquire)
    }

    pub fn set_editable(&self, editable: bool) {
        self.editable.store(editable, Ordering::Release);
    }

    /// Mark the model as being validated. Returns `None` if it already is,
    /// which stops `require_valid` cycles.
    pub(crate) fn begin_validation(&self) -> Option<ValidationGuard<'_>> {
        self.validating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ValidationGuard { core: self })
    }
}

pub(crate) struct ValidationGuard<'a> {
    core: &'a ModelCore,
}

impl Drop for ValidationGuard<'_> {
    fn drop(&mut self) {
        self.core.validating.store(false, Ordering::Release);
    }
}
