//! Observer subscriptions for fields

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::{AnyField, Field, FieldInner, FieldValue};

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

/// Token returned when subscribing to a field, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    pub(crate) fn next() -> Self {
        ObserverId(NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An object notified when a field's value changes.
///
/// Fields hold observers weakly; dropping the last `Arc` to an observer
/// unsubscribes it.
pub trait FieldObserver: Send + Sync {
    fn field_value_changed(&self, field: &dyn AnyField);
}

pub(crate) type FieldAction<T> = Arc<dyn Fn(&Field<T>) + Send + Sync>;

pub(crate) enum Subscriber<T: FieldValue> {
    Observer(Weak<dyn FieldObserver>),
    /// Another field following this one
    Binding(Weak<FieldInner<T>>),
    Action(FieldAction<T>),
}

impl<T: FieldValue> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        match self {
            Subscriber::Observer(observer) => Subscriber::Observer(observer.clone()),
            Subscriber::Binding(target) => Subscriber::Binding(target.clone()),
            Subscriber::Action(action) => Subscriber::Action(action.clone()),
        }
    }
}

pub(crate) struct Subscription<T: FieldValue> {
    pub id: ObserverId,
    pub subscriber: Subscriber<T>,
}

impl<T: FieldValue> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            subscriber: self.subscriber.clone(),
        }
    }
}

impl<T: FieldValue> Subscription<T> {
    pub fn new(subscriber: Subscriber<T>) -> Self {
        Self {
            id: ObserverId::next(),
            subscriber,
        }
    }

    pub fn is_live(&self) -> bool {
        match &self.subscriber {
            Subscriber::Observer(observer) => observer.strong_count() > 0,
            Subscriber::Binding(target) => target.strong_count() > 0,
            Subscriber::Action(_) => true,
        }
    }
}
