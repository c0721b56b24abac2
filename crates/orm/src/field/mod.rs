//! Reactive fields
//!
//! A [`Field`] holds one optional value plus its lifecycle state, notifies
//! observers when the value changes, and knows how to move that value in and
//! out of attribute maps through its [`ValueTransformer`].
//!
//! Notification is synchronous and runs in registration order. No lock is
//! held while observers run, so observers may freely read or write other
//! fields (including the one that notified them).

mod any;
mod observer;
mod validation;

pub use any::AnyField;
pub use observer::{FieldObserver, ObserverId};
pub use validation::ValidationState;

pub(crate) use any::identifier_string;

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use fieldkit_validation::{RequiredValidator, ValidationRule};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::transformer::{ExportContext, ImportContext, SerdeTransformer, ValueTransformer};
use observer::{Subscriber, Subscription};
use validation::FieldValidation;

/// Whether a field has been assigned since it was created or last reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldState {
    #[default]
    Unset,
    Set,
}

/// Bound for values a field can hold
pub trait FieldValue: Clone + PartialEq + Send + Sync + 'static {}

impl<T: Clone + PartialEq + Send + Sync + 'static> FieldValue for T {}

/// Identity of one field instance, used for selective serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(usize);

struct Slot<T> {
    value: Option<T>,
    state: FieldState,
}

struct FieldMeta<T> {
    key: Option<String>,
    name: Option<String>,
    allowed_values: Vec<T>,
    rules: Vec<Arc<dyn ValidationRule>>,
    transformer: Arc<dyn ValueTransformer<T>>,
}

pub(crate) struct FieldInner<T: FieldValue> {
    slot: Mutex<Slot<T>>,
    meta: RwLock<FieldMeta<T>>,
    validation: Mutex<FieldValidation>,
    subscriptions: Mutex<Vec<Subscription<T>>>,
    /// The field this one follows, and our subscription token on it
    following: Mutex<Option<(Weak<FieldInner<T>>, ObserverId)>>,
}

/// A reactive, observable holder of a single value
pub struct Field<T: FieldValue> {
    inner: Arc<FieldInner<T>>,
}

impl<T: FieldValue + Serialize + DeserializeOwned> Field<T> {
    /// A field using the serde identity transformer
    pub fn new() -> Self {
        Self::with_transformer(SerdeTransformer)
    }
}

impl<T: FieldValue + Serialize + DeserializeOwned> Default for Field<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FieldValue> Field<T> {
    pub fn with_transformer(transformer: impl ValueTransformer<T> + 'static) -> Self {
        Self {
            inner: Arc::new(FieldInner {
                slot: Mutex::new(Slot {
                    value: None,
                    state: FieldState::Unset,
                }),
                meta: RwLock::new(FieldMeta {
                    key: None,
                    name: None,
                    allowed_values: Vec::new(),
                    rules: Vec::new(),
                    transformer: Arc::new(transformer),
                }),
                validation: Mutex::new(FieldValidation::default()),
                subscriptions: Mutex::new(Vec::new()),
                following: Mutex::new(None),
            }),
        }
    }

    fn from_inner(inner: Arc<FieldInner<T>>) -> Self {
        Self { inner }
    }

    pub fn with_key(self, key: impl Into<String>) -> Self {
        self.inner.meta.write().key = Some(key.into());
        self
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.inner.meta.write().name = Some(name.into());
        self
    }

    /// Initial value; the field starts out `Set`
    pub fn with_value(self, value: impl Into<Option<T>>) -> Self {
        self.store(value.into());
        self
    }

    pub fn allowed_values(self, values: impl IntoIterator<Item = T>) -> Self {
        self.inner.meta.write().allowed_values = values.into_iter().collect();
        self
    }

    pub fn require_not_nil(self) -> Self {
        self.rule(RequiredValidator::with_message("Field is required").allow_blank())
    }

    /// Add a validation rule, checked against the exported value
    pub fn rule(self, rule: impl ValidationRule + 'static) -> Self {
        self.inner.meta.write().rules.push(Arc::new(rule));
        self
    }

    pub fn transform(self, transformer: impl ValueTransformer<T> + 'static) -> Self {
        self.set_transformer(Arc::new(transformer));
        self
    }

    pub(crate) fn set_transformer(&self, transformer: Arc<dyn ValueTransformer<T>>) {
        self.inner.meta.write().transformer = transformer;
    }

    pub fn id(&self) -> FieldId {
        FieldId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    pub fn key(&self) -> Option<String> {
        self.inner.meta.read().key.clone()
    }

    pub fn name(&self) -> Option<String> {
        self.inner.meta.read().name.clone()
    }

    pub fn allowed(&self) -> Vec<T> {
        self.inner.meta.read().allowed_values.clone()
    }

    pub fn transformer(&self) -> Arc<dyn ValueTransformer<T>> {
        self.inner.meta.read().transformer.clone()
    }

    /// Name used in validation messages
    pub(crate) fn label(&self) -> String {
        let meta = self.inner.meta.read();
        meta.name
            .clone()
            .or_else(|| meta.key.clone())
            .unwrap_or_else(|| "Field".to_string())
    }

    pub fn value(&self) -> Option<T> {
        self.inner.slot.lock().value.clone()
    }

    pub fn state(&self) -> FieldState {
        self.inner.slot.lock().state
    }

    pub fn is_set(&self) -> bool {
        self.state() == FieldState::Set
    }

    /// Assign a value and mark the field `Set`.
    ///
    /// Observers run only when the value differs from the previous one. If
    /// this field was following another through a binding, it stops.
    pub fn set(&self, value: impl Into<Option<T>>) {
        self.unbind();
        self.store(value.into());
    }

    /// Return to `Unset` with no value
    pub fn reset(&self) {
        let changed = {
            let mut slot = self.inner.slot.lock();
            let changed = slot.value.is_some();
            slot.value = None;
            slot.state = FieldState::Unset;
            changed
        };
        if changed {
            self.notify();
        }
    }

    /// Store without touching bindings. Returns whether the value changed.
    pub(crate) fn store(&self, value: Option<T>) -> bool {
        let changed = {
            let mut slot = self.inner.slot.lock();
            let changed = slot.value != value;
            slot.value = value;
            slot.state = FieldState::Set;
            changed
        };
        if changed {
            self.notify();
        }
        changed
    }

    fn notify(&self) {
        let subscriptions: Vec<Subscription<T>> = self.inner.subscriptions.lock().clone();
        let mut stale = false;

        for subscription in &subscriptions {
            match &subscription.subscriber {
                Subscriber::Observer(observer) => match observer.upgrade() {
                    Some(observer) => observer.field_value_changed(self),
                    None => stale = true,
                },
                Subscriber::Binding(target) => match target.upgrade() {
                    Some(target) => {
                        trace!(key = ?self.key(), "propagating value to bound field");
                        Field::from_inner(target).store(self.value());
                    }
                    None => stale = true,
                },
                Subscriber::Action(action) => action(self),
            }
        }

        if stale {
            self.inner.subscriptions.lock().retain(Subscription::is_live);
        }
    }

    fn subscribe(&self, subscriber: Subscriber<T>) -> ObserverId {
        let subscription = Subscription::new(subscriber);
        let id = subscription.id;
        self.inner.subscriptions.lock().push(subscription);
        id
    }

    /// Register an observer object. The field holds it weakly.
    pub fn add_observer<O: FieldObserver + 'static>(&self, observer: &Arc<O>) -> ObserverId {
        let observer: Arc<dyn FieldObserver> = observer.clone();
        self.subscribe(Subscriber::Observer(Arc::downgrade(&observer)))
    }

    /// Register a callback for every change. The callback is held strongly
    /// and cannot be removed.
    pub fn observe<F>(&self, action: F)
    where
        F: Fn(&Field<T>) + Send + Sync + 'static,
    {
        self.subscribe(Subscriber::Action(Arc::new(action)));
    }

    /// Remove a subscription. When it was a binding, the bound field forgets
    /// that it was following this one.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let removed = {
            let mut subscriptions = self.inner.subscriptions.lock();
            let position = subscriptions.iter().position(|s| s.id == id);
            position.map(|index| subscriptions.remove(index))
        };

        match removed {
            Some(Subscription {
                subscriber: Subscriber::Binding(target),
                ..
            }) => {
                if let Some(target) = target.upgrade() {
                    let mut following = target.following.lock();
                    if following.as_ref().is_some_and(|(_, token)| *token == id) {
                        *following = None;
                    }
                }
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }

    /// Follow `source`: this field takes its current value (if set) and
    /// every later change.
    pub fn bind_one_way(&self, source: &Field<T>) {
        if Arc::ptr_eq(&self.inner, &source.inner) {
            return;
        }
        self.unbind();
        let token = source.subscribe(Subscriber::Binding(Arc::downgrade(&self.inner)));
        *self.inner.following.lock() = Some((Arc::downgrade(&source.inner), token));

        if source.is_set() {
            self.store(source.value());
        }
    }

    /// Keep both fields in step. `other` first takes this field's value.
    pub fn bind_two_way(&self, other: &Field<T>) {
        other.bind_one_way(self);
        self.bind_one_way(other);
    }

    /// Stop following the field this one is bound to
    pub fn unbind(&self) {
        let following = self.inner.following.lock().take();
        if let Some((source, token)) = following {
            if let Some(source) = source.upgrade() {
                Field::from_inner(source).remove_observer(token);
            }
        }
    }

    pub fn is_bound(&self) -> bool {
        self.inner.following.lock().is_some()
    }

    /// Run the field's rules, appending failures to any errors already
    /// recorded
    pub fn validate(&self) -> ValidationState {
        self.validate_with(Vec::new())
    }

    pub(crate) fn validate_with(&self, mut failures: Vec<String>) -> ValidationState {
        let label = self.label();
        let value = self.value();
        let (allowed, rules, transformer) = {
            let meta = self.inner.meta.read();
            (
                meta.allowed_values.clone(),
                meta.rules.clone(),
                meta.transformer.clone(),
            )
        };

        if let Some(value) = &value {
            if !allowed.is_empty() && !allowed.contains(value) {
                failures.push(format!("{} is not an allowed value", label));
            }
        }

        if !rules.is_empty() {
            let exported = value.as_ref().map_or(Value::Null, |value| {
                transformer.export_value(value, &mut ExportContext::default())
            });
            for rule in &rules {
                if let Err(errors) = rule.validate(&exported, &label) {
                    failures.extend(errors.messages());
                }
            }
        }

        self.inner.validation.lock().record(failures)
    }

    pub fn validation_state(&self) -> ValidationState {
        self.inner.validation.lock().state()
    }

    pub fn add_validation_error(&self, message: impl Into<String>) {
        self.inner.validation.lock().add_error(message.into());
    }

    pub fn reset_validation_state(&self) {
        self.inner.validation.lock().reset();
    }

    /// Decode a raw value with this field's transformer without assigning it
    pub fn import(&self, raw: &Value, ctx: &ImportContext<'_>) -> Option<T> {
        if raw.is_null() {
            return None;
        }
        self.transformer().import_value(raw, ctx)
    }

    /// Encode the current value with this field's transformer
    pub fn export(&self, ctx: &mut ExportContext) -> Value {
        match self.value() {
            Some(value) => self.transformer().export_value(&value, ctx),
            None => Value::Null,
        }
    }
}

impl<T: FieldValue + fmt::Debug> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.inner.slot.lock();
        f.debug_struct("Field")
            .field("key", &self.inner.meta.read().key)
            .field("value", &slot.value)
            .field("state", &slot.state)
            .finish()
    }
}

impl<T: FieldValue> AnyField for Field<T> {
    fn field_id(&self) -> FieldId {
        self.id()
    }

    fn key(&self) -> Option<String> {
        Field::key(self)
    }

    fn assign_default_key(&self, key: &str) {
        let mut meta = self.inner.meta.write();
        if meta.key.is_none() {
            meta.key = Some(key.to_string());
        }
    }

    fn name(&self) -> Option<String> {
        Field::name(self)
    }

    fn set_name(&self, name: &str) {
        self.inner.meta.write().name = Some(name.to_string());
    }

    fn state(&self) -> FieldState {
        Field::state(self)
    }

    fn has_value(&self) -> bool {
        self.inner.slot.lock().value.is_some()
    }

    fn reset(&self) {
        Field::reset(self)
    }

    fn export_value(&self, ctx: &mut ExportContext) -> Value {
        self.export(ctx)
    }

    fn import_value(&self, raw: &Value, ctx: &ImportContext<'_>) {
        let value = self.import(raw, ctx);
        self.set(value);
    }

    fn import_identifier(&self, identifier: &str, ctx: &ImportContext<'_>) {
        let value = self
            .import(&Value::String(identifier.to_string()), ctx)
            .or_else(|| {
                let number = identifier.parse::<i64>().ok()?;
                self.import(&Value::from(number), ctx)
            });
        self.set(value);
    }

    fn validate(&self) -> ValidationState {
        Field::validate(self)
    }

    fn validation_state(&self) -> ValidationState {
        Field::validation_state(self)
    }

    fn add_validation_error(&self, message: &str) {
        Field::add_validation_error(self, message)
    }

    fn reset_validation_state(&self) {
        Field::reset_validation_state(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldkit_validation::LengthValidator;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter<T: FieldValue>(field: &Field<T>) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        field.observe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    struct Recorder {
        keys: Mutex<Vec<Option<String>>>,
    }

    impl FieldObserver for Recorder {
        fn field_value_changed(&self, field: &dyn AnyField) {
            self.keys.lock().push(field.key());
        }
    }

    #[test]
    fn test_set_marks_state_and_notifies_on_change() {
        let field = Field::<String>::new();
        let count = counter(&field);
        assert_eq!(field.state(), FieldState::Unset);

        field.set("Alice".to_string());
        assert_eq!(field.value(), Some("Alice".to_string()));
        assert!(field.is_set());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        field.set("Alice".to_string());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        field.set("Bob".to_string());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_set_none_keeps_set_and_reset_clears() {
        let field = Field::<i64>::new().with_value(3);
        assert!(field.is_set());

        field.set(None);
        assert!(field.is_set());
        assert_eq!(field.value(), None);

        field.set(4);
        field.reset();
        assert_eq!(field.state(), FieldState::Unset);
        assert_eq!(field.value(), None);
    }

    #[test]
    fn test_observers_run_in_registration_order() {
        let field = Field::<i64>::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            field.observe(move |_| order.lock().push(tag));
        }
        field.set(1);
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_observer_objects_are_weak_and_removable() {
        let field = Field::<i64>::new().with_key("count");
        let recorder = Arc::new(Recorder {
            keys: Mutex::new(Vec::new()),
        });

        let id = field.add_observer(&recorder);
        field.set(1);
        assert_eq!(*recorder.keys.lock(), vec![Some("count".to_string())]);

        assert!(field.remove_observer(id));
        assert!(!field.remove_observer(id));
        field.set(2);
        assert_eq!(recorder.keys.lock().len(), 1);

        field.add_observer(&recorder);
        drop(recorder);
        field.set(3);
        assert_eq!(field.observer_count(), 0);
    }

    #[test]
    fn test_observer_can_read_the_field() {
        let field = Field::<i64>::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        field.observe(move |f| *sink.lock() = f.value());
        field.set(9);
        assert_eq!(*seen.lock(), Some(9));
    }

    #[test]
    fn test_one_way_binding() {
        let source = Field::<String>::new().with_value("a".to_string());
        let follower = Field::<String>::new();

        follower.bind_one_way(&source);
        assert_eq!(follower.value(), Some("a".to_string()));
        assert!(follower.is_bound());

        source.set("b".to_string());
        assert_eq!(follower.value(), Some("b".to_string()));

        // one-way: the source does not follow
        follower.set("c".to_string());
        assert_eq!(source.value(), Some("b".to_string()));
    }

    #[test]
    fn test_two_way_binding_terminates() {
        let a = Field::<i64>::new().with_value(1);
        let b = Field::<i64>::new();
        let a_count = counter(&a);
        let b_count = counter(&b);

        a.bind_two_way(&b);
        assert_eq!(b.value(), Some(1));

        a.set(2);
        assert_eq!(b.value(), Some(2));
        assert_eq!(a_count.load(Ordering::SeqCst), 1);
        assert_eq!(b_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_bare_set_snaps_binding() {
        let a = Field::<i64>::new();
        let b = Field::<i64>::new();
        a.bind_two_way(&b);

        // b stops following a; a keeps following b
        b.set(5);
        assert!(!b.is_bound());
        assert!(a.is_bound());
        assert_eq!(a.value(), Some(5));

        b.set(7);
        assert_eq!(a.value(), Some(7));

        a.set(6);
        assert!(!a.is_bound());
        assert_eq!(b.value(), Some(7));
    }

    #[test]
    fn test_remove_binding_clears_back_reference() {
        let source = Field::<i64>::new();
        let follower = Field::<i64>::new();
        follower.bind_one_way(&source);
        assert_eq!(source.observer_count(), 1);

        follower.unbind();
        assert_eq!(source.observer_count(), 0);
        assert!(!follower.is_bound());

        source.set(1);
        assert_eq!(follower.value(), None);
    }

    #[test]
    fn test_validation_rules() {
        let field = Field::<String>::new()
            .with_name("Name")
            .require_not_nil()
            .rule(LengthValidator::new().min(3));

        assert_eq!(field.validation_state(), ValidationState::Unknown);
        assert_eq!(
            field.validate(),
            ValidationState::Invalid(vec!["Field is required".into()])
        );

        field.reset_validation_state();
        field.set("Al".to_string());
        assert_eq!(
            field.validate(),
            ValidationState::Invalid(vec!["Name must be at least 3 long".into()])
        );

        field.reset_validation_state();
        field.set("Alice".to_string());
        assert_eq!(field.validate(), ValidationState::Valid);

        field.add_validation_error("Name is taken");
        assert!(field.validation_state().is_invalid());
    }

    #[test]
    fn test_allowed_values() {
        let field = Field::<String>::new()
            .with_key("status")
            .allowed_values(["open".to_string(), "closed".to_string()]);
        field.set("open".to_string());
        assert!(field.validate().is_valid());

        field.reset_validation_state();
        field.set("lost".to_string());
        assert_eq!(
            field.validate(),
            ValidationState::Invalid(vec!["status is not an allowed value".into()])
        );
    }

    #[test]
    fn test_import_and_export() {
        let options = crate::config::DecodeOptions::default().without_registry();
        let ctx = ImportContext::new(&options);
        let field = Field::<i64>::new();

        field.import_value(&Value::from(12), &ctx);
        assert_eq!(field.value(), Some(12));
        assert_eq!(field.export(&mut ExportContext::default()), Value::from(12));

        // lenient: the wrong type degrades to no value
        field.import_value(&Value::from("twelve"), &ctx);
        assert_eq!(field.value(), None);
        assert!(field.is_set());

        field.import_identifier("77", &ctx);
        assert_eq!(field.value(), Some(77));
    }

    #[test]
    fn test_default_key_does_not_override() {
        let explicit = Field::<String>::new().with_key("ownerID");
        explicit.assign_default_key("owner");
        assert_eq!(explicit.key(), Some("ownerID".into()));

        let implicit = Field::<String>::new();
        implicit.assign_default_key("owner");
        assert_eq!(implicit.key(), Some("owner".into()));
    }
}
