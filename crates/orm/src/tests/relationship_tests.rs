//! Inverse maintenance between relationship fields

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use super::*;
use crate::config::DecodeOptions;
use crate::field::FieldState;
use crate::registry::IdentityRegistry;

fn options() -> DecodeOptions {
    DecodeOptions::new().with_registry(Arc::new(IdentityRegistry::new()))
}

fn same<M>(a: &Option<Arc<M>>, b: &Arc<M>) -> bool {
    a.as_ref().is_some_and(|a| Arc::ptr_eq(a, b))
}

#[test]
fn test_one_to_one_inverse() {
    let person1 = Person::create();
    let profile_a = Profile::create();

    person1.profile.set(profile_a.clone());
    assert!(same(&profile_a.person.value(), &person1));

    let profile_b = Profile::create();
    profile_b.person.set(person1.clone());
    assert!(same(&person1.profile.value(), &profile_b));
    assert!(profile_a.person.value().is_none());
}

#[test]
fn test_one_to_many_inverse() {
    let person = Person::create();
    let company1 = Company::create();
    let company2 = Company::create();

    person.company.set(company1.clone());
    assert_eq!(company1.employees.len(), 1);
    assert!(company1.employees.contains(&person));

    // assigning the same value again changes nothing
    person.company.set(company1.clone());
    assert_eq!(company1.employees.len(), 1);

    assert!(company1.employees.remove(&person));
    assert!(company1.employees.is_empty());
    assert!(person.company.value().is_none());
    assert!(!company1.employees.remove(&person));

    company2.employees.set([person.clone()]);
    assert!(same(&person.company.value(), &company2));

    // moving the person to another company updates both sides
    person.company.set(company1.clone());
    assert!(company2.employees.is_empty());
    assert!(company1.employees.contains(&person));

    company1.employees.set(Vec::<Arc<Person>>::new());
    assert!(person.company.value().is_none());
}

#[test]
fn test_array_assignment_moves_between_owners() {
    let person = Person::create();
    let company1 = Company::create();
    let company2 = Company::create();

    company1.employees.push(person.clone());
    assert!(same(&person.company.value(), &company1));

    company2.employees.set([person.clone()]);
    assert!(same(&person.company.value(), &company2));
    assert!(company1.employees.is_empty());
}

#[test]
fn test_array_deduplicates() {
    let company = Company::create();
    let alice = Person::create();
    let bob = Person::create();

    company.employees.set([alice.clone(), bob.clone(), alice.clone()]);
    assert_eq!(company.employees.len(), 2);

    company.employees.push(bob.clone());
    assert_eq!(company.employees.len(), 2);

    let names: Vec<bool> = company
        .employees
        .value()
        .iter()
        .map(|p| Arc::ptr_eq(p, &alice))
        .collect();
    assert_eq!(names, vec![true, false]);

    company.employees.clear();
    assert!(alice.company.value().is_none());
    assert!(bob.company.value().is_none());
    assert!(company.employees.is_set());
}

#[test]
fn test_inverse_notifies_once() {
    let person = Person::create();
    let company = Company::create();

    let notified = Arc::new(AtomicUsize::new(0));
    let count = notified.clone();
    company.employees.observe(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });

    person.company.set(company.clone());
    assert_eq!(notified.load(Ordering::SeqCst), 1);

    person.company.set(company.clone());
    assert_eq!(notified.load(Ordering::SeqCst), 1);

    person.company.set(None);
    assert_eq!(notified.load(Ordering::SeqCst), 2);
    assert!(company.employees.is_empty());
}

#[test]
fn test_reset_detaches_inverse() {
    let person = Person::create();
    let company = Company::create();
    person.company.set(company.clone());

    person.company.reset();
    assert_eq!(person.company.state(), FieldState::Unset);
    assert!(company.employees.is_empty());
}

#[test]
fn test_decoding_wires_inverses() {
    let options = options();
    let company = Company::from_attributes_with(
        &json!({ "id": "c1", "employees": [{ "id": "p1", "name": "Ann" }] })
            .as_object()
            .cloned()
            .unwrap(),
        &options,
        None,
    );

    let employees = company.employees.value();
    assert_eq!(employees.len(), 1);
    assert!(same(&employees[0].company.value(), &company));

    assert_eq!(
        Value::Object(company.attributes()),
        json!({
            "id": "c1",
            "employees": [{ "id": "p1", "name": "Ann", "company": { "id": "c1" } }]
        })
    );
}

#[test]
fn test_nested_decode_joins_existing_collection() {
    let options = options();
    let first = Person::from_attributes_with(
        json!({ "id": "p1", "company": { "id": "c1", "name": "Acme" } })
            .as_object()
            .unwrap(),
        &options,
        None,
    );
    let second = Person::from_attributes_with(
        json!({ "id": "p2", "company": { "id": "c1" } }).as_object().unwrap(),
        &options,
        None,
    );

    let company = first.company.value().unwrap();
    assert!(same(&second.company.value(), &company));
    assert_eq!(company.employees.len(), 2);
    assert_eq!(company.name.value(), Some("Acme".to_string()));
}

#[test]
fn test_foreign_key_array() {
    let options = options();
    let club = Club::from_attributes_with(
        json!({ "name": "Chess", "members": ["p1", "p2", "p1"] }).as_object().unwrap(),
        &options,
        None,
    );
    assert_eq!(club.members.len(), 2);
    assert_eq!(club.shells(false).len(), 2);
    assert_eq!(
        Value::Object(club.attributes()),
        json!({ "name": "Chess", "members": ["p1", "p2"] })
    );

    let full = Person::create();
    full.id.set("p2".to_string());
    let replacement: Arc<dyn Model> = full.clone();
    club.fill_shells(false, &|shell: &Arc<dyn Model>| {
        (shell.identifier().as_deref() == Some("p2")).then(|| replacement.clone())
    });

    let members = club.members.value();
    assert!(members[0].is_shell());
    assert!(Arc::ptr_eq(&members[1], &full));
    assert_eq!(club.shells(false).len(), 1);
}

#[test]
fn test_relationship_without_owner_skips_inverse() {
    // built with `new`, so the field registry never saw an owner
    let person = Arc::new(Person::new());
    let company = Company::create();
    person.company.set(company.clone());
    assert!(company.employees.is_empty());
    assert!(same(&person.company.value(), &company));
}

struct ChangeCounter(AtomicUsize);

impl crate::field::FieldObserver for ChangeCounter {
    fn field_value_changed(&self, _field: &dyn crate::field::AnyField) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_relationship_observers_see_inverse_changes() {
    let person = Person::create();
    let profile = Profile::create();
    let counter = Arc::new(ChangeCounter(AtomicUsize::new(0)));

    let id = person.profile.add_observer(&counter);
    profile.person.set(person.clone());
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);

    assert!(person.profile.remove_observer(id));
    profile.person.set(None);
    assert!(person.profile.value().is_none());
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}
