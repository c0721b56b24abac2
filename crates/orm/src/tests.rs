//! Shared test models and crate-level graph scenarios
//!
//! The fixtures cover every relationship shape the engine supports:
//! one-to-one inverses (`Person`/`Profile`), one-to-many inverses
//! (`Company`/`Person`), foreign keys (`Department`), self references
//! (`Node`), nested validation (`Object`) and polymorphic decoding
//! (`Letter`).

use crate::field::{AnyField, Field};
use crate::model::{FieldList, Model, ModelCore};
use crate::relationships::{ModelArrayField, ModelField};

mod relationship_tests;

#[derive(Debug)]
pub(crate) struct Person {
    core: ModelCore,
    pub id: Field<String>,
    pub name: Field<String>,
    pub company: ModelField<Company>,
    pub profile: ModelField<Profile>,
}

impl Model for Person {
    fn new() -> Self {
        Self {
            core: ModelCore::new(),
            id: Field::new(),
            name: Field::new(),
            company: ModelField::new().inverse(|company: &Company| &company.employees),
            profile: ModelField::new().inverse(|profile: &Profile| &profile.person),
        }
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn declare_fields<'a>(&'a self, fields: &mut FieldList<'a>) {
        fields
            .add("id", &self.id)
            .add("name", &self.name)
            .add("company", &self.company)
            .add("profile", &self.profile);
    }

    fn identifier_field(&self) -> Option<&dyn AnyField> {
        Some(&self.id)
    }

    fn collection_path(&self) -> Option<String> {
        Some("people".into())
    }
}

#[derive(Debug)]
pub(crate) struct Profile {
    core: ModelCore,
    pub id: Field<String>,
    pub person: ModelField<Person>,
}

impl Model for Profile {
    fn new() -> Self {
        Self {
            core: ModelCore::new(),
            id: Field::new(),
            person: ModelField::new().inverse(|person: &Person| &person.profile),
        }
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn declare_fields<'a>(&'a self, fields: &mut FieldList<'a>) {
        fields.add("id", &self.id).add("person", &self.person);
    }

    fn identifier_field(&self) -> Option<&dyn AnyField> {
        Some(&self.id)
    }
}

#[derive(Debug)]
pub(crate) struct Company {
    core: ModelCore,
    pub id: Field<String>,
    pub name: Field<String>,
    pub size: Field<i64>,
    pub employees: ModelArrayField<Person>,
    pub parent_company: ModelField<Company>,
}

impl Model for Company {
    fn new() -> Self {
        Self {
            core: ModelCore::new(),
            id: Field::new(),
            name: Field::new(),
            size: Field::new(),
            employees: ModelArrayField::new().inverse(|person: &Person| &person.company),
            parent_company: ModelField::new().with_key("parentCompany"),
        }
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn declare_fields<'a>(&'a self, fields: &mut FieldList<'a>) {
        fields
            .add("id", &self.id)
            .add("name", &self.name)
            .add("size", &self.size)
            .add("employees", &self.employees)
            .add("parent_company", &self.parent_company);
    }

    fn identifier_field(&self) -> Option<&dyn AnyField> {
        Some(&self.id)
    }

    fn collection_path(&self) -> Option<String> {
        Some("companies/".into())
    }
}

#[derive(Debug)]
pub(crate) struct Department {
    core: ModelCore,
    pub id: Field<String>,
    pub name: Field<String>,
    pub parent: ModelField<Company>,
}

impl Model for Department {
    fn new() -> Self {
        Self {
            core: ModelCore::new(),
            id: Field::new(),
            name: Field::new(),
            parent: ModelField::new().foreign_key(),
        }
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn declare_fields<'a>(&'a self, fields: &mut FieldList<'a>) {
        fields
            .add("id", &self.id)
            .add("name", &self.name)
            .add("parent", &self.parent);
    }

    fn identifier_field(&self) -> Option<&dyn AnyField> {
        Some(&self.id)
    }
}

/// A club has members but no identifier of its own
#[derive(Debug)]
pub(crate) struct Club {
    core: ModelCore,
    pub name: Field<String>,
    pub members: ModelArrayField<Person>,
}

impl Model for Club {
    fn new() -> Self {
        Self {
            core: ModelCore::new(),
            name: Field::new(),
            members: ModelArrayField::new().foreign_key(),
        }
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn declare_fields<'a>(&'a self, fields: &mut FieldList<'a>) {
        fields.add("name", &self.name).add("members", &self.members);
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    core: ModelCore,
    pub id: Field<String>,
    pub name: Field<String>,
    pub left: ModelField<Node>,
    pub right: ModelField<Node>,
}

impl Model for Node {
    fn new() -> Self {
        Self {
            core: ModelCore::new(),
            id: Field::new(),
            name: Field::new(),
            left: ModelField::new(),
            right: ModelField::new(),
        }
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn declare_fields<'a>(&'a self, fields: &mut FieldList<'a>) {
        fields
            .add("id", &self.id)
            .add("name", &self.name)
            .add("left", &self.left)
            .add("right", &self.right);
    }

    fn identifier_field(&self) -> Option<&dyn AnyField> {
        Some(&self.id)
    }
}

#[derive(Debug)]
pub(crate) struct Object {
    core: ModelCore,
    pub id: Field<String>,
    pub name: Field<String>,
    pub component: ModelField<Component>,
    pub essential_component: ModelField<EssentialComponent>,
}

impl Model for Object {
    fn new() -> Self {
        Self {
            core: ModelCore::new(),
            id: Field::new(),
            name: Field::new().require_not_nil(),
            component: ModelField::new().cascade_delete(),
            essential_component: ModelField::new()
                .with_key("essentialComponent")
                .require_valid(),
        }
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn declare_fields<'a>(&'a self, fields: &mut FieldList<'a>) {
        fields
            .add("id", &self.id)
            .add("name", &self.name)
            .add("component", &self.component)
            .add("essential_component", &self.essential_component);
    }

    fn identifier_field(&self) -> Option<&dyn AnyField> {
        Some(&self.id)
    }
}

#[derive(Debug)]
pub(crate) struct Component {
    core: ModelCore,
    pub id: Field<String>,
    pub name: Field<String>,
    pub age: Field<String>,
}

impl Model for Component {
    fn new() -> Self {
        Self {
            core: ModelCore::new(),
            id: Field::new(),
            name: Field::new().require_not_nil(),
            age: Field::new().require_not_nil(),
        }
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn declare_fields<'a>(&'a self, fields: &mut FieldList<'a>) {
        fields
            .add("id", &self.id)
            .add("name", &self.name)
            .add("age", &self.age);
    }

    fn identifier_field(&self) -> Option<&dyn AnyField> {
        Some(&self.id)
    }
}

#[derive(Debug)]
pub(crate) struct EssentialComponent {
    core: ModelCore,
    pub number: Field<i64>,
}

impl Model for EssentialComponent {
    fn new() -> Self {
        Self {
            core: ModelCore::new(),
            number: Field::new().require_not_nil(),
        }
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn declare_fields<'a>(&'a self, fields: &mut FieldList<'a>) {
        fields.add("number", &self.number);
    }
}

/// Integer identifiers
#[derive(Debug)]
pub(crate) struct Numbered {
    core: ModelCore,
    pub id: Field<i64>,
    pub label: Field<String>,
}

impl Model for Numbered {
    fn new() -> Self {
        Self {
            core: ModelCore::new(),
            id: Field::new(),
            label: Field::new(),
        }
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn declare_fields<'a>(&'a self, fields: &mut FieldList<'a>) {
        fields.add("id", &self.id).add("label", &self.label);
    }

    fn identifier_field(&self) -> Option<&dyn AnyField> {
        Some(&self.id)
    }
}

macro_rules! letter_model {
    ($name:ident) => {
        #[derive(Debug)]
        pub(crate) struct $name {
            core: ModelCore,
            pub letter: Field<String>,
            pub text: Field<String>,
        }

        impl Model for $name {
            fn new() -> Self {
                Self {
                    core: ModelCore::new(),
                    letter: Field::new(),
                    text: Field::new(),
                }
            }

            fn core(&self) -> &ModelCore {
                &self.core
            }

            fn declare_fields<'a>(&'a self, fields: &mut FieldList<'a>) {
                fields.add("letter", &self.letter).add("text", &self.text);
            }
        }
    };
}

letter_model!(Letter);
letter_model!(A);
letter_model!(B);

/// Names its `name` field while the registry is built
#[derive(Debug)]
pub(crate) struct Initialized {
    core: ModelCore,
    pub name: Field<String>,
    pub nickname: Field<String>,
}

impl Model for Initialized {
    fn new() -> Self {
        Self {
            core: ModelCore::new(),
            name: Field::new(),
            nickname: Field::new().with_key("nick"),
        }
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn declare_fields<'a>(&'a self, fields: &mut FieldList<'a>) {
        fields.add("name", &self.name).add("nickname", &self.nickname);
    }

    fn initialize_field(&self, key: &str, field: &dyn AnyField) {
        if key == "name" {
            field.set_name("Test");
        }
    }
}
