//! Validation state carried by each field

/// Outcome of validating a field or a model
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationState {
    /// Not validated since the last reset
    #[default]
    Unknown,
    Valid,
    Invalid(Vec<String>),
}

impl ValidationState {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationState::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ValidationState::Invalid(_))
    }

    pub fn messages(&self) -> &[String] {
        match self {
            ValidationState::Invalid(messages) => messages,
            _ => &[],
        }
    }

    pub(crate) fn from_messages(messages: Vec<String>) -> Self {
        if messages.is_empty() {
            ValidationState::Valid
        } else {
            ValidationState::Invalid(messages)
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct FieldValidation {
    checked: bool,
    errors: Vec<String>,
}

impl FieldValidation {
    pub fn state(&self) -> ValidationState {
        if !self.errors.is_empty() {
            ValidationState::Invalid(self.errors.clone())
        } else if self.checked {
            ValidationState::Valid
        } else {
            ValidationState::Unknown
        }
    }

    pub fn add_error(&mut self, message: String) {
        self.errors.push(message);
    }

    /// Append the failures of a validation run
    pub fn record(&mut self, failures: Vec<String>) -> ValidationState {
        self.checked = true;
        self.errors.extend(failures);
        self.state()
    }

    pub fn reset(&mut self) {
        self.checked = false;
        self.errors.clear();
    }
}
