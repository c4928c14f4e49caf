//! Validation state of the account forms
//!
//! Each field tracks `{valid, focused}` plus an error message. Validity is
//! recomputed on every change; error messages only appear on submit and are
//! cleared when the field is edited again.

use std::collections::HashMap;

use common::validation::{is_email_address_valid, is_name_valid, is_password_valid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    EmailAddress,
    Password,
    ConfirmPassword,
}

impl Field {
    fn label(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::EmailAddress => "Email address",
            Field::Password => "Password",
            Field::ConfirmPassword => "Confirm password",
        }
    }
}

/// Which form is being filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Signup,
    Login,
    ResetPassword,
    /// Every field is optional; only what is filled in is checked
    ProfileEdit,
}

impl FormKind {
    pub fn fields(&self) -> &'static [Field] {
        match self {
            FormKind::Signup | FormKind::ProfileEdit => &[
                Field::Name,
                Field::EmailAddress,
                Field::Password,
                Field::ConfirmPassword,
            ],
            FormKind::Login => &[Field::EmailAddress, Field::Password],
            FormKind::ResetPassword => &[
                Field::EmailAddress,
                Field::Password,
                Field::ConfirmPassword,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldStatus {
    pub valid: bool,
    pub focused: bool,
}

impl Default for FieldStatus {
    fn default() -> Self {
        Self {
            valid: true,
            focused: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormState {
    kind: FormKind,
    values: HashMap<Field, String>,
    status: HashMap<Field, FieldStatus>,
    errors: HashMap<Field, String>,
    form_error: Option<String>,
}

impl FormState {
    pub fn new(kind: FormKind) -> Self {
        Self {
            kind,
            values: HashMap::new(),
            status: HashMap::new(),
            errors: HashMap::new(),
            form_error: None,
        }
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    pub fn value(&self, field: Field) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or_default()
    }

    pub fn status(&self, field: Field) -> FieldStatus {
        self.status.get(&field).copied().unwrap_or_default()
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// Error reported by the server for the form as a whole
    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn set_form_error(&mut self, message: impl Into<String>) {
        self.form_error = Some(message.into());
    }

    /// Update a field, recompute validity and clear stale errors
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field, value.into());
        self.errors.remove(&field);
        self.form_error = None;

        self.refresh_validity(field);
        // the confirmation depends on the password
        if field == Field::Password && self.kind.fields().contains(&Field::ConfirmPassword) {
            self.refresh_validity(Field::ConfirmPassword);
        }
    }

    pub fn focus(&mut self, field: Field, focused: bool) {
        self.status.entry(field).or_default().focused = focused;
    }

    pub fn is_submit_disabled(&self) -> bool {
        self.kind.fields().iter().any(|field| !self.status(*field).valid)
    }

    /// Check every field, recording messages for the ones that fail
    pub fn submit(&mut self) -> bool {
        let mut ok = true;
        for field in self.kind.fields() {
            if let Some(message) = self.check(*field) {
                self.errors.insert(*field, message);
                self.status.entry(*field).or_default().valid = false;
                ok = false;
            }
        }
        ok
    }

    fn refresh_validity(&mut self, field: Field) {
        let valid = self.is_valid(field);
        self.status.entry(field).or_default().valid = valid;
    }

    fn is_valid(&self, field: Field) -> bool {
        let value = self.value(field);
        if value.is_empty() && self.kind == FormKind::ProfileEdit {
            return field != Field::ConfirmPassword || self.value(Field::Password).is_empty();
        }
        match field {
            Field::Name => is_name_valid(value),
            Field::EmailAddress => is_email_address_valid(value),
            Field::Password if self.kind == FormKind::Login => !value.is_empty(),
            Field::Password => is_password_valid(value),
            Field::ConfirmPassword => {
                is_password_valid(value) && value == self.value(Field::Password)
            }
        }
    }

    fn check(&self, field: Field) -> Option<String> {
        let value = self.value(field);
        let optional = self.kind == FormKind::ProfileEdit
            && (field != Field::ConfirmPassword || self.value(Field::Password).is_empty());
        if value.is_empty() && !optional {
            return Some(format!("{} cannot be empty.", field.label()));
        }
        if self.is_valid(field) {
            return None;
        }
        let message = match field {
            Field::ConfirmPassword => "Passwords do not match.".to_string(),
            other => format!("Invalid {}.", other.label().to_lowercase()),
        };
        Some(message)
    }
}
