//! Form validation for signup, login and profile editing
//!
//! Forms arrive as `application/x-www-form-urlencoded` bodies and are bound
//! from a flat key/value map. A successful bind yields a cleaned struct; a
//! failed bind yields [`FormErrors`], an ordered field → messages map whose
//! text rendering is what the AJAX envelope carries back to the browser.

mod fields;
pub mod login;
pub mod profile;
pub mod signup;

use std::collections::HashMap;
use std::fmt;

pub use login::{LoginForm, INVALID_LOGIN};
pub use profile::ProfileForm;
pub use signup::SignupForm;

/// Raw submitted form data
pub type FormData = HashMap<String, String>;

/// Key under which errors not tied to a single field are reported
pub const NON_FIELD_ERRORS: &str = "__all__";

/// A form that can be bound and cleaned from submitted data
pub trait Form: Sized {
    fn clean(data: &FormData) -> Result<Self, FormErrors>;
}

/// Validation errors, in the order fields were checked
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    entries: Vec<(String, Vec<String>)>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        let field = field.into();
        let message = message.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.entries.push((field, vec![message])),
        }
    }

    pub fn add_non_field<M: Into<String>>(&mut self, message: M) {
        self.add(NON_FIELD_ERRORS, message);
    }

    /// Build an error set holding a single non-field message
    pub fn non_field<M: Into<String>>(message: M) -> Self {
        let mut errors = Self::new();
        errors.add_non_field(message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Render as `* field` followed by one `  * message` line per error
    pub fn as_text(&self) -> String {
        self.entries
            .iter()
            .map(|(field, messages)| {
                let lines: Vec<String> = messages.iter().map(|m| format!("  * {m}")).collect();
                format!("* {field}\n{}", lines.join("\n"))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `Ok(value)` when no errors were recorded
    pub(crate) fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Concatenate the error text of several forms, skipping those without errors
pub fn concat_errors<'a, I>(forms: I) -> String
where
    I: IntoIterator<Item = &'a FormErrors>,
{
    forms
        .into_iter()
        .filter(|errors| !errors.is_empty())
        .map(FormErrors::as_text)
        .collect()
}
