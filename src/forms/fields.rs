use super::{FormData, FormErrors};
use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) const REQUIRED: &str = "This field is required.";
pub(crate) const INVALID_EMAIL: &str = "Enter a valid email address.";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$")
        .expect("email pattern is valid")
});

/// Cleans individual fields, accumulating errors as it goes
pub(crate) struct FieldCleaner<'a> {
    data: &'a FormData,
    pub errors: FormErrors,
}

impl<'a> FieldCleaner<'a> {
    pub fn new(data: &'a FormData) -> Self {
        Self {
            data,
            errors: FormErrors::new(),
        }
    }

    /// Required text field, whitespace-stripped, at most `max_len` characters
    pub fn char_field(&mut self, name: &str, max_len: Option<usize>) -> String {
        let value = self.required(name, true);
        if let (Some(max), Some(v)) = (max_len, value.as_deref()) {
            self.check_max_len(name, v, max);
        }
        value.unwrap_or_default()
    }

    /// Required email field
    pub fn email_field(&mut self, name: &str, max_len: usize) -> String {
        let Some(value) = self.required(name, true) else {
            return String::new();
        };
        if !is_valid_email(&value) {
            self.errors.add(name, INVALID_EMAIL);
        }
        self.check_max_len(name, &value, max_len);
        value
    }

    /// Required password field; surrounding whitespace is significant
    pub fn password_field(&mut self, name: &str) -> String {
        self.required(name, false).unwrap_or_default()
    }

    fn required(&mut self, name: &str, strip: bool) -> Option<String> {
        let raw = self.data.get(name).map(String::as_str).unwrap_or("");
        let value = if strip { raw.trim() } else { raw };
        if value.is_empty() {
            self.errors.add(name, REQUIRED);
            None
        } else {
            Some(value.to_string())
        }
    }

    fn check_max_len(&mut self, name: &str, value: &str, max: usize) {
        let len = value.chars().count();
        if len > max {
            self.errors.add(
                name,
                format!("Ensure this value has at most {max} characters (it has {len})."),
            );
        }
    }
}

pub(crate) fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}
