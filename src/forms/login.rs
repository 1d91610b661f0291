use super::fields::FieldCleaner;
use super::{Form, FormData, FormErrors};

/// Reported when the credentials do not match a user
pub const INVALID_LOGIN: &str = "Please enter a correct email address and password. \
Note that both fields may be case-sensitive.";

/// Email and password sign-in form
#[derive(Debug, Clone, PartialEq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl Form for LoginForm {
    fn clean(data: &FormData) -> Result<Self, FormErrors> {
        let mut cleaner = FieldCleaner::new(data);
        let username = cleaner.email_field("username", 245);
        let password = cleaner.password_field("password");
        cleaner
            .errors
            .into_result(|| LoginForm { username, password })
    }
}

impl LoginForm {
    /// Error set for a failed credential check
    pub fn invalid_login() -> FormErrors {
        FormErrors::non_field(INVALID_LOGIN)
    }
}
