use super::fields::FieldCleaner;
use super::{Form, FormData, FormErrors};

pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_SIMILARITY: f64 = 0.7;
const MIN_PART_LENGTH: usize = 4;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "passw0rd", "12345678", "123456789",
    "1234567890", "qwerty123", "qwertyuiop", "iloveyou", "sunshine", "princess",
    "football", "baseball", "welcome1", "letmein1", "trustno1", "superman",
    "starwars", "whatever", "dragon123", "monkey123", "abc12345", "11111111",
    "00000000", "michelle", "jennifer", "computer", "internet", "changeme",
];

/// Account registration form with hidden reCAPTCHA token
#[derive(Debug, Clone, PartialEq)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    /// Email address used as the login name
    pub username: String,
    pub password: String,
    pub token: String,
}

impl Form for SignupForm {
    fn clean(data: &FormData) -> Result<Self, FormErrors> {
        let mut cleaner = FieldCleaner::new(data);

        let first_name = cleaner.char_field("first_name", Some(30));
        let last_name = cleaner.char_field("last_name", Some(30));
        let username = cleaner.email_field("username", 245);
        let password1 = cleaner.password_field("password1");
        let password2 = cleaner.password_field("password2");

        if !password1.is_empty() && !password2.is_empty() && password1 != password2 {
            cleaner.errors.add("password2", PASSWORD_MISMATCH);
        }

        let token = cleaner.char_field("token", None);

        let mut errors = cleaner.errors;
        if errors.get("password2").is_none() && !password2.is_empty() {
            let attributes = [
                ("username", username.as_str()),
                ("first name", first_name.as_str()),
                ("last name", last_name.as_str()),
            ];
            for message in password_problems(&password2, &attributes) {
                errors.add("password2", message);
            }
        }

        errors.into_result(|| SignupForm {
            first_name,
            last_name,
            username,
            password: password1,
            token,
        })
    }
}

/// Strength checks applied to a new password
pub fn password_problems(password: &str, attributes: &[(&str, &str)]) -> Vec<String> {
    let mut problems = Vec::new();
    let lowered = password.to_lowercase();

    if let Some((name, _)) = attributes
        .iter()
        .find(|(_, value)| too_similar(&lowered, value))
    {
        problems.push(format!("The password is too similar to the {name}."));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if COMMON_PASSWORDS.contains(&lowered.trim()) {
        problems.push("This password is too common.".to_string());
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    problems
}

/// Whole values and their alphanumeric parts are compared by normalized edit
/// distance; parts shorter than [`MIN_PART_LENGTH`] (`com`, `org`) are ignored.
fn too_similar(lowered_password: &str, attribute: &str) -> bool {
    let attribute = attribute.to_lowercase();
    std::iter::once(attribute.as_str())
        .chain(attribute.split(|c: char| !c.is_alphanumeric()))
        .filter(|part| part.chars().count() >= MIN_PART_LENGTH)
        .any(|part| strsim::normalized_levenshtein(lowered_password, part) >= MAX_SIMILARITY)
}
