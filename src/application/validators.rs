use validator::ValidateEmail;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const PLAN_NAME_MAX_LEN: usize = 100;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Validates a username.
/// Rules:
/// - 3-50 characters
/// - Only ASCII letters, numbers, hyphens, underscores, dots
/// - Must start with a letter or number
pub fn is_valid_username(username: &str) -> bool {
    if username.len() < USERNAME_MIN_LEN || username.len() > USERNAME_MAX_LEN {
        return false;
    }

    let first = username.chars().next().unwrap();
    if !first.is_ascii_alphanumeric() {
        return false;
    }

    username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Passwords are only length-checked; the upper bound keeps hashing input
/// bounded.
pub fn is_valid_password(password: &str) -> bool {
    (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&password.len())
}

/// Plan names are free text, 1-100 characters, no leading/trailing
/// whitespace.
pub fn is_valid_plan_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= PLAN_NAME_MAX_LEN && name.trim() == name
}
