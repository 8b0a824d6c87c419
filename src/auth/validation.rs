//! Sign-up and password rules enforced before any call to the identity provider.

use crate::errors::AppError;
use crate::models::UserRole;

/// Characters accepted as "special" in a password.
pub const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

pub const MIN_PASSWORD_LEN: usize = 12;

/// Email suffixes allowed for every role except students.
pub const INSTITUTIONAL_SUFFIXES: [&str; 2] = ["@kenya.go.ke", "@school.ac.ke"];

const PASSWORD_RULE: &str = "Password must be at least 12 characters long and contain at least one number and one special character.";

const EMAIL_RULE: &str =
    "For this role, email must be a valid @kenya.go.ke or @school.ac.ke address.";

fn is_special(c: char) -> bool {
    PASSWORD_SPECIALS.contains(c)
}

/// At least 12 characters, only letters, digits and specials, with at least
/// one digit and one special.
pub fn validate_password(password: &str) -> Result<(), AppError> {
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || is_special(c));
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(is_special);

    if allowed && has_digit && has_special && password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(AppError::Validation(PASSWORD_RULE.to_string()))
    }
}

/// Staff roles must sign up with an institutional address.
pub fn validate_email_for_role(email: &str, role: UserRole) -> Result<(), AppError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email address is required.".to_string()));
    }
    if role == UserRole::Student {
        return Ok(());
    }
    if INSTITUTIONAL_SUFFIXES.iter().any(|suffix| email.ends_with(suffix)) {
        Ok(())
    } else {
        Err(AppError::Validation(EMAIL_RULE.to_string()))
    }
}

/// Full sign-up check; the password rule is applied first.
pub fn validate_sign_up(email: &str, password: &str, role: UserRole) -> Result<(), AppError> {
    validate_password(password)?;
    validate_email_for_role(email, role)
}

/// Key/value pairs of a URL fragment such as `#access_token=..&type=recovery`.
pub fn fragment_params(fragment: &str) -> impl Iterator<Item = (&str, &str)> {
    fragment
        .trim_start_matches('#')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
}

/// True when a redirect fragment belongs to the password-recovery flow.
pub fn is_recovery_fragment(fragment: &str) -> bool {
    fragment.contains("type=recovery") && fragment.contains("access_token")
}

/// The access token carried by a recovery fragment, if it is one.
pub fn recovery_token(fragment: &str) -> Option<&str> {
    if !is_recovery_fragment(fragment) {
        return None;
    }
    fragment_params(fragment)
        .find(|(key, _)| *key == "access_token")
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
