//! Input normalization and checks for the auth endpoints.

use crate::domain::error::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 256;
pub const MAX_NAME_LEN: usize = 100;

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn check_email(email: &str, errors: &mut ValidationError) {
    if email.is_empty() {
        errors.push("email", "must not be empty");
        return;
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => errors.push("email", "must be a valid email address"),
    }
}

fn check_password(password: &str, errors: &mut ValidationError) {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        errors.push(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        );
    } else if len > MAX_PASSWORD_LEN {
        errors.push(
            "password",
            format!("must be at most {} characters", MAX_PASSWORD_LEN),
        );
    }
}

/// Validates a registration. `email` is expected already normalized.
pub fn validate_registration(
    email: &str,
    password: &str,
    name: Option<&str>,
) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    check_email(email, &mut errors);
    check_password(password, &mut errors);
    if let Some(name) = name {
        if name.chars().count() > MAX_NAME_LEN {
            errors.push("name", format!("must be at most {} characters", MAX_NAME_LEN));
        }
    }
    errors.into_result()
}

/// Login only checks presence; credential mismatch is reported as unauthorized instead.
pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    if email.is_empty() {
        errors.push("email", "must not be empty");
    }
    if password.is_empty() {
        errors.push("password", "must not be empty");
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn accepts_valid_registration() {
        assert!(validate_registration("ada@example.com", "long enough", Some("Ada")).is_ok());
        assert!(validate_registration("ada@example.com", "long enough", None).is_ok());
    }

    #[test]
    fn reports_all_problems_at_once() {
        let err = validate_registration("nope", "short", Some(&"x".repeat(101))).unwrap_err();
        let fields: Vec<_> = err.fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "password", "name"]);
    }

    #[test]
    fn rejects_missing_local_part() {
        let err = validate_registration("@example.com", "long enough", None).unwrap_err();
        assert_eq!(err.fields[0].field, "email");
    }

    #[test]
    fn login_requires_both_fields() {
        let err = validate_login("", "").unwrap_err();
        assert_eq!(err.fields.len(), 2);
        assert!(validate_login("a@b", "x").is_ok());
    }
}
