//! Request field checks. Every handler validates its body here before any
//! store call is made.

use std::collections::BTreeMap;

use crate::error::ApiError;

pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 255;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 72;
pub const MAX_TITLE_LEN: usize = 500;
pub const MAX_TAGS_PER_ARTICLE: usize = 20;

/// Collects field errors, keeping the first message per field.
#[derive(Debug, Default)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.errors
                .entry(field.to_string())
                .or_insert_with(|| message.into());
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        self.check(!value.is_empty(), field, format!("{field} is required"));
        self.check(
            value.len() <= MAX_EMAIL_LEN,
            field,
            format!("{field} must not be more than {MAX_EMAIL_LEN} bytes long"),
        );
        self.check(is_email(value), field, "invalid email address");
    }

    pub fn password(&mut self, field: &str, value: &str) {
        self.check(!value.is_empty(), field, format!("{field} is required"));
        self.check(
            value.len() >= MIN_PASSWORD_LEN,
            field,
            format!("{field} must be at least {MIN_PASSWORD_LEN} characters"),
        );
        self.check(
            value.len() <= MAX_PASSWORD_LEN,
            field,
            format!("{field} must not be more than {MAX_PASSWORD_LEN} bytes long"),
        );
    }

    /// Non-blank and at most `max` characters.
    pub fn text(&mut self, field: &str, value: &str, max: usize) {
        self.check(!value.trim().is_empty(), field, format!("{field} is required"));
        self.check(
            value.chars().count() <= max,
            field,
            format!("{field} must not be more than {max} characters"),
        );
    }
}

/// Shape check only: one `@`, something before it, a dotted domain after
/// it, no whitespace.
pub fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Drops repeated ids, keeping first-seen order.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_email("a@example.com"));
        assert!(is_email("first.last@sub.example.org"));
        assert!(!is_email("a@"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("a@example"));
        assert!(!is_email("a@@example.com"));
        assert!(!is_email("a b@example.com"));
        assert!(!is_email("a@example..com"));
    }

    #[test]
    fn first_error_per_field_wins() {
        let mut v = Validator::new();
        v.password("password", "");
        assert!(!v.is_valid());
        let Err(ApiError::Validation(fields)) = v.finish() else {
            panic!("expected validation error");
        };
        assert_eq!(fields["password"], "password is required");
    }

    #[test]
    fn text_limits() {
        let mut v = Validator::new();
        v.text("name", "  ", MAX_NAME_LEN);
        v.text("title", &"x".repeat(MAX_TITLE_LEN + 1), MAX_TITLE_LEN);
        v.text("ok", "fine", 10);
        let Err(ApiError::Validation(fields)) = v.finish() else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 2);
        assert!(!fields.contains_key("ok"));
    }
}
