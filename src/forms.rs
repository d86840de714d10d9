//! Field validation shared by the signup, login, password and snippet forms.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::session::PageContext;

/// Body of every form page: the session's page context, the values to
/// redisplay (never passwords) and any validation errors.
#[derive(Debug, Serialize)]
pub struct FormPage<T> {
    pub page: PageContext,
    pub form: T,
    pub errors: FormErrors,
}

impl<T> FormPage<T> {
    pub fn new(page: PageContext, form: T) -> Self {
        Self::with_errors(page, form, FormErrors::default())
    }

    pub fn with_errors(page: PageContext, form: T, errors: FormErrors) -> Self {
        Self { page, form, errors }
    }
}

/// Errors collected while validating one submitted form.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    pub field_errors: BTreeMap<&'static str, String>,
    pub non_field_errors: Vec<String>,
}

impl FormErrors {
    pub fn is_valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    /// Records `message` for `field` unless the field already has an error.
    pub fn add_field_error(&mut self, field: &'static str, message: &str) {
        self.field_errors
            .entry(field)
            .or_insert_with(|| message.to_string());
    }

    pub fn add_non_field_error(&mut self, message: &str) {
        self.non_field_errors.push(message.to_string());
    }

    pub fn check(&mut self, ok: bool, field: &'static str, message: &str) {
        if !ok {
            self.add_field_error(field, message);
        }
    }
}

pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trimmed, lower-cased form used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
