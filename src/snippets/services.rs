use std::num::NonZeroU32;

use crate::forms::{max_chars, not_blank, permitted_value, FormErrors};
use crate::snippets::dto::CreateSnippetForm;

pub const TITLE_MAX_CHARS: usize = 100;
pub const PERMITTED_EXPIRY_DAYS: [u32; 3] = [1, 7, 365];

/// Validates a snippet submission, returning the parsed expiry in days
/// when it is one of the permitted values.
pub fn validate_snippet(form: &CreateSnippetForm) -> (FormErrors, Option<NonZeroU32>) {
    let mut errors = FormErrors::default();
    errors.check(not_blank(&form.title), "title", "This field cannot be blank");
    errors.check(
        max_chars(&form.title, TITLE_MAX_CHARS),
        "title",
        "This field cannot be more than 100 characters long",
    );
    errors.check(not_blank(&form.content), "content", "This field cannot be blank");

    let expires = form
        .expires
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|days| permitted_value(days, &PERMITTED_EXPIRY_DAYS))
        .and_then(NonZeroU32::new);
    errors.check(expires.is_some(), "expires", "This field must equal 1, 7 or 365");
    (errors, expires)
}

/// Snippet ids in paths are positive integers; anything else is not found.
pub fn parse_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, content: &str, expires: &str) -> CreateSnippetForm {
        CreateSnippetForm {
            title: title.into(),
            content: content.into(),
            expires: expires.into(),
            csrf_token: None,
        }
    }

    #[test]
    fn accepts_permitted_expiry() {
        for days in ["1", "7", "365"] {
            let (errors, expires) = validate_snippet(&form("O snail", "Climb Mount Fuji", days));
            assert!(errors.is_valid(), "{days}");
            assert_eq!(expires.map(NonZeroU32::get), days.parse().ok());
        }
    }

    #[test]
    fn rejects_bad_fields() {
        let (errors, expires) = validate_snippet(&form(&"a".repeat(101), "  ", "30"));
        assert!(expires.is_none());
        assert_eq!(errors.field_errors.len(), 3);
        assert!(errors.field_errors.contains_key("title"));
        assert!(errors.field_errors.contains_key("content"));
        assert!(errors.field_errors.contains_key("expires"));

        let (errors, _) = validate_snippet(&form(&"é".repeat(100), "x", "abc"));
        assert!(!errors.field_errors.contains_key("title"));
        assert!(errors.field_errors.contains_key("expires"));
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("1"), Some(1));
        for raw in ["0", "-1", "1.23", "foo", ""] {
            assert_eq!(parse_id(raw), None, "{raw}");
        }
    }
}
