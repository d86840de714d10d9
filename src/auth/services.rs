use crate::auth::dto::{LoginForm, PasswordUpdateForm, SignupForm};
use crate::error::{AppError, StoreError};
use crate::forms::{is_valid_email, min_chars, not_blank, FormErrors};

pub const MIN_PASSWORD_CHARS: usize = 8;

const BLANK: &str = "This field cannot be blank";
const BAD_EMAIL: &str = "This field must be a valid email address";
const SHORT_PASSWORD: &str = "This field must be at least 8 characters long";

pub fn validate_signup(form: &SignupForm) -> FormErrors {
    let mut errors = FormErrors::default();
    errors.check(not_blank(&form.name), "name", BLANK);
    errors.check(not_blank(&form.email), "email", BLANK);
    errors.check(is_valid_email(&form.email), "email", BAD_EMAIL);
    errors.check(not_blank(&form.password), "password", BLANK);
    errors.check(min_chars(&form.password, MIN_PASSWORD_CHARS), "password", SHORT_PASSWORD);
    errors
}

pub fn validate_login(form: &LoginForm) -> FormErrors {
    let mut errors = FormErrors::default();
    errors.check(not_blank(&form.email), "email", BLANK);
    errors.check(is_valid_email(&form.email), "email", BAD_EMAIL);
    errors.check(not_blank(&form.password), "password", BLANK);
    errors
}

pub fn validate_password_update(form: &PasswordUpdateForm) -> FormErrors {
    let mut errors = FormErrors::default();
    errors.check(not_blank(&form.current_password), "current_password", BLANK);
    errors.check(not_blank(&form.new_password), "new_password", BLANK);
    errors.check(
        min_chars(&form.new_password, MIN_PASSWORD_CHARS),
        "new_password",
        SHORT_PASSWORD,
    );
    errors.check(
        not_blank(&form.new_password_confirmation),
        "new_password_confirmation",
        BLANK,
    );
    errors.check(
        form.new_password == form.new_password_confirmation,
        "new_password_confirmation",
        "Passwords do not match",
    );
    errors
}

/// A renewal that lost a race leaves this request without a session.
pub fn renewal_failed(err: StoreError) -> AppError {
    match err {
        StoreError::NoRecord => AppError::AuthRequired,
        other => other.into(),
    }
}
