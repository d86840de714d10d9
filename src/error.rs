use axum::{
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;

use crate::forms::FormPage;
use crate::session::AccessError;

pub const LOGIN_PATH: &str = "/user/login";

/// Failures surfaced by the user, snippet and session stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Lookup miss, including records filtered out because they expired.
    #[error("no matching record found")]
    NoRecord,

    #[error("email address is already in use")]
    DuplicateEmail,

    /// Unknown email or wrong password; callers cannot tell which.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// `created + expire_days` is past the representable calendar.
    #[error("snippet expiry is out of range")]
    ExpiryOutOfRange,

    #[error("store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NoRecord,
            other => StoreError::Unavailable(other.into()),
        }
    }
}

/// Error type returned by handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("authentication required")]
    AuthRequired,

    #[error("csrf token missing or invalid")]
    CsrfInvalid,

    /// The submitted form page, re-sent with its errors marked.
    #[error("form validation failed")]
    Validation(serde_json::Value),

    /// Body was not a decodable urlencoded form.
    #[error(transparent)]
    Form(#[from] FormRejection),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation<T: Serialize>(page: &FormPage<T>) -> Self {
        match serde_json::to_value(page) {
            Ok(body) => AppError::Validation(body),
            Err(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoRecord => AppError::NotFound,
            StoreError::Unavailable(e) => AppError::Internal(e),
            other => AppError::Internal(anyhow::anyhow!("unhandled store error: {other}")),
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::AuthRequired => AppError::AuthRequired,
            AccessError::CsrfInvalid => AppError::CsrfInvalid,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
            AppError::AuthRequired => Redirect::to(LOGIN_PATH).into_response(),
            AppError::CsrfInvalid => (StatusCode::BAD_REQUEST, "Bad Request").into_response(),
            AppError::Validation(body) => (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response(),
            AppError::Form(rejection) => rejection.into_response(),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
