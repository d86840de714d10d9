use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

use super::context::SessionContext;
use crate::error::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "session";

/// The current request's session, shared with the session layer.
#[derive(Clone)]
pub struct Session(Arc<Mutex<SessionContext>>);

impl Session {
    pub async fn lock(&self) -> MutexGuard<'_, SessionContext> {
        self.0.lock().await
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("session layer is not installed")))
    }
}

/// Loads the session before the handler runs and persists it afterwards.
pub async fn session_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = extract_session_token(req.headers());
    let mut context = state.sessions.resume(presented.as_deref()).await?;

    if let Some(user_id) = context.current_user_id() {
        if !state.users.exists(user_id).await? {
            warn!(user_id, "session refers to a user that no longer exists");
            context.forget_user();
        }
    }

    let session = Session(Arc::new(Mutex::new(context)));
    req.extensions_mut().insert(session.clone());

    let mut res = next.run(req).await;

    let mut context = session.lock().await;
    state.sessions.commit(&mut context).await?;

    let cookie = if context.is_persisted() {
        (presented.as_deref() != Some(context.token())).then(|| {
            session_cookie(
                context.token(),
                state.sessions.max_age(&context),
                state.config.session.cookie_secure,
            )
        })
    } else if presented.is_some() {
        Some(clear_session_cookie(state.config.session.cookie_secure))
    } else {
        None
    };
    if let Some(cookie) = cookie {
        let value = HeaderValue::from_str(&cookie).map_err(|e| AppError::Internal(e.into()))?;
        res.headers_mut().append(SET_COOKIE, value);
    }
    Ok(res)
}

fn session_cookie(token: &str, max_age: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == SESSION_COOKIE_NAME).then(|| val.trim().to_string())
        })
        .find(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; session=abc123; lang=en"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_or_empty_session_cookie_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_session_token(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("session=; other=1"));
        assert_eq!(extract_session_token(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("sessionx=abc"));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("tok", 43200, false);
        assert_eq!(cookie, "session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=43200");
        assert!(session_cookie("tok", 1, true).ends_with("; Secure"));
        assert!(clear_session_cookie(false).starts_with("session=; "));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }
}
