use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, Method},
};
use tracing::debug;

use crate::error::AppError;
use crate::session::{RouteClass, Session};
use crate::state::AppState;

/// Id of the logged-in user; anonymous requests are redirected to login.
pub struct AuthUser(pub i64);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        let mut session = session.lock().await;
        match state.policy.check(RouteClass::AuthenticatedRead, &session, None) {
            Ok(proceed) => proceed.user_id().map(AuthUser).ok_or(AppError::AuthRequired),
            Err(e) => {
                debug!(path = %parts.uri.path(), "authentication required");
                if parts.method == Method::GET {
                    session.remember_path(parts.uri.path());
                }
                Err(e.into())
            }
        }
    }
}
