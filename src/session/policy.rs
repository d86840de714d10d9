//! Accept/reject decisions made before any handler touches a store.

use super::context::{SessionContext, SessionOrigin};
use super::csrf::CsrfGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("csrf token missing or invalid")]
    CsrfInvalid,
    #[error("authentication required")]
    AuthRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Views and listings; never blocked.
    ReadOnly,
    /// Pages that only make sense for a logged-in user.
    AuthenticatedRead,
    /// Signup and login.
    PublicWrite,
    /// Snippet creation, logout, password update.
    AuthenticatedWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proceed {
    Anonymous,
    AsUser(i64),
}

impl Proceed {
    pub fn user_id(self) -> Option<i64> {
        match self {
            Proceed::Anonymous => None,
            Proceed::AsUser(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy {
    csrf: CsrfGuard,
}

impl AccessPolicy {
    pub fn new(csrf: CsrfGuard) -> Self {
        Self { csrf }
    }

    pub fn check(
        &self,
        class: RouteClass,
        session: &SessionContext,
        submitted_csrf: Option<&str>,
    ) -> Result<Proceed, AccessError> {
        let proceed = match session.current_user_id() {
            Some(id) => Proceed::AsUser(id),
            None => Proceed::Anonymous,
        };
        match class {
            RouteClass::ReadOnly => Ok(proceed),
            RouteClass::AuthenticatedRead => require_user(proceed),
            RouteClass::PublicWrite => {
                self.check_csrf(session, submitted_csrf)?;
                Ok(proceed)
            }
            RouteClass::AuthenticatedWrite => {
                let proceed = require_user(proceed)?;
                self.check_csrf(session, submitted_csrf)?;
                Ok(proceed)
            }
        }
    }

    /// [`RouteClass::AuthenticatedWrite`] check returning the acting user.
    pub fn authorize_write(&self, session: &SessionContext, submitted_csrf: Option<&str>) -> Result<i64, AccessError> {
        self.check(RouteClass::AuthenticatedWrite, session, submitted_csrf)?
            .user_id()
            .ok_or(AccessError::AuthRequired)
    }

    fn check_csrf(&self, session: &SessionContext, submitted: Option<&str>) -> Result<(), AccessError> {
        match session.origin() {
            // The token this form carried belonged to a session that is gone.
            SessionOrigin::Expired => Err(AccessError::AuthRequired),
            SessionOrigin::Started => Err(AccessError::CsrfInvalid),
            SessionOrigin::Resumed => self.csrf.verify(session.csrf_token(), submitted),
        }
    }
}

fn require_user(proceed: Proceed) -> Result<Proceed, AccessError> {
    match proceed {
        Proceed::AsUser(_) => Ok(proceed),
        Proceed::Anonymous => Err(AccessError::AuthRequired),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::session::{MemorySessionStore, SessionAuthority};

    fn authority() -> SessionAuthority {
        SessionAuthority::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(ManualClock::new()),
            CsrfGuard,
            Duration::hours(12),
        )
    }

    async fn stored(authority: &SessionAuthority, user_id: Option<i64>) -> SessionContext {
        let mut session = authority.resume(None).await.unwrap();
        session.page();
        authority.commit(&mut session).await.unwrap();
        if let Some(id) = user_id {
            authority.login(&mut session, id).await.unwrap();
        }
        authority.resume(Some(session.token())).await.unwrap()
    }

    #[tokio::test]
    async fn read_only_never_blocks() {
        let authority = authority();
        let policy = AccessPolicy::default();
        let fresh = authority.resume(None).await.unwrap();
        assert_eq!(policy.check(RouteClass::ReadOnly, &fresh, None), Ok(Proceed::Anonymous));

        let authed = stored(&authority, Some(4)).await;
        assert_eq!(policy.check(RouteClass::ReadOnly, &authed, None), Ok(Proceed::AsUser(4)));
    }

    #[tokio::test]
    async fn public_writes_need_a_matching_csrf_token() {
        let authority = authority();
        let policy = AccessPolicy::default();
        let session = stored(&authority, None).await;
        let token = session.csrf_token().to_string();

        assert_eq!(
            policy.check(RouteClass::PublicWrite, &session, Some(&token)),
            Ok(Proceed::Anonymous)
        );
        assert_eq!(
            policy.check(RouteClass::PublicWrite, &session, Some("wrongToken")),
            Err(AccessError::CsrfInvalid)
        );
        assert_eq!(
            policy.check(RouteClass::PublicWrite, &session, None),
            Err(AccessError::CsrfInvalid)
        );
    }

    #[tokio::test]
    async fn no_session_means_no_token_to_compare() {
        let authority = authority();
        let policy = AccessPolicy::default();
        let fresh = authority.resume(None).await.unwrap();
        // Even its own freshly issued token is not accepted.
        let own = fresh.csrf_token().to_string();
        assert_eq!(
            policy.check(RouteClass::PublicWrite, &fresh, Some(&own)),
            Err(AccessError::CsrfInvalid)
        );

        let stale = authority.resume(Some("no-such-token")).await.unwrap();
        let own = stale.csrf_token().to_string();
        assert_eq!(
            policy.check(RouteClass::PublicWrite, &stale, Some(&own)),
            Err(AccessError::AuthRequired)
        );
    }

    #[tokio::test]
    async fn authenticated_writes_check_auth_then_csrf() {
        let authority = authority();
        let policy = AccessPolicy::default();

        let anon = stored(&authority, None).await;
        let token = anon.csrf_token().to_string();
        assert_eq!(policy.authorize_write(&anon, Some(&token)), Err(AccessError::AuthRequired));
        assert_eq!(
            policy.check(RouteClass::AuthenticatedRead, &anon, None),
            Err(AccessError::AuthRequired)
        );

        let authed = stored(&authority, Some(9)).await;
        let token = authed.csrf_token().to_string();
        assert_eq!(policy.authorize_write(&authed, Some(&token)), Ok(9));
        assert_eq!(policy.authorize_write(&authed, Some("wrongToken")), Err(AccessError::CsrfInvalid));
        assert_eq!(policy.authorize_write(&authed, None), Err(AccessError::CsrfInvalid));
        assert_eq!(
            policy.check(RouteClass::AuthenticatedRead, &authed, None),
            Ok(Proceed::AsUser(9))
        );
    }
}
