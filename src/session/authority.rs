use std::sync::Arc;

use time::Duration;
use tracing::{debug, info, warn};

use super::context::{SessionContext, SessionData, SessionOrigin, SessionRecord};
use super::csrf::CsrfGuard;
use super::store::SessionStore;
use super::token::{digest, generate_token};
use crate::clock::Clock;
use crate::error::StoreError;

/// Owns the session table: resumes, starts, renews and persists sessions.
#[derive(Clone)]
pub struct SessionAuthority {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    csrf: CsrfGuard,
    ttl: Duration,
}

impl SessionAuthority {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, csrf: CsrfGuard, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            csrf,
            ttl,
        }
    }

    /// Resumes the live session named by `presented`, or starts an
    /// anonymous one that is only stored once something is written to it.
    pub async fn resume(&self, presented: Option<&str>) -> Result<SessionContext, StoreError> {
        let Some(token) = presented else {
            return self.start(SessionOrigin::Started);
        };
        match self.store.load(&digest(token), self.clock.now()).await? {
            Some(record) => Ok(SessionContext::new(
                token.to_string(),
                record,
                SessionOrigin::Resumed,
                true,
            )),
            None => {
                debug!("presented session token is unknown or expired");
                self.start(SessionOrigin::Expired)
            }
        }
    }

    /// Stores pending changes to the session, creating it if needed.
    pub async fn commit(&self, session: &mut SessionContext) -> Result<(), StoreError> {
        if !session.is_dirty() {
            return Ok(());
        }
        let key = digest(session.token());
        if session.is_persisted() {
            match self.store.save(&key, &session.record().data).await {
                Ok(()) => {}
                // Renewed or swept by a concurrent request; the newer state wins.
                Err(StoreError::NoRecord) => debug!("session vanished before save"),
                Err(e) => return Err(e),
            }
        } else {
            self.store.create(&key, session.record()).await?;
        }
        session.mark_persisted();
        Ok(())
    }

    /// Anonymous -> Authenticated. Issues a fresh token and CSRF token and
    /// discards the previous session.
    pub async fn login(&self, session: &mut SessionContext, user_id: i64) -> Result<(), StoreError> {
        self.renew(session, Some(user_id)).await?;
        info!(user_id, "session authenticated");
        Ok(())
    }

    /// Authenticated -> Anonymous, again through renewal.
    pub async fn logout(&self, session: &mut SessionContext) -> Result<(), StoreError> {
        let user_id = session.current_user_id();
        self.renew(session, None).await?;
        info!(?user_id, "session logged out");
        Ok(())
    }

    async fn renew(&self, session: &mut SessionContext, user_id: Option<i64>) -> Result<(), StoreError> {
        let old = session.is_persisted().then(|| digest(session.token()));
        let token = generate_token().map_err(StoreError::Unavailable)?;
        let record = SessionRecord {
            data: SessionData::new(user_id, self.csrf.issue().map_err(StoreError::Unavailable)?),
            expires_at: self.clock.now() + self.ttl,
        };
        self.store.renew(old.as_deref(), &digest(&token), &record).await?;
        session.replace(token, record);
        Ok(())
    }

    /// Seconds left before the session expires, for the cookie's Max-Age.
    pub fn max_age(&self, session: &SessionContext) -> i64 {
        (session.expires_at() - self.clock.now()).whole_seconds().max(0)
    }

    pub async fn sweep(&self) -> Result<u64, StoreError> {
        self.store.delete_expired(self.clock.now()).await
    }

    /// Periodically deletes expired sessions. Lookups ignore them anyway.
    pub fn spawn_sweeper(&self, period: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let authority = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match authority.sweep().await {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, "expired sessions swept"),
                    Err(e) => warn!(error = %e, "session sweep failed"),
                }
            }
        })
    }

    fn start(&self, origin: SessionOrigin) -> Result<SessionContext, StoreError> {
        let token = generate_token().map_err(StoreError::Unavailable)?;
        let record = SessionRecord {
            data: SessionData::new(None, self.csrf.issue().map_err(StoreError::Unavailable)?),
            expires_at: self.clock.now() + self.ttl,
        };
        Ok(SessionContext::new(token, record, origin, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::memory::MemorySessionStore;

    fn authority() -> (Arc<ManualClock>, Arc<MemorySessionStore>, SessionAuthority) {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(MemorySessionStore::new());
        let authority = SessionAuthority::new(store.clone(), clock.clone(), CsrfGuard, Duration::hours(12));
        (clock, store, authority)
    }

    /// A stored anonymous session, as after a first page view.
    async fn anonymous(authority: &SessionAuthority) -> SessionContext {
        let mut session = authority.resume(None).await.unwrap();
        session.page();
        authority.commit(&mut session).await.unwrap();
        session
    }

    #[tokio::test]
    async fn new_sessions_are_stored_lazily() {
        let (_, store, authority) = authority();
        let mut session = authority.resume(None).await.unwrap();
        assert_eq!(session.origin(), SessionOrigin::Started);
        assert!(!session.is_authenticated());

        authority.commit(&mut session).await.unwrap();
        assert_eq!(store.len().await, 0);

        session.page();
        authority.commit(&mut session).await.unwrap();
        assert_eq!(store.len().await, 1);

        let resumed = authority.resume(Some(session.token())).await.unwrap();
        assert_eq!(resumed.origin(), SessionOrigin::Resumed);
        assert_eq!(resumed.csrf_token(), session.csrf_token());
    }

    #[tokio::test]
    async fn login_rotates_token_and_csrf() {
        let (_, _, authority) = authority();
        let mut session = anonymous(&authority).await;
        let old_token = session.token().to_string();
        let old_csrf = session.csrf_token().to_string();

        authority.login(&mut session, 1).await.unwrap();
        assert_eq!(session.current_user_id(), Some(1));
        assert_ne!(session.token(), old_token);
        assert_ne!(session.csrf_token(), old_csrf);

        let stale = authority.resume(Some(&old_token)).await.unwrap();
        assert_eq!(stale.origin(), SessionOrigin::Expired);
        assert!(!stale.is_authenticated());

        let fresh = authority.resume(Some(session.token())).await.unwrap();
        assert_eq!(fresh.current_user_id(), Some(1));
    }

    #[tokio::test]
    async fn logout_renews_into_an_anonymous_session() {
        let (_, _, authority) = authority();
        let mut session = anonymous(&authority).await;
        authority.login(&mut session, 7).await.unwrap();
        let authed_token = session.token().to_string();

        authority.logout(&mut session).await.unwrap();
        assert!(!session.is_authenticated());
        assert_ne!(session.token(), authed_token);
        assert!(!authority.resume(Some(&authed_token)).await.unwrap().is_authenticated());
    }

    #[tokio::test]
    async fn racing_renewals_of_one_session_admit_one() {
        let (_, _, authority) = authority();
        let original = anonymous(&authority).await;

        let mut first = authority.resume(Some(original.token())).await.unwrap();
        let mut second = authority.resume(Some(original.token())).await.unwrap();
        authority.login(&mut first, 1).await.unwrap();
        let err = authority.login(&mut second, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::NoRecord));

        assert_eq!(
            authority.resume(Some(first.token())).await.unwrap().current_user_id(),
            Some(1)
        );
        assert!(!authority.resume(Some(original.token())).await.unwrap().is_authenticated());
    }

    #[tokio::test]
    async fn sessions_expire_at_ttl() {
        let (clock, store, authority) = authority();
        let mut session = anonymous(&authority).await;
        authority.login(&mut session, 3).await.unwrap();
        assert_eq!(authority.max_age(&session), 12 * 60 * 60);

        clock.advance(Duration::hours(12) - Duration::seconds(1));
        assert!(authority.resume(Some(session.token())).await.unwrap().is_authenticated());

        clock.advance(Duration::seconds(1));
        let expired = authority.resume(Some(session.token())).await.unwrap();
        assert_eq!(expired.origin(), SessionOrigin::Expired);
        assert!(!expired.is_authenticated());

        assert_eq!(authority.sweep().await.unwrap(), 1);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn flash_survives_one_page_view() {
        let (_, _, authority) = authority();
        let mut session = anonymous(&authority).await;
        session.set_flash("Snippet successfully created!");
        authority.commit(&mut session).await.unwrap();

        let mut next = authority.resume(Some(session.token())).await.unwrap();
        assert_eq!(next.page().flash.as_deref(), Some("Snippet successfully created!"));
        authority.commit(&mut next).await.unwrap();

        let mut after = authority.resume(Some(session.token())).await.unwrap();
        assert_eq!(after.page().flash, None);
    }
}
