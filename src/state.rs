use std::sync::Arc;

use crate::auth::{MemoryUserStore, PgUserStore, UserStore};
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::db;
use crate::session::{AccessPolicy, CsrfGuard, MemorySessionStore, PgSessionStore, SessionAuthority, SessionStore};
use crate::snippets::{MemorySnippetStore, PgSnippetStore, SnippetStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub snippets: Arc<dyn SnippetStore>,
    pub sessions: SessionAuthority,
    pub policy: AccessPolicy,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let Some(url) = config.database_url.clone() else {
            tracing::warn!("DATABASE_URL not set; using in-memory stores, data is lost on restart");
            return Ok(Self::in_memory(config, clock));
        };

        let db = db::connect(&config, &url).await?;
        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        let timeout = config.store_timeout();
        let users = Arc::new(PgUserStore::new(db.clone(), clock.clone(), timeout));
        let snippets = Arc::new(PgSnippetStore::new(db.clone(), clock.clone(), timeout));
        let sessions = Arc::new(PgSessionStore::new(db, timeout));
        Ok(Self::from_parts(config, users, snippets, sessions, clock))
    }

    pub fn in_memory(config: Arc<AppConfig>, clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(
            config,
            Arc::new(MemoryUserStore::new(clock.clone())),
            Arc::new(MemorySnippetStore::new(clock.clone())),
            Arc::new(MemorySessionStore::new()),
            clock,
        )
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        snippets: Arc<dyn SnippetStore>,
        session_store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let csrf = CsrfGuard;
        let sessions = SessionAuthority::new(session_store, clock, csrf, config.session_ttl());
        Self {
            config,
            users,
            snippets,
            sessions,
            policy: AccessPolicy::new(csrf),
        }
    }
}
