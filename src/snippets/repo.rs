use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use time::Duration as TimeDuration;

use super::repo_types::Snippet;
use crate::clock::Clock;
use crate::db::with_deadline;
use crate::error::StoreError;

/// Upper bound on the number of snippets returned by [`SnippetStore::latest`].
pub const LATEST_LIMIT: usize = 10;

#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Stores a snippet expiring `expire_days` after now and returns its id.
    async fn insert(&self, title: &str, content: &str, expire_days: NonZeroU32) -> Result<i64, StoreError>;

    /// Returns the snippet if it exists and has not expired.
    async fn get(&self, id: i64) -> Result<Snippet, StoreError>;

    /// Newest live snippets first, at most [`LATEST_LIMIT`].
    async fn latest(&self) -> Result<Vec<Snippet>, StoreError>;
}

/// `created` and `expires` for a snippet inserted at the clock's now.
pub(crate) fn lifetime(
    clock: &dyn Clock,
    expire_days: NonZeroU32,
) -> Result<(time::OffsetDateTime, time::OffsetDateTime), StoreError> {
    let created = clock.now();
    let expires = created
        .checked_add(TimeDuration::days(i64::from(expire_days.get())))
        .ok_or(StoreError::ExpiryOutOfRange)?;
    Ok((created, expires))
}

pub struct PgSnippetStore {
    db: PgPool,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl PgSnippetStore {
    pub fn new(db: PgPool, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self { db, clock, timeout }
    }
}

#[async_trait]
impl SnippetStore for PgSnippetStore {
    async fn insert(&self, title: &str, content: &str, expire_days: NonZeroU32) -> Result<i64, StoreError> {
        let (created, expires) = lifetime(self.clock.as_ref(), expire_days)?;
        with_deadline(self.timeout, "insert snippet", async {
            let (id,): (i64,) = sqlx::query_as(
                r#"
                INSERT INTO snippets (title, content, created, expires)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(title)
            .bind(content)
            .bind(created)
            .bind(expires)
            .fetch_one(&self.db)
            .await?;
            Ok(id)
        })
        .await
    }

    async fn get(&self, id: i64) -> Result<Snippet, StoreError> {
        let now = self.clock.now();
        with_deadline(self.timeout, "get snippet", async {
            sqlx::query_as::<_, Snippet>(
                r#"
                SELECT id, title, content, created, expires
                FROM snippets
                WHERE expires > $1 AND id = $2
                "#,
            )
            .bind(now)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(StoreError::NoRecord)
        })
        .await
    }

    async fn latest(&self) -> Result<Vec<Snippet>, StoreError> {
        let now = self.clock.now();
        with_deadline(self.timeout, "latest snippets", async {
            let rows = sqlx::query_as::<_, Snippet>(
                r#"
                SELECT id, title, content, created, expires
                FROM snippets
                WHERE expires > $1
                ORDER BY id DESC
                LIMIT $2
                "#,
            )
            .bind(now)
            .bind(LATEST_LIMIT as i64)
            .fetch_all(&self.db)
            .await?;
            Ok(rows)
        })
        .await
    }
}
