use std::time::Duration;

use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use time::OffsetDateTime;

use super::context::{SessionData, SessionRecord};
use crate::db::with_deadline;
use crate::error::StoreError;

/// Session table keyed by the digest of the session token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the session unless it is missing or expired at `now`.
    async fn load(&self, key: &[u8], now: OffsetDateTime) -> Result<Option<SessionRecord>, StoreError>;

    /// Inserts a new session, rejecting a key that is already present.
    async fn create(&self, key: &[u8], record: &SessionRecord) -> Result<(), StoreError>;

    /// Overwrites the data of an existing session; `NoRecord` when it is gone.
    async fn save(&self, key: &[u8], data: &SessionData) -> Result<(), StoreError>;

    /// Removes `old` and inserts `new` as one step.
    ///
    /// Fails with `NoRecord` and changes nothing when `old` was already
    /// removed, so only one of several racing renewals wins.
    async fn renew(&self, old: Option<&[u8]>, new: &[u8], record: &SessionRecord) -> Result<(), StoreError>;

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError>;
}

pub struct PgSessionStore {
    db: PgPool,
    timeout: Duration,
}

impl PgSessionStore {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, key: &[u8], now: OffsetDateTime) -> Result<Option<SessionRecord>, StoreError> {
        with_deadline(self.timeout, "load session", async {
            let row: Option<(Json<SessionData>, OffsetDateTime)> = sqlx::query_as(
                r#"SELECT data, expiry FROM sessions WHERE token = $1 AND expiry > $2"#,
            )
            .bind(key)
            .bind(now)
            .fetch_optional(&self.db)
            .await?;
            Ok(row.map(|(Json(data), expires_at)| SessionRecord { data, expires_at }))
        })
        .await
    }

    async fn create(&self, key: &[u8], record: &SessionRecord) -> Result<(), StoreError> {
        with_deadline(self.timeout, "create session", async {
            sqlx::query(r#"INSERT INTO sessions (token, data, expiry) VALUES ($1, $2, $3)"#)
                .bind(key)
                .bind(Json(&record.data))
                .bind(record.expires_at)
                .execute(&self.db)
                .await?;
            Ok(())
        })
        .await
    }

    async fn save(&self, key: &[u8], data: &SessionData) -> Result<(), StoreError> {
        with_deadline(self.timeout, "save session", async {
            let res = sqlx::query(r#"UPDATE sessions SET data = $2 WHERE token = $1"#)
                .bind(key)
                .bind(Json(data))
                .execute(&self.db)
                .await?;
            if res.rows_affected() == 0 {
                return Err(StoreError::NoRecord);
            }
            Ok(())
        })
        .await
    }

    async fn renew(&self, old: Option<&[u8]>, new: &[u8], record: &SessionRecord) -> Result<(), StoreError> {
        with_deadline(self.timeout, "renew session", async {
            let mut tx = self.db.begin().await?;
            if let Some(old) = old {
                let gone = sqlx::query(r#"DELETE FROM sessions WHERE token = $1"#)
                    .bind(old)
                    .execute(&mut *tx)
                    .await?;
                if gone.rows_affected() == 0 {
                    // Dropping `tx` rolls back.
                    return Err(StoreError::NoRecord);
                }
            }
            sqlx::query(r#"INSERT INTO sessions (token, data, expiry) VALUES ($1, $2, $3)"#)
                .bind(new)
                .bind(Json(&record.data))
                .bind(record.expires_at)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        with_deadline(self.timeout, "delete expired sessions", async {
            let res = sqlx::query(r#"DELETE FROM sessions WHERE expiry <= $1"#)
                .bind(now)
                .execute(&self.db)
                .await?;
            Ok(res.rows_affected())
        })
        .await
    }
}
