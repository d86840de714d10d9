use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{password, repo_types::User};
use crate::clock::Clock;
use crate::db::{is_unique_violation, with_deadline};
use crate::error::StoreError;

const EMAIL_CONSTRAINT: &str = "users_uc_email";

/// Registered users and their credentials.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Hashes `password` and stores a new user, returning its id.
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<i64, StoreError>;

    /// Returns the user id when `email` and `password` match.
    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, StoreError>;

    async fn get(&self, id: i64) -> Result<User, StoreError>;

    async fn exists(&self, id: i64) -> Result<bool, StoreError>;

    /// Replaces the password after re-checking the current one.
    async fn update_password(&self, id: i64, current_password: &str, new_password: &str) -> Result<(), StoreError>;
}

pub(crate) fn hashing_failed(err: anyhow::Error) -> StoreError {
    StoreError::Unavailable(err.context("password hashing"))
}

pub struct PgUserStore {
    db: PgPool,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl PgUserStore {
    pub fn new(db: PgPool, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self { db, clock, timeout }
    }

    async fn hashed_password_by_id(&self, id: i64) -> Result<Option<String>, StoreError> {
        with_deadline(self.timeout, "load password hash", async {
            let row: Option<(String,)> =
                sqlx::query_as(r#"SELECT hashed_password FROM users WHERE id = $1"#)
                    .bind(id)
                    .fetch_optional(&self.db)
                    .await?;
            Ok(row.map(|(hash,)| hash))
        })
        .await
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<i64, StoreError> {
        let hash = password::hash_blocking(password).await.map_err(hashing_failed)?;
        let created = self.clock.now();
        with_deadline(self.timeout, "insert user", async {
            let row: Result<(i64,), sqlx::Error> = sqlx::query_as(
                r#"
                INSERT INTO users (name, email, hashed_password, created)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(name)
            .bind(email)
            .bind(&hash)
            .bind(created)
            .fetch_one(&self.db)
            .await;
            match row {
                Ok((id,)) => Ok(id),
                Err(e) if is_unique_violation(&e, EMAIL_CONSTRAINT) => Err(StoreError::DuplicateEmail),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, StoreError> {
        let row: Option<(i64, String)> = with_deadline(self.timeout, "find user by email", async {
            Ok(sqlx::query_as(r#"SELECT id, hashed_password FROM users WHERE email = $1"#)
                .bind(email)
                .fetch_optional(&self.db)
                .await?)
        })
        .await?;

        let (id, stored) = row.unzip();
        let ok = password::check_credentials(password, stored)
            .await
            .map_err(hashing_failed)?;
        match id {
            Some(id) if ok => Ok(id),
            _ => Err(StoreError::InvalidCredentials),
        }
    }

    async fn get(&self, id: i64) -> Result<User, StoreError> {
        with_deadline(self.timeout, "get user", async {
            sqlx::query_as::<_, User>(
                r#"SELECT id, name, email, hashed_password, created FROM users WHERE id = $1"#,
            )
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(StoreError::NoRecord)
        })
        .await
    }

    async fn exists(&self, id: i64) -> Result<bool, StoreError> {
        with_deadline(self.timeout, "user exists", async {
            let (exists,): (bool,) =
                sqlx::query_as(r#"SELECT EXISTS(SELECT true FROM users WHERE id = $1)"#)
                    .bind(id)
                    .fetch_one(&self.db)
                    .await?;
            Ok(exists)
        })
        .await
    }

    async fn update_password(&self, id: i64, current_password: &str, new_password: &str) -> Result<(), StoreError> {
        let stored = self
            .hashed_password_by_id(id)
            .await?
            .ok_or(StoreError::NoRecord)?;
        let ok = password::check_credentials(current_password, Some(stored))
            .await
            .map_err(hashing_failed)?;
        if !ok {
            return Err(StoreError::InvalidCredentials);
        }

        let hash = password::hash_blocking(new_password).await.map_err(hashing_failed)?;
        with_deadline(self.timeout, "update password", async {
            let res = sqlx::query(r#"UPDATE users SET hashed_password = $1 WHERE id = $2"#)
                .bind(&hash)
                .bind(id)
                .execute(&self.db)
                .await?;
            if res.rows_affected() == 0 {
                return Err(StoreError::NoRecord);
            }
            Ok(())
        })
        .await
    }
}
