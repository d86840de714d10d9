use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;
use crate::error::StoreError;

pub async fn connect(config: &AppConfig, url: &str) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(config.store_timeout())
        .connect(url)
        .await
        .context("connect to database")?;
    Ok(db)
}

/// Runs one store operation under `limit`.
///
/// On expiry the operation future is dropped, which returns any pooled
/// connection and rolls back an open transaction.
pub(crate) async fn with_deadline<T, F>(limit: Duration, op: &'static str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(op, ?limit, "store operation timed out");
            Err(StoreError::Unavailable(anyhow::anyhow!("{op} timed out after {limit:?}")))
        }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().is_some_and(|code| code.as_ref() == "23505")
                && db_err.constraint().map_or(true, |c| c == constraint)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_turns_slow_operations_into_unavailable() {
        let err = with_deadline(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StoreError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(err.to_string().contains("slow timed out"));
    }

    #[tokio::test]
    async fn deadline_passes_results_through() {
        let value = with_deadline(Duration::from_secs(1), "fast", async { Ok::<_, StoreError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let err = with_deadline(Duration::from_secs(1), "fast", async {
            Err::<(), _>(StoreError::NoRecord)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::NoRecord));
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound, "users_uc_email"));
    }
}
