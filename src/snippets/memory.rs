use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::repo::{lifetime, SnippetStore, LATEST_LIMIT};
use super::repo_types::Snippet;
use crate::clock::Clock;
use crate::error::StoreError;

/// Process-local snippet store used when no database is configured and in tests.
pub struct MemorySnippetStore {
    clock: Arc<dyn Clock>,
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    rows: BTreeMap<i64, Snippet>,
}

impl MemorySnippetStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: RwLock::new(Inner::default()),
        }
    }
}

#[async_trait]
impl SnippetStore for MemorySnippetStore {
    async fn insert(&self, title: &str, content: &str, expire_days: NonZeroU32) -> Result<i64, StoreError> {
        let (created, expires) = lifetime(self.clock.as_ref(), expire_days)?;
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let id = inner.last_id;
        inner.rows.insert(
            id,
            Snippet {
                id,
                title: title.to_string(),
                content: content.to_string(),
                created,
                expires,
            },
        );
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Snippet, StoreError> {
        let now = self.clock.now();
        let inner = self.inner.read().await;
        inner
            .rows
            .get(&id)
            .filter(|s| s.is_live(now))
            .cloned()
            .ok_or(StoreError::NoRecord)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, StoreError> {
        let now = self.clock.now();
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .values()
            .rev()
            .filter(|s| s.is_live(now))
            .take(LATEST_LIMIT)
            .cloned()
            .collect())
    }
}
