use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::context::{SessionData, SessionRecord};
use super::store::SessionStore;
use crate::error::StoreError;

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Vec<u8>, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &[u8], now: OffsetDateTime) -> Result<Option<SessionRecord>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(key)
            .filter(|r| r.expires_at > now)
            .cloned())
    }

    async fn create(&self, key: &[u8], record: &SessionRecord) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(key) {
            return Err(StoreError::Unavailable(anyhow::anyhow!("session token collision")));
        }
        sessions.insert(key.to_vec(), record.clone());
        Ok(())
    }

    async fn save(&self, key: &[u8], data: &SessionData) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let record = sessions.get_mut(key).ok_or(StoreError::NoRecord)?;
        record.data = data.clone();
        Ok(())
    }

    async fn renew(&self, old: Option<&[u8]>, new: &[u8], record: &SessionRecord) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(new) {
            return Err(StoreError::Unavailable(anyhow::anyhow!("session token collision")));
        }
        if let Some(old) = old {
            sessions.remove(old).ok_or(StoreError::NoRecord)?;
        }
        sessions.insert(new.to_vec(), record.clone());
        Ok(())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, r| r.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}
