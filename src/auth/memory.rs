use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::password;
use super::repo::{hashing_failed, UserStore};
use super::repo_types::User;
use crate::clock::Clock;
use crate::error::StoreError;

/// Process-local user store used when no database is configured and in tests.
pub struct MemoryUserStore {
    clock: Arc<dyn Clock>,
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    users: BTreeMap<i64, User>,
    by_email: HashMap<String, i64>,
}

impl MemoryUserStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: RwLock::new(Inner::default()),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<i64, StoreError> {
        let hashed_password = password::hash_blocking(password).await.map_err(hashing_failed)?;
        let created = self.clock.now();

        // Uniqueness is checked and claimed under one write lock.
        let mut inner = self.inner.write().await;
        if inner.by_email.contains_key(email) {
            return Err(StoreError::DuplicateEmail);
        }
        inner.last_id += 1;
        let id = inner.last_id;
        inner.by_email.insert(email.to_string(), id);
        inner.users.insert(
            id,
            User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                hashed_password,
                created,
            },
        );
        Ok(id)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, StoreError> {
        let found = {
            let inner = self.inner.read().await;
            inner
                .by_email
                .get(email)
                .and_then(|id| inner.users.get(id))
                .map(|u| (u.id, u.hashed_password.clone()))
        };
        let (id, stored) = found.unzip();
        let ok = password::check_credentials(password, stored)
            .await
            .map_err(hashing_failed)?;
        match id {
            Some(id) if ok => Ok(id),
            _ => Err(StoreError::InvalidCredentials),
        }
    }

    async fn get(&self, id: i64) -> Result<User, StoreError> {
        let inner = self.inner.read().await;
        inner.users.get(&id).cloned().ok_or(StoreError::NoRecord)
    }

    async fn exists(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.users.contains_key(&id))
    }

    async fn update_password(&self, id: i64, current_password: &str, new_password: &str) -> Result<(), StoreError> {
        let stored = {
            let inner = self.inner.read().await;
            inner
                .users
                .get(&id)
                .map(|u| u.hashed_password.clone())
                .ok_or(StoreError::NoRecord)?
        };
        let ok = password::check_credentials(current_password, Some(stored))
            .await
            .map_err(hashing_failed)?;
        if !ok {
            return Err(StoreError::InvalidCredentials);
        }

        let hashed = password::hash_blocking(new_password).await.map_err(hashing_failed)?;
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(&id).ok_or(StoreError::NoRecord)?;
        user.hashed_password = hashed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn store() -> Arc<MemoryUserStore> {
        Arc::new(MemoryUserStore::new(Arc::new(SystemClock)))
    }

    #[tokio::test]
    async fn insert_then_authenticate() {
        let users = store();
        let id = users.insert("Alice", "alice@example.com", "pa$$word").await.unwrap();
        assert_eq!(users.authenticate("alice@example.com", "pa$$word").await.unwrap(), id);

        let user = users.get(id).await.unwrap();
        assert_eq!(user.name, "Alice");
        assert_ne!(user.hashed_password, "pa$$word");
        assert!(users.exists(id).await.unwrap());
        assert!(!users.exists(id + 1).await.unwrap());
        assert!(matches!(users.get(id + 1).await, Err(StoreError::NoRecord)));
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let users = store();
        users.insert("Alice", "alice@example.com", "pa$$word").await.unwrap();

        let unknown = users.authenticate("nobody@example.com", "pa$$word").await.unwrap_err();
        let wrong = users.authenticate("alice@example.com", "not-it").await.unwrap_err();
        assert!(matches!(unknown, StoreError::InvalidCredentials));
        assert!(matches!(wrong, StoreError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let users = store();
        users.insert("Alice", "alice@example.com", "pa$$word").await.unwrap();
        let err = users
            .insert("Impostor", "alice@example.com", "other-password")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        // The original password still works.
        assert!(users.authenticate("alice@example.com", "pa$$word").await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_signups_for_one_email_admit_exactly_one() {
        let users = store();
        let mut tasks = Vec::new();
        for i in 0..8 {
            let users = users.clone();
            tasks.push(tokio::spawn(async move {
                users
                    .insert(&format!("Racer {i}"), "race@example.com", "validPa$$word")
                    .await
            }));
        }

        let mut ok = 0;
        let mut dupes = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => ok += 1,
                Err(StoreError::DuplicateEmail) => dupes += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(dupes, 7);
    }

    #[tokio::test]
    async fn update_password_rechecks_current() {
        let users = store();
        let id = users.insert("Alice", "alice@example.com", "pa$$word").await.unwrap();

        let err = users.update_password(id, "wrong", "newPa$$word").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidCredentials));
        assert!(users.authenticate("alice@example.com", "pa$$word").await.is_ok());

        users.update_password(id, "pa$$word", "newPa$$word").await.unwrap();
        assert!(users.authenticate("alice@example.com", "pa$$word").await.is_err());
        assert_eq!(users.authenticate("alice@example.com", "newPa$$word").await.unwrap(), id);

        let err = users.update_password(id + 1, "pa$$word", "x").await.unwrap_err();
        assert!(matches!(err, StoreError::NoRecord));
    }
}
