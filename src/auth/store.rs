use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// A registered user. Created once at registration, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("email already registered")]
    AlreadyExists,
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Emails are identity keys, so writes and reads must agree on case and
/// surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user, assigning the next id. Fails with `AlreadyExists`
    /// if the normalized email is already present.
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        full_name: Option<String>,
    ) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    next_id: u64,
}

/// In-memory user store. The mutex makes the duplicate check, id assignment
/// and insert a single critical section, so concurrent registrations of the
/// same email cannot both pass the check and ids never collide.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        full_name: Option<String>,
    ) -> Result<User, StoreError> {
        let email = normalize_email(email);
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Backend("user store lock poisoned".into()))?;
        if inner.users.contains_key(&email) {
            return Err(StoreError::AlreadyExists);
        }
        inner.next_id += 1;
        let user = User {
            id: inner.next_id,
            email: email.clone(),
            password_hash: password_hash.to_string(),
            full_name,
        };
        inner.users.insert(email, user.clone());
        debug!(user_id = user.id, email = %user.email, "user record created");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        let inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Backend("user store lock poisoned".into()))?;
        Ok(inner.users.get(&email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_lookup() {
        let store = MemoryStore::new();
        let created = store
            .create("a@x.com", "hash", Some("Ada".into()))
            .await
            .expect("create should succeed");
        assert_eq!(created.id, 1);

        let found = store
            .find_by_email("a@x.com")
            .await
            .expect("lookup should succeed")
            .expect("user should exist");
        assert_eq!(found.email, "a@x.com");
        assert_eq!(found.full_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_and_store_unchanged() {
        let store = MemoryStore::new();
        store.create("a@x.com", "hash1", None).await.expect("first create");
        let err = store.create("a@x.com", "hash2", None).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists);

        // The failed attempt must not have clobbered the original record.
        let found = store
            .find_by_email("a@x.com")
            .await
            .unwrap()
            .expect("original user still present");
        assert_eq!(found.id, 1);
        assert_eq!(found.password_hash, "hash1");
    }

    #[tokio::test]
    async fn ids_are_sequential_and_unique() {
        let store = MemoryStore::new();
        let a = store.create("a@x.com", "h", None).await.unwrap();
        let b = store.create("b@x.com", "h", None).await.unwrap();
        let c = store.create("c@x.com", "h", None).await.unwrap();
        assert_eq!((a.id, b.id, c.id), (1, 2, 3));

        // A failed create must not consume an id.
        store.create("b@x.com", "h", None).await.unwrap_err();
        let d = store.create("d@x.com", "h", None).await.unwrap();
        assert_eq!(d.id, 4);
    }

    #[tokio::test]
    async fn email_is_normalized_at_write_and_read() {
        let store = MemoryStore::new();
        store.create("  A@X.com ", "h", None).await.unwrap();

        let found = store.find_by_email("a@x.com").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().email, "a@x.com");

        // Different casing of the same address counts as a duplicate.
        let err = store.create("a@X.COM", "h", None).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists);
    }

    #[tokio::test]
    async fn concurrent_registrations_of_same_email_yield_one_winner() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.create("race@x.com", "h", None).await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.expect("task should not panic").is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }
}
