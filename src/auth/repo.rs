use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::repo_types::{User, UserRecord};
use crate::error::{AppError, AppResult};
use crate::storage::{load_json, save_json, StorageClient};

pub const USERS_KEY: &str = "user_data.json";

/// All accounts, persisted as one flat `id -> record` document.
pub struct UserStore {
    storage: Arc<dyn StorageClient>,
    lock: Mutex<()>,
}

impl UserStore {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    async fn load_raw(&self) -> Map<String, Value> {
        load_json(self.storage.as_ref(), USERS_KEY).await
    }

    /// Records that parse as users. Anything else is kept on disk but ignored.
    fn valid_users(raw: &Map<String, Value>) -> Vec<User> {
        let mut skipped = 0usize;
        let users: Vec<User> = raw
            .iter()
            .filter_map(|(key, value)| {
                let parsed = Uuid::parse_str(key)
                    .ok()
                    .zip(serde_json::from_value::<UserRecord>(value.clone()).ok());
                if parsed.is_none() {
                    skipped += 1;
                }
                parsed.map(|(id, rec)| User {
                    id,
                    username: rec.username,
                    password_hash: rec.password_hash,
                })
            })
            .collect();
        if skipped > 0 {
            warn!(skipped, "some invalid user records were ignored");
        }
        users
    }

    /// Find a user by exact (case-sensitive) username.
    pub async fn find_by_username(&self, username: &str) -> Option<User> {
        let raw = self.load_raw().await;
        Self::valid_users(&raw)
            .into_iter()
            .find(|u| u.username == username)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Option<User> {
        let raw = self.load_raw().await;
        Self::valid_users(&raw).into_iter().find(|u| u.id == id)
    }

    /// Create a new user with an already hashed password.
    pub async fn create(&self, username: &str, password_hash: &str) -> AppResult<User> {
        let _guard = self.lock.lock().await;
        let mut raw = self.load_raw().await;

        let existing = Self::valid_users(&raw);
        if existing.iter().any(|u| u.username == username) {
            return Err(AppError::Conflict(
                "Username already taken, please choose another username".into(),
            ));
        }

        let mut id = Uuid::new_v4();
        while raw.contains_key(&id.to_string()) {
            id = Uuid::new_v4();
        }
        let record = UserRecord {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        raw.insert(id.to_string(), serde_json::to_value(&record)?);
        save_json(self.storage.as_ref(), USERS_KEY, &raw).await?;

        info!(user_id = %id, username, "user record created");
        Ok(User {
            id,
            username: record.username,
            password_hash: record.password_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<MemoryStorage>, UserStore) {
        let mem = Arc::new(MemoryStorage::default());
        let store = UserStore::new(mem.clone());
        (mem, store)
    }

    #[tokio::test]
    async fn create_then_lookup_by_name_and_id() {
        let (_, store) = store();
        let user = store.create("alice_1", "hash").await.unwrap();
        let by_name = store.find_by_username("alice_1").await.unwrap();
        assert_eq!(by_name.id, user.id);
        let by_id = store.find_by_id(user.id).await.unwrap();
        assert_eq!(by_id.username, "alice_1");
    }

    #[tokio::test]
    async fn usernames_are_case_sensitive_and_unique() {
        let (_, store) = store();
        store.create("alice_1", "hash").await.unwrap();
        let err = store.create("alice_1", "other").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(store.create("Alice_1", "hash").await.is_ok());
        assert!(store.find_by_username("ALICE_1").await.is_none());
    }

    #[tokio::test]
    async fn malformed_records_are_skipped_but_preserved() {
        let (mem, store) = store();
        let good = Uuid::new_v4();
        mem.insert_raw(
            USERS_KEY,
            &format!(
                r#"{{"{good}": {{"username": "bob_22", "password_hash": "h"}},
                    "junk": "not a record",
                    "{}": {{"nickname": "no username"}}}}"#,
                Uuid::new_v4()
            ),
        )
        .await;

        assert_eq!(store.find_by_username("bob_22").await.unwrap().id, good);
        store.create("carol_3", "h").await.unwrap();

        let raw = store.load_raw().await;
        assert_eq!(raw.len(), 4);
        assert!(raw.contains_key("junk"));
    }

    #[tokio::test]
    async fn non_object_document_reads_as_empty() {
        let (mem, store) = store();
        mem.insert_raw(USERS_KEY, r#"["not", "a", "map"]"#).await;
        assert!(store.find_by_username("anyone").await.is_none());
    }
}
