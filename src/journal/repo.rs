use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;
use uuid::Uuid;

use crate::error::AppResult;
use crate::journal::repo_types::JournalEntry;
use crate::storage::{load_json, read_json, save_json, StorageClient};

const ACTIVE: &str = "metadata.json";
const TRASH: &str = "trash.json";

pub fn user_key(user_id: Uuid, name: &str) -> String {
    format!("journal_entries/{}/{}", user_id, name)
}

/// Per-user active and trashed entries, kept as two parallel documents.
pub struct EntryStore {
    storage: Arc<dyn StorageClient>,
    lock: Mutex<()>,
}

impl EntryStore {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    /// Held across a load-modify-save sequence.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    async fn load(&self, key: &str) -> Vec<JournalEntry> {
        let raw: Vec<Value> = load_json(self.storage.as_ref(), key).await;
        let total = raw.len();
        let entries: Vec<JournalEntry> = raw
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();
        if entries.len() != total {
            warn!(key, skipped = total - entries.len(), "malformed entries ignored");
        }
        entries
    }

    /// The document to write for `key`: `entries` followed by every stored
    /// record that does not parse as an entry, untouched. A stored document
    /// that cannot be read is never replaced.
    async fn document(&self, key: &str, entries: &[JournalEntry]) -> AppResult<Vec<Value>> {
        let stored: Vec<Value> = read_json(self.storage.as_ref(), key)
            .await?
            .unwrap_or_default();
        let mut doc = entries
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        doc.extend(
            stored
                .into_iter()
                .filter(|v| JournalEntry::deserialize(v).is_err()),
        );
        Ok(doc)
    }

    async fn save(&self, key: &str, entries: &[JournalEntry]) -> AppResult<()> {
        let doc = self.document(key, entries).await?;
        save_json(self.storage.as_ref(), key, &doc).await
    }

    pub async fn load_active(&self, user_id: Uuid) -> Vec<JournalEntry> {
        self.load(&user_key(user_id, ACTIVE)).await
    }

    pub async fn load_trash(&self, user_id: Uuid) -> Vec<JournalEntry> {
        self.load(&user_key(user_id, TRASH)).await
    }

    pub async fn save_active(&self, user_id: Uuid, entries: &[JournalEntry]) -> AppResult<()> {
        self.save(&user_key(user_id, ACTIVE), entries).await
    }

    pub async fn save_trash(&self, user_id: Uuid, entries: &[JournalEntry]) -> AppResult<()> {
        self.save(&user_key(user_id, TRASH), entries).await
    }

    /// Rewrite both collections after a move. Both documents are checked
    /// before either is written, and trash goes first so a failure between
    /// the writes can duplicate an entry but never lose it.
    pub async fn save_both(
        &self,
        user_id: Uuid,
        active: &[JournalEntry],
        trash: &[JournalEntry],
    ) -> AppResult<()> {
        let (active_key, trash_key) = (user_key(user_id, ACTIVE), user_key(user_id, TRASH));
        let trash_doc = self.document(&trash_key, trash).await?;
        let active_doc = self.document(&active_key, active).await?;
        save_json(self.storage.as_ref(), &trash_key, &trash_doc).await?;
        save_json(self.storage.as_ref(), &active_key, &active_doc).await
    }
}
