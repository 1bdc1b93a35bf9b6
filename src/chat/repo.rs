use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::chat::dto::ChatTurn;
use crate::error::AppResult;
use crate::journal::repo::user_key;
use crate::storage::{self, load_json, save_json, StorageClient};

fn history_key(user_id: Uuid) -> String {
    user_key(user_id, "chat_history.json")
}

pub struct ChatHistoryStore {
    storage: Arc<dyn StorageClient>,
    lock: Mutex<()>,
}

impl ChatHistoryStore {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    pub async fn load(&self, user_id: Uuid) -> Vec<ChatTurn> {
        load_json(self.storage.as_ref(), &history_key(user_id)).await
    }

    pub async fn append(&self, user_id: Uuid, turn: ChatTurn) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut history = self.load(user_id).await;
        history.push(turn);
        save_json(self.storage.as_ref(), &history_key(user_id), &history).await
    }

    pub async fn clear(&self, user_id: Uuid) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        storage::delete(self.storage.as_ref(), &history_key(user_id)).await
    }
}
