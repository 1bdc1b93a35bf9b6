use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// Flat key/value document store. Keys are `/`-separated relative paths.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn get_object(&self, key: &str) -> anyhow::Result<Option<Bytes>>;
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
}

/// Documents stored as plain files under a data directory.
#[derive(Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |p, part| p.join(part))
    }
}

#[async_trait]
impl StorageClient for FsStorage {
    async fn get_object(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
        }
    }

    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
        // Write next to the target and rename so readers never see a torn file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("rename into {}", path.display()))?;
        debug!(key, bytes = body.len(), "object written");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("delete {}", path.display())),
        }
    }
}

/// Read a JSON document. A missing one is `None`; an unreadable or corrupt
/// one is a `Persistence` error.
pub async fn read_json<T>(storage: &dyn StorageClient, key: &str) -> AppResult<Option<T>>
where
    T: DeserializeOwned,
{
    let body = match storage.get_object(key).await {
        Ok(Some(body)) => body,
        Ok(None) => return Ok(None),
        Err(e) => {
            return Err(AppError::Persistence(format!("unreadable record {}: {:#}", key, e)))
        }
    };
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| AppError::Persistence(format!("corrupt record {}: {}", key, e)))
}

/// Load a JSON document, treating a missing, unreadable or corrupt one as empty.
pub async fn load_json<T>(storage: &dyn StorageClient, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match read_json(storage, key).await {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, key, "treating record as empty");
            T::default()
        }
    }
}

pub async fn save_json<T>(storage: &dyn StorageClient, key: &str, value: &T) -> AppResult<()>
where
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec_pretty(value)?;
    storage
        .put_object(key, Bytes::from(body))
        .await
        .map_err(|e| AppError::Persistence(format!("{:#}", e)))
}

pub async fn delete(storage: &dyn StorageClient, key: &str) -> AppResult<()> {
    storage
        .delete_object(key)
        .await
        .map_err(|e| AppError::Persistence(format!("{:#}", e)))
}

#[cfg(test)]
pub use memory::MemoryStorage;
