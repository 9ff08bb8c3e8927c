use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::StoreError;
use crate::monitoring::types::CheckSpec;

/// Storage the worker reads checks from and writes outcomes to
#[async_trait]
pub trait CheckStore: Send + Sync {
    /// Ids of every stored check
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Raw record for `id`, `None` if there is no such check.
    ///
    /// The record is returned unvalidated; see `monitoring::validation`.
    async fn read(&self, id: &str) -> Result<Option<Value>, StoreError>;

    /// Overwrite an existing record. Never creates one.
    async fn update(&self, id: &str, check: &CheckSpec) -> Result<(), StoreError>;
}

/// One `<id>.json` file per check in a single directory
pub struct FileCheckStore {
    dir: PathBuf,
    // Serializes writes so overlapping updates never interleave inside a file
    write_lock: Mutex<()>,
}

impl FileCheckStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), write_lock: Mutex::new(()) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

#[async_trait]
impl CheckStore for FileCheckStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let list_err = |source| StoreError::List { dir: self.dir.clone(), source };

        let mut entries = fs::read_dir(&self.dir).await.map_err(list_err)?;
        let mut ids = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if !entry.file_type().await.map_err(list_err)?.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(stem.to_string());
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn read(&self, id: &str) -> Result<Option<Value>, StoreError> {
        let path = self.record_path(id)?;

        match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| StoreError::Parse { id: id.to_string(), source }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { id: id.to_string(), source }),
        }
    }

    async fn update(&self, id: &str, check: &CheckSpec) -> Result<(), StoreError> {
        let path = self.record_path(id)?;
        let write_err = |source| StoreError::Write { id: id.to_string(), source };

        let data = serde_json::to_vec(check)
            .map_err(|source| StoreError::Serialize { id: id.to_string(), source })?;

        let _write = self.write_lock.lock().await;

        // No `create`: opening fails if the record was deleted in the meantime
        let mut file = match OpenOptions::new().write(true).truncate(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(source) => return Err(write_err(source)),
        };

        file.write_all(&data).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)
    }
}
