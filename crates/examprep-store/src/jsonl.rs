//! Append-only JSON-lines attempt store.
//!
//! Each line holds one serialized [`AttemptRecord`]. Lines are never
//! rewritten, so a file doubles as an audit log of every submission.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use examprep_core::model::AttemptRecord;
use examprep_core::traits::AttemptStore;

use crate::error::StoreError;

/// Stores records in a single `.jsonl` file.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Every record in the file, in insertion order. A missing file is empty.
    pub async fn read_all(&self) -> Result<Vec<AttemptRecord>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut records = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str::<AttemptRecord>(line).map_err(|e| {
                tracing::warn!(path = %self.path.display(), line = i + 1, "corrupt attempt record");
                StoreError::Corrupt {
                    path: self.path.clone(),
                    line: i + 1,
                    message: e.to_string(),
                }
            })?;
            records.push(record);
        }
        Ok(records)
    }

    async fn write_line(&self, record: &AttemptRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

#[async_trait]
impl AttemptStore for JsonlStore {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn append(&self, record: &AttemptRecord) -> anyhow::Result<()> {
        self.write_line(record).await?;
        tracing::debug!(path = %self.path.display(), id = %record.id, "appended attempt");
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> anyhow::Result<Vec<AttemptRecord>> {
        let records = self.read_all().await?;
        Ok(records.into_iter().filter(|r| r.user_id == user_id).collect())
    }
}
