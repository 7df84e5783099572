use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::warn;

use crate::error::MemoryError;
use crate::types::TranscriptRecord;

/// Append-only transcript stored as one pretty-printed JSON array.
///
/// Each append rewrites the whole document. Appends from concurrent cycles
/// are serialized through `write_lock` so no record is lost.
pub struct TranscriptLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TranscriptLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record` and return the new number of records.
    pub async fn append(&self, record: TranscriptRecord) -> Result<usize, MemoryError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.read_all().await?;
        records.push(record);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| MemoryError::io(parent, e))?;
            }
        }

        let json = serde_json::to_string_pretty(&records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| MemoryError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| MemoryError::io(&self.path, e))?;

        Ok(records.len())
    }

    /// Load every record. A missing, empty or malformed file reads as empty.
    pub async fn read_all(&self) -> Result<Vec<TranscriptRecord>, MemoryError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MemoryError::io(&self.path, e)),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<TranscriptRecord>>(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "transcript log unreadable, starting fresh");
                Ok(Vec::new())
            }
        }
    }
}
