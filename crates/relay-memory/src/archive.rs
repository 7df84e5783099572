//! Raw prompt archive.
//!
//! Layout: `<root>/<server>/<channel>/<author>_<HH-MM-SS>_<id>.txt`, one file
//! per inference cycle. Each channel directory keeps at most `retention`
//! files; the oldest (by modification time) are deleted first.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use relay_core::types::{Author, ChannelId, ChannelRef};

use crate::error::MemoryError;

pub struct PromptArchive {
    root: PathBuf,
    retention: usize,
    /// Directory each channel has archived into, for purging on eviction.
    channel_dirs: DashMap<ChannelId, PathBuf>,
}

impl PromptArchive {
    pub fn new(root: impl AsRef<Path>, retention: usize) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            retention,
            channel_dirs: DashMap::new(),
        }
    }

    /// Directory that holds a channel's artifacts.
    pub fn channel_dir(&self, channel: &ChannelRef) -> PathBuf {
        let channel_name = if channel.is_direct() {
            format!("dm_{}", channel.id)
        } else {
            channel
                .name
                .clone()
                .unwrap_or_else(|| channel.id.to_string())
        };
        self.root
            .join(sanitize_component(channel.server_label()))
            .join(sanitize_component(&channel_name))
    }

    /// Write `prompt` as a new artifact, then trim the channel directory.
    pub async fn archive(
        &self,
        prompt: &str,
        channel: &ChannelRef,
        author: &Author,
    ) -> Result<PathBuf, MemoryError> {
        let dir = self.channel_dir(channel);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| MemoryError::io(&dir, e))?;
        self.channel_dirs.insert(channel.id.clone(), dir.clone());

        let stamp = chrono::Local::now().format("%H-%M-%S");
        let unique = Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "{}_{}_{}.txt",
            sanitize_component(&author.username),
            stamp,
            &unique[..8]
        );
        let path = dir.join(file_name);
        tokio::fs::write(&path, prompt)
            .await
            .map_err(|e| MemoryError::io(&path, e))?;

        let removed = enforce_retention(&dir, self.retention).await?;
        if removed > 0 {
            debug!(dir = %dir.display(), removed, "trimmed prompt archive");
        }
        Ok(path)
    }

    /// Delete every artifact of a channel. Returns `false` if there was nothing to delete.
    pub async fn purge_channel(&self, channel_id: &ChannelId) -> Result<bool, MemoryError> {
        let Some((_, dir)) = self.channel_dirs.remove(channel_id) else {
            return Ok(false);
        };
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MemoryError::io(&dir, e)),
        }
    }
}

/// Keep the newest `keep` files in `dir`, delete the rest. Returns how many were deleted.
pub async fn enforce_retention(dir: &Path, keep: usize) -> Result<usize, MemoryError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| MemoryError::io(dir, e))?;

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| MemoryError::io(dir, e))?
    {
        let meta = match entry.metadata().await {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((modified, entry.path()));
    }

    if files.len() <= keep {
        return Ok(0);
    }

    files.sort();
    let excess = files.len() - keep;
    for (_, path) in files.iter().take(excess) {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| MemoryError::io(path, e))?;
    }
    Ok(excess)
}

/// Make a server, channel or user name safe to use as a single path component.
///
/// Path separators, reserved punctuation, control characters and whitespace
/// become `_`; leading dots are dropped so `..` can never escape the root.
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_start_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}
