//! Recording lookup

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use super::format::{Meta, RecordingEntry, META_FILE};
use super::RecordingStore;
use crate::fingerprint::Digest;
use crate::{Result, TapedeckError};

/// Outcome of looking a digest up in a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Complete recording
    Found(RecordingEntry),
    /// Directory exists but its meta file does not: partial or stale entry
    Claimed(PathBuf),
    /// No directory for the digest
    NotFound,
}

impl RecordingStore {
    /// Find the recording for a digest anywhere under the storage root.
    ///
    /// A missing storage root is an empty store. When several directories
    /// carry the digest, a complete one wins over stale ones.
    ///
    /// # Errors
    ///
    /// Returns error on I/O failure or when `meta.json` exists but does not parse
    pub async fn lookup(&self, digest: &Digest) -> Result<Lookup> {
        let dirs = find_dirs(&self.root, &digest.to_hex()).await?;
        if dirs.is_empty() {
            debug!("No recording directory for {}", digest.short());
            return Ok(Lookup::NotFound);
        }

        let mut claimed = None;
        for dir in dirs {
            let meta_path = dir.join(META_FILE);
            let text = match fs::read_to_string(&meta_path).await {
                Ok(text) => text,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    claimed.get_or_insert(dir);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let meta: Meta =
                serde_json::from_str(&text).map_err(|e| TapedeckError::MalformedRecording {
                    path: meta_path.clone(),
                    reason: e.to_string(),
                })?;

            return Ok(Lookup::Found(RecordingEntry::new(dir, meta)));
        }

        Ok(claimed.map_or(Lookup::NotFound, Lookup::Claimed))
    }
}

/// Every directory under `root` with an exact name, depth first
async fn find_dirs(root: &Path, name: &str) -> Result<Vec<PathBuf>> {
    let mut pending = vec![root.to_path_buf()];
    let mut found = Vec::new();

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let path = entry.path();
            if entry.file_name().to_str() == Some(name) {
                found.push(path);
            } else {
                pending.push(path);
            }
        }
    }

    Ok(found)
}
