//! Recording persistence

use tokio::fs;
use tracing::info;

use super::format::{Meta, RecordingEntry, CONTENT_FILE, META_FILE, META_PARTIAL_FILE};
use super::RecordingStore;
use crate::body::{self, Body};
use crate::fingerprint::Digest;
use crate::message::HeaderList;
use crate::Result;

impl RecordingStore {
    /// Persist a recording under `<root>/<segments...>/<digest>/`.
    ///
    /// The body is written first and `meta.json` last (via rename), so a
    /// concurrent lookup never sees meta without content. Returns the entry
    /// and the body to hand back to the caller.
    ///
    /// # Errors
    ///
    /// Returns error if any directory or file cannot be written
    pub async fn persist(
        &self,
        segments: &[String],
        digest: &Digest,
        status: u16,
        headers: HeaderList,
        body: Body,
    ) -> Result<(RecordingEntry, Body)> {
        let dir = self.entry_dir(segments, digest);
        fs::create_dir_all(&dir).await?;

        let body = body::write_body(&dir.join(CONTENT_FILE), body).await?;

        let meta = Meta { status, headers };
        let partial = dir.join(META_PARTIAL_FILE);
        fs::write(&partial, meta.to_json()?).await?;
        fs::rename(&partial, dir.join(META_FILE)).await?;

        info!(
            "Recorded {} ({} headers, status {}) at {}",
            digest.short(),
            meta.headers.len(),
            status,
            dir.display()
        );

        Ok((RecordingEntry::new(dir, meta), body))
    }
}
