//! Persisted recording format

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::message::HeaderList;

/// Status and headers file
pub const META_FILE: &str = "meta.json";

/// Raw body file
pub const CONTENT_FILE: &str = "response.content";

/// Meta file while it is being written; renamed into place when complete
pub const META_PARTIAL_FILE: &str = "meta.json.partial";

/// Contents of `meta.json`
///
/// Field order is part of the format: `status` then `headers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// HTTP status code
    pub status: u16,
    /// Stabilized response headers
    pub headers: HeaderList,
}

impl Meta {
    /// Pretty-printed JSON as written to disk
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A complete recording found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingEntry {
    dir: PathBuf,
    meta: Meta,
}

impl RecordingEntry {
    pub(crate) fn new(dir: PathBuf, meta: Meta) -> Self {
        Self { dir, meta }
    }

    /// Entry directory (named after the digest)
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the body artifact
    #[must_use]
    pub fn content_path(&self) -> PathBuf {
        self.dir.join(CONTENT_FILE)
    }

    /// Recorded status code
    #[must_use]
    pub fn status(&self) -> u16 {
        self.meta.status
    }

    /// Recorded (stabilized) headers
    #[must_use]
    pub fn headers(&self) -> &HeaderList {
        &self.meta.headers
    }
}
