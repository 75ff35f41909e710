//! On-disk recording store
//!
//! Layout: `<root>/<url path segments...>/<digest hex>/` holding `meta.json`
//! (status and stabilized headers) and `response.content` (the raw body).
//! `meta.json` is always written last; its presence marks a complete entry.

mod format;
mod layout;
mod reader;
mod writer;

use std::path::{Path, PathBuf};

pub use format::{Meta, RecordingEntry, CONTENT_FILE, META_FILE, META_PARTIAL_FILE};
pub use layout::path_segments;
pub use reader::Lookup;

/// Recording store rooted at a rule's storage directory
#[derive(Debug, Clone)]
pub struct RecordingStore {
    root: PathBuf,
}

impl RecordingStore {
    /// Create a store over a storage root; nothing is touched on disk
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}
