//! Directory layout derived from request URLs

use std::path::PathBuf;

use hyper::Uri;

use crate::fingerprint::Digest;

use super::RecordingStore;

/// Split a URL path into directory segments.
///
/// Empty segments are dropped and dot segments are resolved, so a recording
/// never lands outside its storage root.
#[must_use]
pub fn path_segments(url: &Uri) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    for segment in url.path().split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }
    segments
}

impl RecordingStore {
    /// Directory a recording for `digest` is written to
    #[must_use]
    pub fn entry_dir(&self, segments: &[String], digest: &Digest) -> PathBuf {
        let mut dir = self.root.clone();
        dir.extend(segments);
        dir.push(digest.to_hex());
        dir
    }
}
