//! Serving a recording in place of a live call

use chrono::{DateTime, Utc};
use hyper::header::DATE;
use tracing::debug;

use crate::body::{self, ResponseType};
use crate::message::{HeaderList, Response};
use crate::storage::RecordingEntry;
use crate::Result;

/// Format a timestamp as an HTTP date (IMF-fixdate)
#[must_use]
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Add a `Date` header for the current time unless one was recorded
pub fn inject_date(headers: &mut HeaderList) {
    if !headers.contains(DATE.as_str()) {
        headers.insert("Date", http_date(Utc::now()));
    }
}

/// Read a recording back as a response in the requested representation
///
/// # Errors
///
/// Returns error if the body artifact cannot be read
pub async fn replay(entry: &RecordingEntry, response_type: ResponseType) -> Result<Response> {
    let body = body::read_body(&entry.content_path(), response_type).await?;

    let mut headers = entry.headers().clone();
    inject_date(&mut headers);

    debug!(
        "Replayed {} (status {}, {:?})",
        entry.dir().display(),
        entry.status(),
        response_type
    );

    Ok(Response::replayed(entry.status(), headers, body))
}
