//! Request URL resolution

use hyper::Uri;

use crate::{Result, TapedeckError};

/// Origin used when neither the URL nor a base supplies one
pub const DEFAULT_ORIGIN: &str = "http://localhost";

/// Resolve a request URL against an optional base and append query parameters.
///
/// Absolute URLs are used as given; protocol-relative ones (`//host/path`)
/// take the base's scheme, or `http`. Relative URLs are joined onto the base
/// with exactly one `/` between them; without a base they resolve against
/// [`DEFAULT_ORIGIN`].
///
/// # Errors
///
/// Returns `InvalidUrl` if the result does not parse
pub fn resolve_url(base: Option<&str>, url: Option<&str>, params: &[(String, String)]) -> Result<Uri> {
    let url = url.unwrap_or("");

    let mut resolved = if is_absolute(url) {
        url.to_string()
    } else if url.starts_with("//") {
        let scheme = base
            .and_then(|b| b.split_once("://"))
            .map_or("http", |(scheme, _)| scheme);
        format!("{scheme}:{url}")
    } else {
        let base = base.filter(|b| !b.is_empty()).unwrap_or(DEFAULT_ORIGIN);
        combine(base, url)
    };

    if !params.is_empty() {
        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let (without_fragment, _) = resolved.split_once('#').unwrap_or((resolved.as_str(), ""));
        let mut joined = without_fragment.to_string();
        if !joined.contains('?') && authority_only(&joined) {
            joined.push('/');
        }
        joined.push(if joined.contains('?') { '&' } else { '?' });
        joined.push_str(&query);
        resolved = joined;
    }

    resolved.parse::<Uri>().map_err(|e| TapedeckError::InvalidUrl {
        url: resolved.clone(),
        reason: e.to_string(),
    })
}

fn is_absolute(url: &str) -> bool {
    url.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// `scheme://host[:port]` with no path
fn authority_only(url: &str) -> bool {
    url.split_once("://")
        .is_some_and(|(_, rest)| !rest.contains('/'))
}

fn combine(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}
