//! Request and response types exchanged with the HTTP collaborator

use std::fmt;

use bytes::Bytes;
use hyper::{HeaderMap, Method, StatusCode, Uri};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::body::Body;

/// Outgoing request as seen by the matcher pipeline
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Fully resolved URL, if the collaborator could resolve one
    pub url: Option<Uri>,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
}

impl Request {
    /// Create a body-less request for a resolved URL
    #[must_use]
    pub fn new(method: Method, url: Uri) -> Self {
        Self {
            method,
            url: Some(url),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// URL path of the resolved request
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.url.as_ref().map(Uri::path)
    }
}

/// Ordered, case-preserving header list with case-insensitive lookup
///
/// Serializes as a JSON object in list order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList(Vec<(String, String)>);

impl HeaderList {
    /// Create an empty list
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Lossy conversion from raw header bytes
    #[must_use]
    pub fn from_raw(raw: &[(String, Vec<u8>)]) -> Self {
        Self(
            raw.iter()
                .map(|(name, value)| (name.clone(), String::from_utf8_lossy(value).into_owned()))
                .collect(),
        )
    }

    /// Look up a header value, ignoring name case
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Check for a header, ignoring name case
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Append a header, replacing an entry with the exact same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    /// Iterate over `(name, value)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of headers
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for HeaderList {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut list = Self::new();
        for (name, value) in iter {
            list.insert(name, value);
        }
        list
    }
}

impl Serialize for HeaderList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HeaderList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeaderListVisitor;

        impl<'de> Visitor<'de> for HeaderListVisitor {
            type Value = HeaderList;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<HeaderList, A::Error> {
                let mut list = HeaderList::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    list.insert(name, value);
                }
                Ok(list)
            }
        }

        deserializer.deserialize_map(HeaderListVisitor)
    }
}

/// Response produced by a live dispatch, before any stabilization
pub struct LiveResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response headers with their original name casing
    pub headers: Vec<(String, Vec<u8>)>,
    /// Response body in the representation the caller asked for
    pub body: Body,
}

impl fmt::Debug for LiveResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveResponse")
            .field("status", &self.status)
            .field("headers", &self.headers.len())
            .field("body", &self.body)
            .finish()
    }
}

/// Response handed back to the caller, live or replayed
#[derive(Debug)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Canonical reason phrase for the status
    pub status_text: String,
    /// Response headers
    pub headers: HeaderList,
    /// Response body
    pub body: Body,
    /// Whether the response was served from a recording
    pub replayed: bool,
}

impl Response {
    /// Wrap a live response, keeping its headers unstabilized
    #[must_use]
    pub fn live(status: u16, headers: HeaderList, body: Body) -> Self {
        Self {
            status,
            status_text: status_text(status).to_string(),
            headers,
            body,
            replayed: false,
        }
    }

    /// Wrap a response served from disk
    #[must_use]
    pub fn replayed(status: u16, headers: HeaderList, body: Body) -> Self {
        Self {
            status,
            status_text: status_text(status).to_string(),
            headers,
            body,
            replayed: true,
        }
    }
}

impl From<LiveResponse> for Response {
    fn from(live: LiveResponse) -> Self {
        Self::live(live.status, HeaderList::from_raw(&live.headers), live.body)
    }
}

/// Canonical reason phrase, `"Unknown"` for unregistered codes
#[must_use]
pub fn status_text(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown")
}
