//! Key digests for content-addressed recordings

use std::fmt;

use blake2::digest::consts::U20;
use blake2::{Blake2b, Digest as _};
use serde_json::{Map, Value};

use crate::Result;

/// Digest width in bytes (160 bits)
pub const DIGEST_LEN: usize = 20;

type Blake2b160 = Blake2b<U20>;

/// Content address of a key object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Raw digest bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex form, used as the recording directory name
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short prefix for log lines
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Rebuild a key object with every map's keys in sorted order.
///
/// `serde_json` keeps insertion order when its `preserve_order` feature is
/// enabled anywhere in the dependency graph, so ordering is enforced here
/// rather than assumed.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let canonical: Map<String, Value> = entries
                .into_iter()
                .map(|(key, value)| (key.clone(), canonicalize(value)))
                .collect();
            Value::Object(canonical)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Canonical text of a key object: sorted keys, two-space indentation.
///
/// # Errors
///
/// Returns error if the value cannot be serialized
pub fn canonical_text(key: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(&canonicalize(key))?)
}

/// Compute the 160-bit BLAKE2b digest of a key object's canonical text
///
/// # Errors
///
/// Returns error if the value cannot be serialized
pub fn digest(key: &Value) -> Result<Digest> {
    let text = canonical_text(key)?;

    let mut hasher = Blake2b160::new();
    hasher.update(text.as_bytes());

    Ok(Digest(hasher.finalize().into()))
}
