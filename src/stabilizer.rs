//! Header stabilizers: strip volatile headers before a recording is written

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use hyper::header::{HeaderName, HeaderValue, DATE};
use hyper::HeaderMap;

use crate::message::HeaderList;
use crate::{Result, TapedeckError};

/// A transform over a response's headers, applied before persistence
pub type HeaderStabilizer = Arc<dyn Fn(&mut HeaderMap) + Send + Sync>;

/// Build a stabilizer that removes the named headers, ignoring case.
///
/// Names that are not valid header names can never be present; they are
/// skipped with a warning.
pub fn header_deleter<I, S>(names: I) -> HeaderStabilizer
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let names: Vec<HeaderName> = names
        .into_iter()
        .filter_map(|name| {
            let name = name.as_ref();
            match HeaderName::from_bytes(name.as_bytes()) {
                Ok(header) => Some(header),
                Err(_) => {
                    warn!("Ignoring invalid header name '{name}' in header deleter");
                    None
                }
            }
        })
        .collect();

    Arc::new(move |headers: &mut HeaderMap| {
        for name in &names {
            headers.remove(name);
        }
    })
}

/// The stabilizer every rule gets unless it opts out: drops `Date`
pub fn date_stabilizer() -> HeaderStabilizer {
    header_deleter([DATE.as_str()])
}

/// Ordered stabilizers for one recording
#[derive(Clone, Default)]
pub struct StabilizerPipeline {
    stabilizers: Vec<HeaderStabilizer>,
}

impl StabilizerPipeline {
    /// Concatenate stabilizer lists in application order
    #[must_use]
    pub fn new<'a, I>(lists: I) -> Self
    where
        I: IntoIterator<Item = &'a [HeaderStabilizer]>,
    {
        Self {
            stabilizers: lists.into_iter().flatten().cloned().collect(),
        }
    }

    /// Number of transforms in the pipeline
    #[must_use]
    pub fn len(&self) -> usize {
        self.stabilizers.len()
    }

    /// Whether the pipeline has no transforms
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stabilizers.is_empty()
    }

    /// Apply every transform in order and flatten the result for persistence.
    ///
    /// Output is sorted by lowercase name; repeated values are joined with
    /// `", "`; each name keeps the last spelling seen in the live response.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedHeader` if a name or value cannot be carried as a
    /// header string
    pub fn stabilize(&self, raw: &[(String, Vec<u8>)]) -> Result<HeaderList> {
        let mut headers = HeaderMap::with_capacity(raw.len());
        let mut spelling: HashMap<HeaderName, &str> = HashMap::with_capacity(raw.len());

        for (name, value) in raw {
            let key = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TapedeckError::UnsupportedHeader(name.clone()))?;
            let value = HeaderValue::from_bytes(value)
                .map_err(|_| TapedeckError::UnsupportedHeader(name.clone()))?;
            spelling.insert(key.clone(), name.as_str());
            headers.append(key, value);
        }

        for stabilizer in &self.stabilizers {
            stabilizer(&mut headers);
        }

        let mut names: Vec<&HeaderName> = headers.keys().collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        let mut stable = HeaderList::new();
        for name in names {
            let values = headers
                .get_all(name)
                .iter()
                .map(HeaderValue::to_str)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| TapedeckError::UnsupportedHeader(name.to_string()))?;
            let display = spelling
                .get(name)
                .map_or_else(|| name.as_str().to_string(), |s| (*s).to_string());
            stable.insert(display, values.join(", "));
        }

        Ok(stable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> Vec<(String, Vec<u8>)> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn test_date_stabilizer_removes_date() {
        let pipeline = StabilizerPipeline::new([[date_stabilizer()].as_slice()]);
        let stable = pipeline
            .stabilize(&raw(&[
                ("Content-Type", "application/json"),
                ("Date", "Fri, 16 Oct 2026 10:00:00 GMT"),
            ]))
            .unwrap();

        assert!(!stable.contains("date"));
        assert_eq!(stable.get("content-type"), Some("application/json"));
    }

    #[test]
    fn test_header_deleter_ignores_case() {
        let pipeline = StabilizerPipeline::new([[header_deleter(["onlyinlive"])].as_slice()]);
        let stable = pipeline
            .stabilize(&raw(&[("OnlyInLive", "I'm here!"), ("X-Keep", "1")]))
            .unwrap();

        assert!(!stable.contains("OnlyInLive"));
        assert!(stable.contains("X-Keep"));
    }

    #[test]
    fn test_header_deleter_skips_invalid_names() {
        let pipeline =
            StabilizerPipeline::new([[header_deleter(["bad header", "x-drop"])].as_slice()]);
        let stable = pipeline
            .stabilize(&raw(&[("X-Drop", "1"), ("X-Keep", "2")]))
            .unwrap();

        assert!(!stable.contains("x-drop"));
        assert_eq!(stable.get("x-keep"), Some("2"));
    }

    #[test]
    fn test_preserves_case_and_sorts() {
        let pipeline = StabilizerPipeline::default();
        let stable = pipeline
            .stabilize(&raw(&[("X-Zeta", "z"), ("content-length", "5"), ("Accept-Ranges", "bytes")]))
            .unwrap();

        let names: Vec<&str> = stable.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Accept-Ranges", "content-length", "X-Zeta"]);
    }

    #[test]
    fn test_joins_repeated_values() {
        let pipeline = StabilizerPipeline::default();
        let stable = pipeline
            .stabilize(&raw(&[("Vary", "Accept"), ("vary", "Origin")]))
            .unwrap();

        assert_eq!(stable.len(), 1);
        assert_eq!(stable.get("Vary"), Some("Accept, Origin"));
    }

    #[test]
    fn test_order_top_level_then_rule() {
        let top: HeaderStabilizer = Arc::new(|headers: &mut HeaderMap| {
            headers.insert("x-stage", HeaderValue::from_static("top"));
        });
        let rule: HeaderStabilizer = Arc::new(|headers: &mut HeaderMap| {
            let seen = headers
                .get("x-stage")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("none")
                .to_string();
            headers.insert("x-stage", HeaderValue::from_str(&format!("{seen}+rule")).unwrap());
        });

        let pipeline = StabilizerPipeline::new([[top].as_slice(), [rule].as_slice()]);
        let stable = pipeline.stabilize(&[]).unwrap();

        assert_eq!(pipeline.len(), 2);
        assert_eq!(stable.get("x-stage"), Some("top+rule"));
    }

    #[test]
    fn test_invalid_name_is_unsupported() {
        let pipeline = StabilizerPipeline::default();
        let result = pipeline.stabilize(&raw(&[("bad header", "x")]));

        assert!(matches!(result, Err(TapedeckError::UnsupportedHeader(_))));
    }

    #[test]
    fn test_opaque_value_is_unsupported() {
        let pipeline = StabilizerPipeline::default();
        let result = pipeline.stabilize(&[("X-Bin".to_string(), vec![b'a', 0xff])]);

        assert!(matches!(result, Err(TapedeckError::UnsupportedHeader(_))));
    }
}
