//! Matcher pipeline: ordered rules that turn requests into key objects

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use tracing::debug;

use crate::fingerprint::{self, Digest};
use crate::message::Request;
use crate::stabilizer::HeaderStabilizer;
use crate::Result;

/// Future returned by a key maker
pub type KeyFuture<'a> = BoxFuture<'a, Result<Option<Value>>>;

/// Derives a request's key object, or `None` when the rule does not apply
pub trait KeyMaker: Send + Sync {
    /// Compute the key for a request
    fn make_key<'a>(&'a self, request: &'a Request) -> KeyFuture<'a>;
}

struct SyncKeyMaker<F>(F);

impl<F> KeyMaker for SyncKeyMaker<F>
where
    F: Fn(&Request) -> Option<Value> + Send + Sync,
{
    fn make_key<'a>(&'a self, request: &'a Request) -> KeyFuture<'a> {
        future::ready(Ok((self.0)(request))).boxed()
    }
}

struct AsyncKeyMaker<F>(F);

impl<F, Fut> KeyMaker for AsyncKeyMaker<F>
where
    F: Fn(&Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
{
    fn make_key<'a>(&'a self, request: &'a Request) -> KeyFuture<'a> {
        (self.0)(request).boxed()
    }
}

/// A matcher with its storage root and header stabilizers
pub struct Rule {
    key_maker: Box<dyn KeyMaker>,
    storage_root: PathBuf,
    stabilizers: Vec<HeaderStabilizer>,
    default_stabilizer: bool,
}

impl Rule {
    /// Rule with a synchronous key function
    pub fn new<F>(storage_root: impl Into<PathBuf>, key_maker: F) -> Self
    where
        F: Fn(&Request) -> Option<Value> + Send + Sync + 'static,
    {
        Self::with_key_maker(storage_root, SyncKeyMaker(key_maker))
    }

    /// Rule with an asynchronous key function.
    ///
    /// The returned future cannot borrow the request; copy what it needs.
    pub fn new_async<F, Fut>(storage_root: impl Into<PathBuf>, key_maker: F) -> Self
    where
        F: Fn(&Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        Self::with_key_maker(storage_root, AsyncKeyMaker(key_maker))
    }

    /// Rule with a custom [`KeyMaker`]
    pub fn with_key_maker(
        storage_root: impl Into<PathBuf>,
        key_maker: impl KeyMaker + 'static,
    ) -> Self {
        Self {
            key_maker: Box::new(key_maker),
            storage_root: storage_root.into(),
            stabilizers: Vec::new(),
            default_stabilizer: true,
        }
    }

    /// Append a rule-specific stabilizer
    #[must_use]
    pub fn with_stabilizer(mut self, stabilizer: HeaderStabilizer) -> Self {
        self.stabilizers.push(stabilizer);
        self
    }

    /// Keep `Date` in this rule's recordings
    #[must_use]
    pub fn without_default_stabilizer(mut self) -> Self {
        self.default_stabilizer = false;
        self
    }

    /// Directory this rule's recordings live under
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Rule-specific stabilizers, in order
    pub fn stabilizers(&self) -> &[HeaderStabilizer] {
        &self.stabilizers
    }

    /// Whether the default `Date` stabilizer applies
    pub fn uses_default_stabilizer(&self) -> bool {
        self.default_stabilizer
    }

    /// Evaluate the key function
    ///
    /// # Errors
    ///
    /// Returns whatever error the key function produced
    pub async fn make_key(&self, request: &Request) -> Result<Option<Value>> {
        self.key_maker.make_key(request).await
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("storage_root", &self.storage_root)
            .field("stabilizers", &self.stabilizers.len())
            .field("default_stabilizer", &self.default_stabilizer)
            .finish_non_exhaustive()
    }
}

/// The first rule that produced a key, and the key's digest
#[derive(Debug, Clone)]
pub struct Matched {
    /// Matching rule
    pub rule: Arc<Rule>,
    /// Digest of the rule's key object
    pub digest: Digest,
}

/// Ordered rule list
#[derive(Debug, Default)]
pub struct MatcherPipeline {
    rules: Vec<Arc<Rule>>,
}

impl MatcherPipeline {
    /// Build a pipeline; rules are evaluated in the given order
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: rules.into_iter().map(Arc::new).collect(),
        }
    }

    /// Number of configured rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Find the first rule producing a key and digest it.
    ///
    /// `None` means the request bypasses recording entirely.
    ///
    /// # Errors
    ///
    /// Returns error if a key function fails; later rules are not consulted
    pub async fn evaluate(&self, request: &Request) -> Result<Option<Matched>> {
        for (index, rule) in self.rules.iter().enumerate() {
            let Some(key) = rule.make_key(request).await? else {
                continue;
            };

            let digest = fingerprint::digest(&key)?;
            debug!(
                "Rule {} matched {} {} -> {}",
                index,
                request.method,
                request.path().unwrap_or("<unresolved>"),
                digest.short()
            );

            return Ok(Some(Matched {
                rule: Arc::clone(rule),
                digest,
            }));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TapedeckError;
    use hyper::Method;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(url: &str) -> Request {
        Request::new(Method::GET, url.parse().unwrap())
    }

    fn path_rule(root: &str) -> Rule {
        Rule::new(root, |req: &Request| req.path().map(|path| json!({"path": path})))
    }

    #[tokio::test]
    async fn test_no_rules_bypasses() {
        let pipeline = MatcherPipeline::new(vec![]);
        assert!(pipeline.evaluate(&request("http://localhost/ping")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_all_null_bypasses() {
        let pipeline = MatcherPipeline::new(vec![Rule::new("a", |_: &Request| None)]);
        assert!(pipeline.evaluate(&request("http://localhost/ping")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pipeline = MatcherPipeline::new(vec![
            Rule::new("skipped", |_: &Request| None),
            path_rule("first"),
            Rule::new("never", move |_: &Request| {
                counter.fetch_add(1, Ordering::SeqCst);
                Some(json!({}))
            }),
        ]);

        let matched = pipeline
            .evaluate(&request("http://localhost/ping"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(matched.rule.storage_root(), Path::new("first"));
        assert_eq!(matched.digest, fingerprint::digest(&json!({"path": "/ping"})).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0, "later rules must not run");
    }

    #[tokio::test]
    async fn test_async_key_maker() {
        let pipeline = MatcherPipeline::new(vec![Rule::new_async("async", |req: &Request| {
            let method = req.method.to_string();
            async move {
                tokio::task::yield_now().await;
                Ok::<_, TapedeckError>(Some(json!({"method": method})))
            }
        })]);

        let matched = pipeline
            .evaluate(&request("http://localhost/"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(matched.digest, fingerprint::digest(&json!({"method": "GET"})).unwrap());
    }

    #[tokio::test]
    async fn test_key_maker_error_is_fatal() {
        let pipeline = MatcherPipeline::new(vec![
            Rule::new_async("failing", |_: &Request| async {
                Err::<Option<serde_json::Value>, _>(TapedeckError::KeyMaker(
                    "lookup failed".to_string(),
                ))
            }),
            path_rule("fallback"),
        ]);

        let result = pipeline.evaluate(&request("http://localhost/ping")).await;
        assert!(matches!(result, Err(TapedeckError::KeyMaker(_))));
    }

    #[test]
    fn test_rule_builders() {
        let rule = path_rule("root")
            .with_stabilizer(crate::stabilizer::header_deleter(["x-request-id"]))
            .without_default_stabilizer();

        assert_eq!(rule.stabilizers().len(), 1);
        assert!(!rule.uses_default_stabilizer());
        assert!(format!("{rule:?}").contains("root"));
    }
}
