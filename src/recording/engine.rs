//! Recorder: the pre/post dispatch hooks consumed by an HTTP client

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{ClientConfig, Settings};
use crate::fingerprint::Digest;
use crate::matcher::{MatcherPipeline, Rule};
use crate::message::{HeaderList, LiveResponse, Request, Response};
use crate::stabilizer::{self, HeaderStabilizer, StabilizerPipeline};
use crate::storage::{self, Lookup, RecordingEntry, RecordingStore};
use crate::Result;

use super::coordinator::{self, Claim, Coordinator, RecordingGuard};

/// What the client should do with a request
#[derive(Debug)]
pub enum Decision {
    /// Dispatch live; nothing is read or written
    Bypass,
    /// Serve this recording instead of dispatching
    Replay(RecordingEntry),
    /// Dispatch live, then hand the response to [`Recorder::post_dispatch`]
    RecordAfter(RecordTicket),
}

/// The recorder role for one digest, carried from pre- to post-dispatch.
///
/// Dropping the ticket without calling `post_dispatch` (for example when the
/// live call fails) releases the digest for other tasks.
#[derive(Debug)]
pub struct RecordTicket {
    rule: Arc<Rule>,
    digest: Digest,
    segments: Option<Vec<String>>,
    guard: RecordingGuard,
}

impl RecordTicket {
    /// Digest being recorded
    #[must_use]
    pub fn digest(&self) -> &Digest {
        &self.digest
    }
}

/// Record/replay engine scoped to one client
pub struct Recorder {
    matchers: MatcherPipeline,
    stabilizers: Vec<HeaderStabilizer>,
    settings: Settings,
    coordinator: Arc<Coordinator>,
}

impl Recorder {
    /// Build a recorder from a client configuration.
    ///
    /// Invalid settings are logged and used as far as they go; call
    /// [`Recorder::try_new`] to reject them instead.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!("{e}");
        }
        Self::build(config)
    }

    /// Build a recorder, rejecting invalid settings
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the settings do not validate
    pub fn try_new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ClientConfig) -> Self {
        let ClientConfig {
            rules,
            mut stabilizers,
            settings,
        } = config;

        if !settings.strip_headers.is_empty() {
            stabilizers.push(stabilizer::header_deleter(&settings.strip_headers));
        }

        Self {
            matchers: MatcherPipeline::new(rules),
            stabilizers,
            settings,
            coordinator: Arc::new(Coordinator::new()),
        }
    }

    /// Coordinator tracking this recorder's in-flight recordings
    #[must_use]
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Pre-dispatch hook: match, digest, and coordinate.
    ///
    /// # Errors
    ///
    /// Returns error if a key function fails, a recording is malformed, or the
    /// store cannot be read
    pub async fn pre_dispatch(&self, request: &Request) -> Result<Decision> {
        let Some(matched) = self.matchers.evaluate(request).await? else {
            debug!(
                "No rule matched {} {}",
                request.method,
                request.path().unwrap_or("<unresolved>")
            );
            return Ok(Decision::Bypass);
        };

        let segments = request.url.as_ref().map(storage::path_segments);
        self.acquire(matched.rule, matched.digest, segments).await
    }

    /// Become the replayer or the recorder for a digest
    async fn acquire(
        &self,
        rule: Arc<Rule>,
        digest: Digest,
        segments: Option<Vec<String>>,
    ) -> Result<Decision> {
        let store = RecordingStore::new(rule.storage_root());

        loop {
            if let Some(done) = self.coordinator.in_flight(&digest) {
                debug!("Waiting for in-flight recording {}", digest.short());
                if !self.wait(done).await {
                    warn!(
                        "Timed out waiting for recording {}, dispatching live without recording",
                        digest.short()
                    );
                    return Ok(Decision::Bypass);
                }
                continue;
            }

            match store.lookup(&digest).await? {
                Lookup::Found(entry) => {
                    debug!("Replaying {} from {}", digest.short(), entry.dir().display());
                    return Ok(Decision::Replay(entry));
                }
                Lookup::Claimed(dir) => {
                    if self.coordinator.is_in_flight(&digest) {
                        continue;
                    }
                    warn!(
                        "Recording directory {} exists without {}, re-recording",
                        dir.display(),
                        storage::META_FILE
                    );
                }
                Lookup::NotFound => {}
            }

            let guard = match self.coordinator.try_claim(digest) {
                Claim::Recorder(guard) => guard,
                Claim::Wait(_) => continue,
            };

            // A recorder may have finished between the lookup and the claim.
            if let Lookup::Found(entry) = store.lookup(&digest).await? {
                debug!("Replaying {} recorded concurrently", digest.short());
                return Ok(Decision::Replay(entry));
            }

            debug!("Recording {}", digest.short());
            return Ok(Decision::RecordAfter(RecordTicket {
                rule,
                digest,
                segments,
                guard,
            }));
        }
    }

    /// Wait for a recorder; `false` when the configured timeout elapsed
    async fn wait(&self, done: tokio::sync::watch::Receiver<()>) -> bool {
        match self.settings.wait_timeout() {
            Some(limit) => tokio::time::timeout(limit, coordinator::completed(done))
                .await
                .is_ok(),
            None => {
                coordinator::completed(done).await;
                true
            }
        }
    }

    /// Post-dispatch hook: stabilize, persist, release waiters.
    ///
    /// The live response is returned to the caller whether or not it could be
    /// recorded. Waiters are released on every path.
    ///
    /// # Errors
    ///
    /// Returns error if the recording cannot be written
    pub async fn post_dispatch(
        &self,
        ticket: RecordTicket,
        live: LiveResponse,
    ) -> Result<Response> {
        let RecordTicket {
            rule,
            digest,
            segments,
            guard,
        } = ticket;
        let live_headers = HeaderList::from_raw(&live.headers);

        let Some(segments) = segments else {
            warn!(
                "Request for {} has no resolvable URL, skipping recording",
                digest.short()
            );
            return Ok(Response::live(live.status, live_headers, live.body));
        };

        let mut defaults = Vec::new();
        if rule.uses_default_stabilizer() && self.settings.add_date_stabilizer {
            defaults.push(stabilizer::date_stabilizer());
        }
        let pipeline = StabilizerPipeline::new([
            self.stabilizers.as_slice(),
            rule.stabilizers(),
            defaults.as_slice(),
        ]);

        let stable = match pipeline.stabilize(&live.headers) {
            Ok(stable) => stable,
            Err(e) => {
                warn!("Cannot record {}: {}", digest.short(), e);
                return Ok(Response::live(live.status, live_headers, live.body));
            }
        };

        let store = RecordingStore::new(rule.storage_root());
        let (_, body) = store
            .persist(&segments, &digest, live.status, stable, live.body)
            .await?;
        drop(guard);

        Ok(Response::live(live.status, live_headers, body))
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("matchers", &self.matchers)
            .field("stabilizers", &self.stabilizers.len())
            .field("settings", &self.settings)
            .field("in_flight", &self.coordinator.len())
            .finish()
    }
}
