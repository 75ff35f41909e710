//! Single-flight coordination of recordings per digest

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;

use crate::fingerprint::Digest;

/// Tracks which digests have a live recording in progress.
///
/// Owned by a [`Recorder`](super::Recorder); independent recorders never
/// share state.
#[derive(Debug, Default)]
pub struct Coordinator {
    in_flight: DashMap<Digest, watch::Receiver<()>>,
}

/// Result of trying to become the recorder for a digest
#[derive(Debug)]
pub enum Claim {
    /// This task records; the slot is released when the guard drops
    Recorder(RecordingGuard),
    /// Another task is recording; wait on its completion signal
    Wait(watch::Receiver<()>),
}

impl Coordinator {
    /// Create an empty coordinator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Completion signal of the recording in progress for `digest`, if any
    #[must_use]
    pub fn in_flight(&self, digest: &Digest) -> Option<watch::Receiver<()>> {
        self.in_flight.get(digest).map(|entry| entry.value().clone())
    }

    /// Whether a recording is in progress for `digest`
    #[must_use]
    pub fn is_in_flight(&self, digest: &Digest) -> bool {
        self.in_flight.contains_key(digest)
    }

    /// Insert a handle for `digest` unless one exists.
    ///
    /// Check and insert happen under one shard lock, so two tasks can never
    /// both become the recorder.
    pub fn try_claim(self: &Arc<Self>, digest: Digest) -> Claim {
        match self.in_flight.entry(digest) {
            Entry::Occupied(entry) => Claim::Wait(entry.get().clone()),
            Entry::Vacant(entry) => {
                let (signal, done) = watch::channel(());
                entry.insert(done);
                Claim::Recorder(RecordingGuard {
                    coordinator: Arc::clone(self),
                    digest,
                    _signal: signal,
                })
            }
        }
    }

    /// Number of recordings in progress
    #[must_use]
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether no recording is in progress
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

/// Suspend until the recorder behind `done` releases its slot
pub async fn completed(mut done: watch::Receiver<()>) {
    // The sender never sends; `changed` resolves with an error once it drops.
    while done.changed().await.is_ok() {}
}

/// Ownership of a digest's recording slot.
///
/// Dropping the guard removes the handle and wakes every waiter, whether the
/// recording succeeded, failed, or was abandoned.
#[derive(Debug)]
pub struct RecordingGuard {
    coordinator: Arc<Coordinator>,
    digest: Digest,
    _signal: watch::Sender<()>,
}

impl RecordingGuard {
    /// Digest this guard owns
    #[must_use]
    pub fn digest(&self) -> &Digest {
        &self.digest
    }
}

impl Drop for RecordingGuard {
    fn drop(&mut self) {
        // Remove before the sender drops so woken waiters see the slot free.
        self.coordinator.in_flight.remove(&self.digest);
    }
}
