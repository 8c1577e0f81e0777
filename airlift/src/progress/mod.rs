//! Session progress events and the observer channel.
//!
//! The orchestrator publishes [`SyncEvent`]s into a [`ProgressChannel`];
//! any number of observers (UI, logging) subscribe without the
//! orchestrator knowing they exist. The channel is a broadcast ring:
//!
//! - events for a single file are delivered in the order they occurred
//!   (each file's events are published from one task, and the ring
//!   preserves publish order);
//! - events across files may interleave; downloads run concurrently and
//!   no global ordering is promised;
//! - a slow or absent observer never blocks the orchestrator. When a
//!   subscriber falls behind, the oldest buffered events are dropped for
//!   that subscriber (`RecvError::Lagged`). Terminal events are the last
//!   ever published for a session, so they stay in the ring and are
//!   always deliverable to any observer that keeps reading.
//!
//! Byte-level `Progress` events are additionally coalesced at the source
//! with a [`ProgressGate`], so a fast download does not flood the ring.

use tokio::sync::broadcast;

use crate::manifest::RelativePath;
use crate::sync::SyncSummary;

/// Default capacity of the broadcast ring.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Default minimum byte delta between per-file `Progress` events.
pub const DEFAULT_PROGRESS_DELTA: u64 = 256 * 1024;

/// An observable event in a sync session's lifetime.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The session accepted a plan and is about to start.
    Queued {
        /// Files the session will fetch or verify.
        files: usize,
        /// Total bytes the fetch entries will transfer.
        bytes: u64,
    },

    /// A file download began.
    DownloadStarted { file: RelativePath },

    /// Bytes arrived for a file. Relative counters, not wall-clock
    /// estimates; `total` is the manifest's byte size for the file.
    Progress {
        file: RelativePath,
        bytes: u64,
        total: u64,
    },

    /// A file passed its integrity check (after download, or during a
    /// verify pass).
    FileVerified { file: RelativePath },

    /// A file failed and was recorded in the session's failure set.
    FileFailed { file: RelativePath, reason: String },

    /// Terminal: the session finished (possibly with per-file failures).
    SessionComplete { summary: SyncSummary },

    /// Terminal: the session was cancelled cooperatively.
    SessionCancelled,

    /// Terminal: the plan itself became unexecutable (inaccessible
    /// sandbox root).
    SessionFailed { reason: String },
}

impl SyncEvent {
    /// Whether this event ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncEvent::SessionComplete { .. }
                | SyncEvent::SessionCancelled
                | SyncEvent::SessionFailed { .. }
        )
    }
}

/// Push-based event stream from one orchestrator to many observers.
#[derive(Debug, Clone)]
pub struct ProgressChannel {
    tx: broadcast::Sender<SyncEvent>,
}

impl ProgressChannel {
    /// Create a channel with the given ring capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to the event stream. Each subscriber sees events
    /// published after the call.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Never blocks; an event published with no live
    /// subscribers is simply dropped.
    pub fn publish(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers.
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Coalesces per-file byte progress to a minimum delta.
///
/// The first report and the final (`bytes == total`) report always pass.
#[derive(Debug)]
pub struct ProgressGate {
    min_delta: u64,
    last_reported: Option<u64>,
}

impl ProgressGate {
    /// Create a gate admitting reports at least `min_delta` bytes apart.
    pub fn new(min_delta: u64) -> Self {
        Self {
            min_delta,
            last_reported: None,
        }
    }

    /// Whether a report at `bytes` of `total` should be published.
    pub fn admit(&mut self, bytes: u64, total: u64) -> bool {
        let due = match self.last_reported {
            None => true,
            Some(last) => bytes.saturating_sub(last) >= self.min_delta,
        };
        if due || (total > 0 && bytes >= total) {
            self.last_reported = Some(bytes);
            true
        } else {
            false
        }
    }
}

impl Default for ProgressGate {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_DELTA)
    }
}
