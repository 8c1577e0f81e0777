//! Sync session state and the session registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::diff::SyncPlan;
use crate::manifest::RelativePath;

/// Global counter backing [`SessionId::next`].
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-local identifier for a sync session.
///
/// Sessions are in-memory only and do not survive a restart; a restarted
/// sync re-hashes and re-diffs from scratch under a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate the next session id.
    pub fn next() -> Self {
        Self(SESSION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Lifecycle of a sync session.
///
/// `Pending → Running → {Completed | Cancelled | Failed}`. Running may
/// pause per file, but the session never re-enters `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl SessionState {
    /// Whether this state ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::Failed
        )
    }
}

/// A file that failed during a session, with the reason kept for the
/// summary and the `FileFailed` event.
#[derive(Debug, Clone)]
pub struct FailedFile {
    pub path: RelativePath,
    pub reason: String,
}

/// Mutable state of one plan execution.
///
/// Owned exclusively by the orchestrator's execution loop; observers see
/// progress through the event channel, never through this struct.
#[derive(Debug)]
pub struct DownloadSession {
    id: SessionId,
    state: SessionState,
    pub plan: SyncPlan,
    pub completed_files: Vec<RelativePath>,
    pub failed_files: Vec<FailedFile>,
    pub bytes_downloaded: u64,
    pub skipped_by_cancel: usize,
    pub deleted: usize,
    pub deletes_pending: usize,
    cancel: CancellationToken,
}

impl DownloadSession {
    /// Create a pending session for a plan.
    pub fn new(plan: SyncPlan) -> Self {
        Self {
            id: SessionId::next(),
            state: SessionState::Pending,
            plan,
            completed_files: Vec::new(),
            failed_files: Vec::new(),
            bytes_downloaded: 0,
            skipped_by_cancel: 0,
            deleted: 0,
            deletes_pending: 0,
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// A clone of the session's cancellation token.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Transition `Pending → Running`.
    pub fn start(&mut self) {
        debug_assert_eq!(self.state, SessionState::Pending);
        self.state = SessionState::Running;
    }

    /// Record a successfully fetched or verified file.
    pub fn record_completed(&mut self, path: RelativePath, bytes: u64) {
        self.completed_files.push(path);
        self.bytes_downloaded += bytes;
    }

    /// Record a failed file.
    pub fn record_failed(&mut self, path: RelativePath, reason: String) {
        self.failed_files.push(FailedFile { path, reason });
    }

    /// Record a file skipped because the session was cancelled first.
    pub fn record_skipped(&mut self) {
        self.skipped_by_cancel += 1;
    }

    /// Enter the `Completed` terminal state (possibly with failures).
    pub fn complete(&mut self) {
        self.state = SessionState::Completed;
    }

    /// Enter the `Cancelled` terminal state.
    pub fn mark_cancelled(&mut self) {
        self.state = SessionState::Cancelled;
    }

    /// Enter the `Failed` terminal state (plan-invalidating error).
    pub fn fail(&mut self) {
        self.state = SessionState::Failed;
    }

    /// Snapshot the session outcome.
    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            session_id: self.id,
            state: self.state,
            completed: self.completed_files.len(),
            failed: self.failed_files.len(),
            skipped: self.skipped_by_cancel,
            deleted: self.deleted,
            deletes_pending: self.deletes_pending,
            bytes_downloaded: self.bytes_downloaded,
        }
    }
}

/// Outcome of a sync session, as reported to the caller and in the
/// terminal `SessionComplete` event.
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub session_id: SessionId,
    pub state: SessionState,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub deletes_pending: usize,
    pub bytes_downloaded: u64,
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:?}, {} completed, {} failed, {} skipped, {} deleted ({} pending), {} bytes",
            self.session_id,
            self.state,
            self.completed,
            self.failed,
            self.skipped,
            self.deleted,
            self.deletes_pending,
            self.bytes_downloaded
        )
    }
}

/// Lookup table from session id to cancellation token.
///
/// This is the only session state shared outside the orchestrator, and
/// it exists purely for cancellation delivery: callers holding an id
/// can request cancellation without a reference into the running
/// session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: DashMap<SessionId, CancellationToken>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session's cancellation token.
    pub fn register(&self, id: SessionId, token: CancellationToken) {
        self.entries.insert(id, token);
    }

    /// Request cancellation of a session. Returns `false` for unknown or
    /// already-removed sessions.
    pub fn cancel(&self, id: SessionId) -> bool {
        match self.entries.get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Request cancellation of every live session (launcher shutdown).
    pub fn cancel_all(&self) {
        for entry in self.entries.iter() {
            entry.value().cancel();
        }
    }

    /// Drop a terminal session from the registry.
    pub fn remove(&self, id: SessionId) {
        self.entries.remove(&id);
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
