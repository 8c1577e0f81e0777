//! Session-owned table of in-flight downloads.
//!
//! Each download is keyed by its URL plus destination path. The table
//! serves two purposes: it holds the cancellation handle for every
//! running transfer, and it gives duplicate requests join semantics (a
//! second request for the same key awaits the existing transfer instead
//! of starting another). The table lives inside one orchestrator run, so
//! handles cannot leak across sessions or restarts.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// Stable identity of one download: where from, and where to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DownloadKey {
    pub url: String,
    pub destination: PathBuf,
}

/// Handle to one in-flight download.
///
/// The `cell` is initialized exactly once with the byte count of the
/// successful transfer; concurrent holders awaiting
/// [`OnceCell::get_or_try_init`] join that single attempt. A failed
/// attempt stores nothing, so a later request retries.
#[derive(Debug)]
pub struct InflightHandle {
    /// Cancellation scoped to this download (child of the session token).
    pub cancel: CancellationToken,

    /// Completion cell holding the transferred byte count.
    pub cell: OnceCell<u64>,
}

/// Keyed set of in-flight downloads for one session.
#[derive(Debug, Default)]
pub struct InflightTable {
    entries: DashMap<DownloadKey, Arc<InflightHandle>>,
}

impl InflightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the handle for `key`, creating one (with a child token of
    /// `parent`) if no transfer is in flight. The boolean is `true` when
    /// an existing transfer was joined.
    pub fn acquire(
        &self,
        key: &DownloadKey,
        parent: &CancellationToken,
    ) -> (Arc<InflightHandle>, bool) {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(existing) => (Arc::clone(existing.get()), true),
            Entry::Vacant(vacant) => {
                let handle = Arc::new(InflightHandle {
                    cancel: parent.child_token(),
                    cell: OnceCell::new(),
                });
                vacant.insert(Arc::clone(&handle));
                (handle, false)
            }
        }
    }

    /// Drop a finished download from the table.
    pub fn release(&self, key: &DownloadKey) {
        self.entries.remove(key);
    }

    /// Cancel one download by key. Returns `false` for unknown keys.
    pub fn cancel(&self, key: &DownloadKey) -> bool {
        match self.entries.get(key) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of downloads currently in flight.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
