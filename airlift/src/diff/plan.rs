//! The sync plan produced by the diff engine.

use crate::manifest::{FileEntry, RelativePath};

/// The minimal set of operations reconciling a local tree with a
/// verified remote manifest.
///
/// A plan is a pure function of its inputs and carries no hidden state;
/// it is consumed exactly once by the download orchestrator and
/// discarded when the session reaches a terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Files to download: absent locally, or present with a different
    /// hash (overwrite semantics, never merge).
    pub to_fetch: Vec<FileEntry>,

    /// Files whose hashes matched but which the verify rules flag for an
    /// integrity re-check against the disk.
    pub to_verify: Vec<FileEntry>,

    /// Local paths absent from the remote manifest. Files come before
    /// their parent directories so deletion can execute in order. The
    /// orchestrator runs these only after every fetch and verify in the
    /// session has succeeded.
    pub to_delete: Vec<RelativePath>,
}

impl SyncPlan {
    /// Whether the plan requires no work at all.
    pub fn is_empty(&self) -> bool {
        self.to_fetch.is_empty() && self.to_verify.is_empty() && self.to_delete.is_empty()
    }

    /// Number of files to fetch.
    pub fn fetch_count(&self) -> usize {
        self.to_fetch.len()
    }

    /// Total bytes the fetch entries will transfer.
    pub fn fetch_bytes(&self) -> u64 {
        self.to_fetch.iter().map(|entry| entry.byte_size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ContentHash;

    #[test]
    fn test_empty_plan() {
        let plan = SyncPlan::default();
        assert!(plan.is_empty());
        assert_eq!(plan.fetch_count(), 0);
        assert_eq!(plan.fetch_bytes(), 0);
    }

    #[test]
    fn test_fetch_bytes_sums_entries() {
        let mut plan = SyncPlan::default();
        for (name, size) in [("a", 10u64), ("b", 20)] {
            plan.to_fetch.push(FileEntry {
                relative_path: RelativePath::new(name).unwrap(),
                byte_size: size,
                content_hash: ContentHash::new("0".repeat(64)).unwrap(),
            });
        }
        assert!(!plan.is_empty());
        assert_eq!(plan.fetch_bytes(), 30);
    }
}
