//! Structural tree diffing.

use crate::hasher::{HasherError, PatternSet};
use crate::manifest::{ContentEntry, DirEntry};

use super::plan::SyncPlan;

/// Rules shaping a diff beyond pure tree comparison.
#[derive(Debug, Clone, Default)]
pub struct DiffRules {
    /// Paths to re-verify against the disk even when hashes match
    /// (periodic integrity re-checks without re-downloading).
    pub verify: PatternSet,

    /// Paths that must never be deleted even when absent from the remote
    /// manifest: user-owned files (configuration, saves) living inside
    /// the synchronized root.
    pub preserve: PatternSet,
}

impl DiffRules {
    /// Compile rules from glob pattern lists.
    pub fn from_patterns(
        verify: &[impl AsRef<str>],
        preserve: &[impl AsRef<str>],
    ) -> Result<Self, HasherError> {
        Ok(Self {
            verify: PatternSet::from_patterns(verify)?,
            preserve: PatternSet::from_patterns(preserve)?,
        })
    }
}

/// Compute the minimal [`SyncPlan`] reconciling `local` with `remote`.
///
/// Both trees are walked in lock-step by relative path key:
///
/// - present remotely, absent locally → fetch;
/// - present in both with differing hashes → fetch (overwrite);
/// - present in both with equal hashes → verify, if the verify rules
///   match the path; otherwise skipped entirely;
/// - present locally, absent remotely → delete, unless preserved.
///
/// Fetch entries come out in depth-first preorder (directories before
/// their children); delete entries in postorder (files before their
/// parent directories). Pure function: no I/O, no hidden state.
pub fn diff_trees(local: &DirEntry, remote: &DirEntry, rules: &DiffRules) -> SyncPlan {
    let mut plan = SyncPlan::default();
    collect_fetches(Some(local), remote, rules, &mut plan);
    collect_deletes(local, Some(remote), rules, &mut plan);
    plan
}

fn collect_fetches(
    local: Option<&DirEntry>,
    remote: &DirEntry,
    rules: &DiffRules,
    plan: &mut SyncPlan,
) {
    for (name, remote_child) in &remote.children {
        let local_child = local.and_then(|dir| dir.child(name));
        match remote_child {
            ContentEntry::File(remote_file) => match local_child.and_then(ContentEntry::as_file) {
                None => plan.to_fetch.push(remote_file.clone()),
                Some(local_file) if local_file.content_hash != remote_file.content_hash => {
                    plan.to_fetch.push(remote_file.clone());
                }
                Some(_) => {
                    if rules.verify.matches(&remote_file.relative_path) {
                        plan.to_verify.push(remote_file.clone());
                    }
                }
            },
            ContentEntry::Dir(remote_dir) => {
                collect_fetches(
                    local_child.and_then(ContentEntry::as_dir),
                    remote_dir,
                    rules,
                    plan,
                );
            }
        }
    }
}

/// Returns whether everything local-only under `local` was scheduled for
/// deletion (false when a preserved path keeps part of the subtree).
fn collect_deletes(
    local: &DirEntry,
    remote: Option<&DirEntry>,
    rules: &DiffRules,
    plan: &mut SyncPlan,
) -> bool {
    let mut fully_deletable = true;

    for (name, local_child) in &local.children {
        let remote_child = remote.and_then(|dir| dir.child(name));
        match local_child {
            ContentEntry::File(local_file) => {
                let kept_remotely = matches!(remote_child, Some(ContentEntry::File(_)));
                if !kept_remotely {
                    if rules.preserve.matches(&local_file.relative_path) {
                        fully_deletable = false;
                    } else {
                        plan.to_delete.push(local_file.relative_path.clone());
                    }
                }
            }
            ContentEntry::Dir(local_dir) => {
                let remote_dir = remote_child.and_then(ContentEntry::as_dir);
                let subtree_deletable = collect_deletes(local_dir, remote_dir, rules, plan);
                if remote_dir.is_none() {
                    if subtree_deletable && !rules.preserve.matches(&local_dir.relative_path) {
                        plan.to_delete.push(local_dir.relative_path.clone());
                    } else {
                        fully_deletable = false;
                    }
                }
                if !subtree_deletable {
                    fully_deletable = false;
                }
            }
        }
    }

    fully_deletable
}
