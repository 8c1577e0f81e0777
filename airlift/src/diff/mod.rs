//! The diff engine: local tree vs. verified remote manifest.
//!
//! Given a snapshot of the local install (hashed with the same filters
//! and policy the publisher used) and a *verified* remote tree, the diff
//! engine computes the minimal [`SyncPlan`]: what to fetch, what to
//! re-verify, what to delete. It performs no I/O (malformed input is
//! already excluded by construction-time path validation in the manifest
//! layer) and the same inputs always produce the same plan.

mod engine;
mod plan;

pub use engine::{diff_trees, DiffRules};
pub use plan::SyncPlan;
