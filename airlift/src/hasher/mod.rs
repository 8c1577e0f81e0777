//! Deterministic directory hashing.
//!
//! The hasher turns a directory subtree into a [`crate::manifest::DirEntry`]
//! whose every descendant file carries a content digest. The mapping is
//! deterministic: identical trees (same bytes, same relative structure)
//! always produce byte-identical canonical manifests, which is what the
//! trust model and the diff engine's equality checks stand on.
//!
//! Two filters shape the walk:
//!
//! - an **include filter** decides which paths are considered at all;
//! - a **hashing policy** decides, per matched file, between a full
//!   content digest and a fast-check placeholder that trusts the file's
//!   size (for low-risk paths where re-reading gigabytes on every sync
//!   is not worth it).
//!
//! Read failures below the root are reported and the entry omitted; an
//! unreadable root fails the walk. The hasher never writes.

mod digest;
mod error;
mod filter;
mod walker;

pub use digest::{digest_file, fast_check_digest, hash_file};
pub use error::HasherError;
pub use filter::{HashMode, HashPolicy, PathFilter, PatternSet};
pub use walker::TreeHasher;
