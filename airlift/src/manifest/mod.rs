//! Manifest data model: content trees, publish metadata, and the signed
//! envelope.
//!
//! A manifest is a signed, content-addressed description of one logical
//! content root (game client, asset index, or runtime). The types here
//! are pure values (no I/O) and enforce their own invariants at
//! construction:
//!
//! - [`RelativePath`] rejects traversal (`..`), absolute prefixes, and
//!   other escape vectors, including during deserialization, so an
//!   untrusted manifest cannot name a location outside the sandbox root.
//! - [`DirEntry`] children live in sorted maps, giving every tree exactly
//!   one canonical byte form (see [`canonical_bytes`]).
//! - [`SignedManifest`] keeps the signed payload bytes verbatim; the wire
//!   envelope embeds them as raw JSON rather than re-encoding.
//!
//! Hashing a directory into a tree lives in [`crate::hasher`]; signing
//! and verification in [`crate::signing`].

mod canonical;
mod document;
mod envelope;
mod error;
mod tree;

pub use canonical::{canonical_bytes, parse_manifest};
pub use document::{ContentScope, Manifest};
pub use envelope::SignedManifest;
pub use error::ManifestError;
pub use tree::{ContentEntry, ContentHash, DirEntry, FileEntry, RelativePath};
