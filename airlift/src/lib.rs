//! Airlift - Update synchronization engine for a game-client launcher
//!
//! Airlift keeps a client's install directory in sync with a
//! server-published, signed manifest. The pipeline runs leaves-first:
//!
//! ```text
//! hasher (server) ── signing ── transport ── signing (verify)
//!                                                │
//!                     hasher (client) ────────── diff ── sync ── progress
//! ```
//!
//! Each arrow is a one-directional handoff of immutable data. The engine
//! never trusts unsigned bytes (verification precedes parsing) and never
//! writes outside the caller-supplied sandbox root.

pub mod config;
pub mod diff;
pub mod hasher;
pub mod manifest;
pub mod progress;
pub mod publisher;
pub mod signing;
pub mod sync;
