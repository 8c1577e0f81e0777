//! The download orchestrator: realizing a sync plan on disk.
//!
//! This module owns everything between a computed [`crate::diff::SyncPlan`]
//! and a reconciled sandbox root:
//!
//! - [`Sandbox`]: the one directory boundary a session may write
//!   within, with containment re-validated immediately before every
//!   write;
//! - [`FileFetcher`] / [`HttpFetcher`]: the transport seam; the engine
//!   only depends on the minimal async contract;
//! - [`InflightTable`]: session-owned cancellation handles keyed by
//!   `(url, destination)`, giving duplicate requests join semantics;
//! - [`DownloadSession`] / [`SessionRegistry`]: per-session state and
//!   the id-to-cancellation lookup;
//! - [`SyncOrchestrator`]: the execution loop of verify pass, bounded
//!   concurrent fetch pass with staging files and atomic renames, and
//!   deletions last.
//!
//! Progress flows out through [`crate::progress::ProgressChannel`];
//! nothing here ever blocks on an observer.

mod error;
mod fetcher;
mod inflight;
mod orchestrator;
mod sandbox;
mod session;

pub use error::{FetchError, SyncError, SyncResult};
pub use fetcher::{FetchRequest, FileFetcher, HttpFetcher, ProgressFn};
pub use inflight::{DownloadKey, InflightHandle, InflightTable};
pub use orchestrator::{SyncConfig, SyncOrchestrator, SyncRequest};
pub use sandbox::Sandbox;
pub use session::{
    DownloadSession, FailedFile, SessionId, SessionRegistry, SessionState, SyncSummary,
};
