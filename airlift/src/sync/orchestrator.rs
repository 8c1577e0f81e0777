//! Plan execution: bounded-concurrency downloads into the sandbox.

use std::io;
use std::path::Path;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hasher::{digest_file, HashPolicy};
use crate::manifest::{FileEntry, RelativePath};
use crate::progress::{ProgressChannel, ProgressGate, SyncEvent, DEFAULT_PROGRESS_DELTA};

use super::error::{SyncError, SyncResult};
use super::fetcher::{FetchRequest, FileFetcher, ProgressFn};
use super::inflight::{DownloadKey, InflightTable};
use super::sandbox::Sandbox;
use super::session::{DownloadSession, SessionRegistry, SyncSummary};
use crate::diff::SyncPlan;

/// Default number of concurrent downloads.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Default number of re-downloads after a hash mismatch.
const DEFAULT_HASH_RETRIES: u32 = 1;

/// Tuning knobs for plan execution.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum downloads in flight at once (minimum 1).
    pub max_concurrent: usize,

    /// How many times a file is re-downloaded after a hash mismatch
    /// before it is marked failed.
    pub hash_retries: u32,

    /// Minimum byte delta between per-file progress events.
    pub progress_min_delta: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            hash_retries: DEFAULT_HASH_RETRIES,
            progress_min_delta: DEFAULT_PROGRESS_DELTA,
        }
    }
}

impl SyncConfig {
    /// Set the maximum concurrent downloads.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Set the hash-mismatch retry budget.
    pub fn with_hash_retries(mut self, hash_retries: u32) -> Self {
        self.hash_retries = hash_retries;
        self
    }

    /// Set the progress coalescing delta.
    pub fn with_progress_min_delta(mut self, delta: u64) -> Self {
        self.progress_min_delta = delta;
        self
    }
}

/// One sync request: a plan and everything needed to execute it.
#[derive(Debug)]
pub struct SyncRequest {
    /// The plan produced by the diff engine.
    pub plan: SyncPlan,

    /// Sandbox root for this content scope.
    pub sandbox: Sandbox,

    /// Base URL the entries' relative paths are joined onto.
    pub base_url: String,

    /// Optional bearer token forwarded to the fetcher.
    pub auth_token: Option<String>,

    /// Hashing policy for integrity checks; must match the policy the
    /// manifest was published with.
    pub hash_policy: HashPolicy,
}

/// Executes [`SyncPlan`]s against the filesystem.
///
/// For every fetch entry the orchestrator resolves the destination
/// inside the sandbox (failing closed on escape), streams the bytes to a
/// `.part` staging file through the caller-supplied [`FileFetcher`],
/// re-checks byte count and digest, and only then renames atomically
/// into place, so a partial or corrupt download can never replace a good
/// file. Deletions run last, only when every fetch and verify succeeded.
///
/// Cancellation is cooperative and session-scoped: the token is checked
/// between files and between chunks, interrupted staging files are
/// removed, and already-completed files stay (they are valid standalone
/// content).
pub struct SyncOrchestrator {
    fetcher: Arc<dyn FileFetcher>,
    channel: ProgressChannel,
    registry: Arc<SessionRegistry>,
    config: SyncConfig,
}

impl SyncOrchestrator {
    /// Create an orchestrator with default configuration.
    pub fn new(fetcher: Arc<dyn FileFetcher>) -> Self {
        Self::with_config(fetcher, SyncConfig::default())
    }

    /// Create an orchestrator with custom configuration.
    pub fn with_config(fetcher: Arc<dyn FileFetcher>, config: SyncConfig) -> Self {
        Self {
            fetcher,
            channel: ProgressChannel::default(),
            registry: Arc::new(SessionRegistry::new()),
            config,
        }
    }

    /// Share a session registry (e.g. one registry across scopes).
    pub fn with_registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// The event channel sessions publish into.
    pub fn channel(&self) -> &ProgressChannel {
        &self.channel
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SyncEvent> {
        self.channel.subscribe()
    }

    /// The registry used for cancellation delivery.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Execute a plan to a terminal state and return the summary.
    ///
    /// Per-file errors are collected into the session and reported as
    /// `FileFailed` events; only an unavailable sandbox root fails the
    /// session as a whole. Re-running a sync is safe: unaffected files
    /// hash-match during the next diff and are skipped.
    pub async fn run(&self, request: SyncRequest) -> SyncSummary {
        let SyncRequest {
            plan,
            sandbox,
            base_url,
            auth_token,
            hash_policy,
        } = request;

        let mut session = DownloadSession::new(plan);
        let session_id = session.id();
        self.registry.register(session_id, session.cancel_token());

        self.channel.publish(SyncEvent::Queued {
            files: session.plan.to_fetch.len() + session.plan.to_verify.len(),
            bytes: session.plan.fetch_bytes(),
        });

        if let Err(error) = sandbox.ensure_available() {
            warn!(%session_id, %error, "Sync session failed before start");
            session.fail();
            self.channel.publish(SyncEvent::SessionFailed {
                reason: error.to_string(),
            });
            self.registry.remove(session_id);
            return session.summary();
        }

        session.start();
        info!(
            %session_id,
            fetches = session.plan.to_fetch.len(),
            verifies = session.plan.to_verify.len(),
            deletes = session.plan.to_delete.len(),
            "Sync session started"
        );

        let fetch_queue = self.verify_pass(&mut session, &sandbox, &hash_policy).await;
        self.fetch_pass(
            &mut session,
            fetch_queue,
            &sandbox,
            &base_url,
            auth_token.as_deref(),
            &hash_policy,
        )
        .await;

        if session.is_cancelled() {
            session.mark_cancelled();
            info!(%session_id, "Sync session cancelled");
            self.channel.publish(SyncEvent::SessionCancelled);
        } else {
            if session.failed_files.is_empty() {
                self.delete_pass(&mut session, &sandbox).await;
            } else {
                // A failed sync must never leave the install missing
                // files it still needs; deletions wait for a clean run.
                info!(
                    %session_id,
                    failed = session.failed_files.len(),
                    "Deferring deletions: session has failed files"
                );
                session.deletes_pending = session.plan.to_delete.len();
            }
            session.complete();
            self.channel.publish(SyncEvent::SessionComplete {
                summary: session.summary(),
            });
        }

        self.registry.remove(session_id);
        let summary = session.summary();
        info!(%session_id, %summary, "Sync session finished");
        summary
    }

    /// Re-hash `to_verify` entries against the disk. Clean files are
    /// recorded verified; mismatching or missing files self-heal by
    /// joining the fetch queue.
    async fn verify_pass(
        &self,
        session: &mut DownloadSession,
        sandbox: &Sandbox,
        policy: &HashPolicy,
    ) -> Vec<FileEntry> {
        let mut fetch_queue = session.plan.to_fetch.clone();

        for entry in session.plan.to_verify.clone() {
            if session.is_cancelled() {
                session.record_skipped();
                continue;
            }
            match self.check_local_file(&entry, sandbox, policy).await {
                Ok(true) => {
                    self.channel.publish(SyncEvent::FileVerified {
                        file: entry.relative_path.clone(),
                    });
                    session.record_completed(entry.relative_path.clone(), 0);
                }
                Ok(false) => {
                    info!(file = %entry.relative_path, "Integrity re-check failed, re-fetching");
                    fetch_queue.push(entry);
                }
                Err(error) => {
                    warn!(file = %entry.relative_path, %error, "Integrity re-check errored");
                    self.channel.publish(SyncEvent::FileFailed {
                        file: entry.relative_path.clone(),
                        reason: error.to_string(),
                    });
                    session.record_failed(entry.relative_path.clone(), error.to_string());
                }
            }
        }

        fetch_queue
    }

    /// Whether the local copy of `entry` matches its manifest digest.
    /// A missing file is simply "no" (it will be fetched), not an error.
    async fn check_local_file(
        &self,
        entry: &FileEntry,
        sandbox: &Sandbox,
        policy: &HashPolicy,
    ) -> SyncResult<bool> {
        let path = sandbox.resolve(&entry.relative_path)?;
        let mode = policy.mode_for(&entry.relative_path);

        let digest_path = path.clone();
        let digest = tokio::task::spawn_blocking(move || digest_file(&digest_path, mode)).await;

        match digest {
            Ok(Ok(actual)) => Ok(actual == entry.content_hash.as_str()),
            Ok(Err(source)) if source.kind() == io::ErrorKind::NotFound => Ok(false),
            Ok(Err(source)) => Err(SyncError::Io { path, source }),
            Err(join_error) => Err(SyncError::Io {
                path,
                source: io::Error::new(io::ErrorKind::Other, join_error),
            }),
        }
    }

    /// Sliding-window execution of the fetch queue: up to
    /// `max_concurrent` downloads in flight, a new one submitted as each
    /// completes, no new submissions once cancellation is observed.
    async fn fetch_pass(
        &self,
        session: &mut DownloadSession,
        queue: Vec<FileEntry>,
        sandbox: &Sandbox,
        base_url: &str,
        auth_token: Option<&str>,
        policy: &HashPolicy,
    ) {
        if queue.is_empty() {
            return;
        }

        let inflight = InflightTable::new();
        let cancel = session.cancel_token();
        let mut entries = queue.into_iter();
        let mut pending = FuturesUnordered::new();

        for entry in entries.by_ref().take(self.config.max_concurrent.max(1)) {
            pending.push(self.fetch_entry(
                entry, sandbox, base_url, auth_token, policy, &inflight, &cancel,
            ));
        }

        while let Some((path, result)) = pending.next().await {
            match result {
                Ok(bytes) => {
                    debug!(file = %path, bytes, "File synchronized");
                    session.record_completed(path.clone(), bytes);
                    self.channel.publish(SyncEvent::FileVerified { file: path });
                }
                Err(SyncError::Cancelled) => {
                    session.record_skipped();
                }
                Err(error) => {
                    warn!(file = %path, %error, "File failed");
                    self.channel.publish(SyncEvent::FileFailed {
                        file: path.clone(),
                        reason: error.to_string(),
                    });
                    session.record_failed(path, error.to_string());
                }
            }

            if !cancel.is_cancelled() {
                if let Some(entry) = entries.next() {
                    pending.push(self.fetch_entry(
                        entry, sandbox, base_url, auth_token, policy, &inflight, &cancel,
                    ));
                }
            }
        }

        // Entries never submitted because cancellation came first.
        for _ in entries {
            session.record_skipped();
        }
    }

    async fn fetch_entry(
        &self,
        entry: FileEntry,
        sandbox: &Sandbox,
        base_url: &str,
        auth_token: Option<&str>,
        policy: &HashPolicy,
        inflight: &InflightTable,
        session_cancel: &CancellationToken,
    ) -> (RelativePath, SyncResult<u64>) {
        let path = entry.relative_path.clone();
        let result = self
            .fetch_one(
                &entry,
                sandbox,
                base_url,
                auth_token,
                policy,
                inflight,
                session_cancel,
            )
            .await;
        (path, result)
    }

    async fn fetch_one(
        &self,
        entry: &FileEntry,
        sandbox: &Sandbox,
        base_url: &str,
        auth_token: Option<&str>,
        policy: &HashPolicy,
        inflight: &InflightTable,
        session_cancel: &CancellationToken,
    ) -> SyncResult<u64> {
        let destination = match sandbox.resolve(&entry.relative_path) {
            Ok(destination) => destination,
            Err(error) => {
                // Security-relevant: an entry that validated at
                // construction should never fail here.
                warn!(file = %entry.relative_path, %error, "Refusing destination outside sandbox");
                return Err(error);
            }
        };
        let staging = sandbox.staging_path(&entry.relative_path)?;
        let url = join_url(base_url, &entry.relative_path);

        let key = DownloadKey {
            url: url.clone(),
            destination: destination.clone(),
        };
        let (handle, joined) = inflight.acquire(&key, session_cancel);
        if joined {
            debug!(file = %entry.relative_path, "Joining download already in flight");
        }

        let result = handle
            .cell
            .get_or_try_init(|| {
                self.download_and_commit(
                    entry,
                    &url,
                    &staging,
                    &destination,
                    auth_token,
                    policy,
                    &handle.cancel,
                )
            })
            .await
            .map(|bytes| *bytes);

        inflight.release(&key);
        result
    }

    /// Download to staging, check integrity, rename into place. Retries
    /// the whole download once per `hash_retries` on a mismatch.
    #[allow(clippy::too_many_arguments)]
    async fn download_and_commit(
        &self,
        entry: &FileEntry,
        url: &str,
        staging: &Path,
        destination: &Path,
        auth_token: Option<&str>,
        policy: &HashPolicy,
        cancel: &CancellationToken,
    ) -> SyncResult<u64> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SyncError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let mode = policy.mode_for(&entry.relative_path);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.channel.publish(SyncEvent::DownloadStarted {
                file: entry.relative_path.clone(),
            });

            let on_progress: ProgressFn = {
                let gate = Mutex::new(ProgressGate::new(self.config.progress_min_delta));
                let channel = self.channel.clone();
                let file = entry.relative_path.clone();
                let total = entry.byte_size;
                Arc::new(move |bytes, _| {
                    if gate.lock().admit(bytes, total) {
                        channel.publish(SyncEvent::Progress {
                            file: file.clone(),
                            bytes,
                            total,
                        });
                    }
                })
            };

            let fetch_result = self
                .fetcher
                .fetch(FetchRequest {
                    url: url.to_string(),
                    destination: staging.to_path_buf(),
                    auth_token: auth_token.map(str::to_string),
                    on_progress: Some(on_progress),
                    cancellation: cancel.clone(),
                })
                .await;

            let bytes = match fetch_result {
                Ok(bytes) => bytes,
                Err(error) => {
                    let _ = tokio::fs::remove_file(staging).await;
                    return Err(error.into());
                }
            };

            let digest_path = staging.to_path_buf();
            let digest =
                tokio::task::spawn_blocking(move || digest_file(&digest_path, mode)).await;
            let actual = match digest {
                Ok(Ok(actual)) => actual,
                Ok(Err(source)) => {
                    let _ = tokio::fs::remove_file(staging).await;
                    return Err(SyncError::Io {
                        path: staging.to_path_buf(),
                        source,
                    });
                }
                Err(join_error) => {
                    let _ = tokio::fs::remove_file(staging).await;
                    return Err(SyncError::Io {
                        path: staging.to_path_buf(),
                        source: io::Error::new(io::ErrorKind::Other, join_error),
                    });
                }
            };

            if bytes == entry.byte_size && actual == entry.content_hash.as_str() {
                self.commit(staging, destination).await?;
                return Ok(bytes);
            }

            let _ = tokio::fs::remove_file(staging).await;
            warn!(
                file = %entry.relative_path,
                attempt,
                expected = %entry.content_hash,
                %actual,
                "Downloaded bytes failed integrity check"
            );
            if attempt > self.config.hash_retries {
                return Err(SyncError::HashMismatch {
                    path: entry.relative_path.to_string(),
                    expected: entry.content_hash.to_string(),
                    actual,
                });
            }
        }
    }

    /// Atomically move a verified staging file into place.
    async fn commit(&self, staging: &Path, destination: &Path) -> SyncResult<()> {
        if let Ok(metadata) = tokio::fs::metadata(destination).await {
            if metadata.is_dir() {
                // Overwrite semantics: a directory occupying the
                // destination (a type flip in the manifest) gives way.
                tokio::fs::remove_dir_all(destination)
                    .await
                    .map_err(|source| SyncError::Io {
                        path: destination.to_path_buf(),
                        source,
                    })?;
            }
        }
        tokio::fs::rename(staging, destination)
            .await
            .map_err(|source| SyncError::Io {
                path: destination.to_path_buf(),
                source,
            })
    }

    /// Remove `to_delete` paths. Failures (e.g. a file locked by the
    /// running game) defer to the next session rather than failing this
    /// one.
    async fn delete_pass(&self, session: &mut DownloadSession, sandbox: &Sandbox) {
        for path in session.plan.to_delete.clone() {
            let resolved = match sandbox.resolve(&path) {
                Ok(resolved) => resolved,
                Err(error) => {
                    warn!(file = %path, %error, "Refusing to delete outside sandbox");
                    session.deletes_pending += 1;
                    continue;
                }
            };

            match tokio::fs::metadata(&resolved).await {
                Err(_) => {
                    // Already gone; deletion is idempotent.
                    session.deleted += 1;
                }
                Ok(metadata) => {
                    let removal = if metadata.is_dir() {
                        tokio::fs::remove_dir(&resolved).await
                    } else {
                        tokio::fs::remove_file(&resolved).await
                    };
                    match removal {
                        Ok(()) => {
                            debug!(file = %path, "Deleted stale entry");
                            session.deleted += 1;
                        }
                        Err(error) => {
                            warn!(file = %path, %error, "Deletion deferred");
                            session.deletes_pending += 1;
                        }
                    }
                }
            }
        }
    }
}

/// Join a base URL and a relative path with exactly one separator.
fn join_url(base_url: &str, path: &RelativePath) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ContentHash;
    use sha2::{Digest, Sha256};
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    use super::super::error::FetchError;
    use super::super::session::SessionState;

    /// In-memory fetcher: serves url → bytes in 3-byte chunks, checking
    /// cancellation between chunks.
    struct TestFetcher {
        files: HashMap<String, Vec<u8>>,
        /// Urls that park until cancelled instead of completing.
        stall: Vec<String>,
    }

    impl TestFetcher {
        fn new(files: HashMap<String, Vec<u8>>) -> Self {
            Self {
                files,
                stall: Vec::new(),
            }
        }

        fn with_stall(mut self, url: impl Into<String>) -> Self {
            self.stall.push(url.into());
            self
        }
    }

    impl FileFetcher for TestFetcher {
        fn fetch<'a>(
            &'a self,
            request: FetchRequest,
        ) -> Pin<Box<dyn Future<Output = Result<u64, FetchError>> + Send + 'a>> {
            Box::pin(async move {
                let Some(bytes) = self.files.get(&request.url).cloned() else {
                    return Err(FetchError::Http {
                        url: request.url,
                        reason: "status 404".to_string(),
                    });
                };

                let mut file = tokio::fs::File::create(&request.destination)
                    .await
                    .map_err(|source| FetchError::Io {
                        path: request.destination.clone(),
                        source,
                    })?;

                let total = bytes.len() as u64;
                let mut written = 0u64;
                for chunk in bytes.chunks(3) {
                    if request.cancellation.is_cancelled() {
                        return Err(FetchError::Cancelled);
                    }
                    file.write_all(chunk)
                        .await
                        .map_err(|source| FetchError::Io {
                            path: request.destination.clone(),
                            source,
                        })?;
                    written += chunk.len() as u64;
                    if let Some(callback) = &request.on_progress {
                        callback(written, total);
                    }
                    tokio::task::yield_now().await;
                }

                if self.stall.contains(&request.url) {
                    request.cancellation.cancelled().await;
                    return Err(FetchError::Cancelled);
                }

                file.flush().await.map_err(|source| FetchError::Io {
                    path: request.destination.clone(),
                    source,
                })?;
                Ok(written)
            })
        }
    }

    fn digest(bytes: &[u8]) -> ContentHash {
        ContentHash::new(format!("{:x}", Sha256::digest(bytes))).unwrap()
    }

    fn entry(path: &str, bytes: &[u8]) -> FileEntry {
        FileEntry {
            relative_path: RelativePath::new(path).unwrap(),
            byte_size: bytes.len() as u64,
            content_hash: digest(bytes),
        }
    }

    const BASE: &str = "http://updates.example/game-client";

    fn url_of(path: &str) -> String {
        format!("{BASE}/{path}")
    }

    fn request(plan: SyncPlan, sandbox: &TempDir) -> SyncRequest {
        SyncRequest {
            plan,
            sandbox: Sandbox::new(sandbox.path()).unwrap(),
            base_url: BASE.to_string(),
            auth_token: None,
            hash_policy: HashPolicy::full_content(),
        }
    }

    #[tokio::test]
    async fn test_fetches_full_plan() {
        let contents: Vec<(&str, &[u8])> = vec![
            ("a", b"aaaaaaaaaa"),
            ("b", b"bbbbbbbbbbbbbbbbbbbb"),
            ("nested/c", b"cccccccccccccccccccccccccccccc"),
        ];
        let files = contents
            .iter()
            .map(|(path, bytes)| (url_of(path), bytes.to_vec()))
            .collect();
        let plan = SyncPlan {
            to_fetch: contents.iter().map(|(p, b)| entry(p, b)).collect(),
            ..Default::default()
        };

        let sandbox = TempDir::new().unwrap();
        let orchestrator = SyncOrchestrator::new(Arc::new(TestFetcher::new(files)));
        let summary = orchestrator.run(request(plan, &sandbox)).await;

        assert_eq!(summary.state, SessionState::Completed);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.bytes_downloaded, 60);
        for (path, bytes) in contents {
            assert_eq!(std::fs::read(sandbox.path().join(path)).unwrap(), bytes);
        }
        assert!(!sandbox.path().join("a.part").exists());
        let mut names: Vec<String> = std::fs::read_dir(sandbox.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "b", "nested"]);
    }

    #[tokio::test]
    async fn test_hash_mismatch_fails_file_and_defers_deletes() {
        let good = entry("good", b"good bytes");
        let bad = entry("bad", b"expected bytes");
        let files = HashMap::from([
            (url_of("good"), b"good bytes".to_vec()),
            // Served content does not match the manifest digest.
            (url_of("bad"), b"tampered bytes".to_vec()),
        ]);

        let sandbox = TempDir::new().unwrap();
        std::fs::write(sandbox.path().join("stale"), b"stale").unwrap();

        let plan = SyncPlan {
            to_fetch: vec![good, bad],
            to_delete: vec![RelativePath::new("stale").unwrap()],
            ..Default::default()
        };

        let orchestrator = SyncOrchestrator::new(Arc::new(TestFetcher::new(files)));
        let summary = orchestrator.run(request(plan, &sandbox)).await;

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.deleted, 0);
        assert_eq!(summary.deletes_pending, 1);
        // The corrupt download never reached its destination name.
        assert!(!sandbox.path().join("bad").exists());
        assert!(!sandbox.path().join("bad.part").exists());
        // Deletions deferred because the session had failures.
        assert!(sandbox.path().join("stale").exists());
    }

    #[tokio::test]
    async fn test_cancellation_cleans_staging_and_keeps_completed() {
        let done = entry("done", b"finished file");
        let stuck = entry("stuck", b"never finishes");
        let files = HashMap::from([
            (url_of("done"), b"finished file".to_vec()),
            (url_of("stuck"), b"never finishes".to_vec()),
        ]);
        let fetcher = TestFetcher::new(files).with_stall(url_of("stuck"));

        let sandbox = TempDir::new().unwrap();
        let plan = SyncPlan {
            to_fetch: vec![done, stuck],
            ..Default::default()
        };

        let orchestrator = Arc::new(SyncOrchestrator::with_config(
            Arc::new(fetcher),
            SyncConfig::default().with_max_concurrent(1),
        ));
        let mut events = orchestrator.subscribe();
        let registry = Arc::clone(orchestrator.registry());

        let runner = {
            let orchestrator = Arc::clone(&orchestrator);
            let request = request(plan, &sandbox);
            tokio::spawn(async move { orchestrator.run(request).await })
        };

        // Cancel once the stalled download has started.
        loop {
            match events.recv().await.unwrap() {
                SyncEvent::DownloadStarted { file } if file.as_str() == "stuck" => break,
                _ => {}
            }
        }
        registry.cancel_all();

        let summary = runner.await.unwrap();
        assert_eq!(summary.state, SessionState::Cancelled);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.skipped, 1);
        // Completed file intact; no trace of the cancelled one.
        assert!(sandbox.path().join("done").exists());
        assert!(!sandbox.path().join("stuck").exists());
        assert!(!sandbox.path().join("stuck.part").exists());
    }

    #[tokio::test]
    async fn test_verify_pass_self_heals_corrupt_file() {
        let target = entry("client.jar", b"pristine contents");
        let files = HashMap::from([(url_of("client.jar"), b"pristine contents".to_vec())]);

        let sandbox = TempDir::new().unwrap();
        std::fs::write(sandbox.path().join("client.jar"), b"corrupted locally").unwrap();

        let plan = SyncPlan {
            to_verify: vec![target],
            ..Default::default()
        };

        let orchestrator = SyncOrchestrator::new(Arc::new(TestFetcher::new(files)));
        let summary = orchestrator.run(request(plan, &sandbox)).await;

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(
            std::fs::read(sandbox.path().join("client.jar")).unwrap(),
            b"pristine contents"
        );
    }

    #[tokio::test]
    async fn test_verify_pass_accepts_clean_file() {
        let bytes = b"already in sync";
        let target = entry("client.jar", bytes);

        let sandbox = TempDir::new().unwrap();
        std::fs::write(sandbox.path().join("client.jar"), bytes).unwrap();

        let plan = SyncPlan {
            to_verify: vec![target],
            ..Default::default()
        };

        // No fetcher entries: a fetch attempt would 404 and fail the test.
        let orchestrator = SyncOrchestrator::new(Arc::new(TestFetcher::new(HashMap::new())));
        let summary = orchestrator.run(request(plan, &sandbox)).await;

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_delete_pass_removes_files_then_dirs() {
        let sandbox = TempDir::new().unwrap();
        std::fs::create_dir_all(sandbox.path().join("old")).unwrap();
        std::fs::write(sandbox.path().join("old/one.bin"), b"1").unwrap();

        let plan = SyncPlan {
            to_delete: vec![
                RelativePath::new("old/one.bin").unwrap(),
                RelativePath::new("old").unwrap(),
            ],
            ..Default::default()
        };

        let orchestrator = SyncOrchestrator::new(Arc::new(TestFetcher::new(HashMap::new())));
        let summary = orchestrator.run(request(plan, &sandbox)).await;

        assert_eq!(summary.deleted, 2);
        assert!(!sandbox.path().join("old").exists());
    }

    #[tokio::test]
    async fn test_missing_sandbox_root_fails_session() {
        let plan = SyncPlan::default();
        let orchestrator = SyncOrchestrator::new(Arc::new(TestFetcher::new(HashMap::new())));
        let request = SyncRequest {
            plan,
            sandbox: Sandbox::new("/nonexistent/airlift-sandbox").unwrap(),
            base_url: BASE.to_string(),
            auth_token: None,
            hash_policy: HashPolicy::full_content(),
        };

        let summary = orchestrator.run(request).await;
        assert_eq!(summary.state, SessionState::Failed);
    }

    #[test]
    fn test_join_url() {
        let path = RelativePath::new("libraries/core.jar").unwrap();
        assert_eq!(
            join_url("http://host/base/", &path),
            "http://host/base/libraries/core.jar"
        );
        assert_eq!(
            join_url("http://host/base", &path),
            "http://host/base/libraries/core.jar"
        );
    }
}
