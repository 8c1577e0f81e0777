//! Shared fixtures for integration tests.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::io::AsyncWriteExt;

use airlift::sync::{FetchError, FetchRequest, FileFetcher};

/// Base URL used by all integration fixtures.
pub const BASE_URL: &str = "http://updates.test/scope";

/// A [`FileFetcher`] serving files from a local "server" directory.
///
/// Urls are expected to be `BASE_URL/<relative-path>`; the fetcher
/// streams the matching file from `source_root` in small chunks,
/// reporting progress and honouring cancellation between chunks, the
/// same contract the HTTP fetcher implements.
pub struct LocalFetcher {
    source_root: PathBuf,
}

impl LocalFetcher {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
        }
    }

    fn source_path(&self, url: &str) -> Option<PathBuf> {
        let rel = url.strip_prefix(BASE_URL)?.trim_start_matches('/');
        Some(self.source_root.join(rel))
    }
}

impl FileFetcher for LocalFetcher {
    fn fetch<'a>(
        &'a self,
        request: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<u64, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let Some(source) = self.source_path(&request.url) else {
                return Err(FetchError::Http {
                    url: request.url,
                    reason: "url outside test base".to_string(),
                });
            };
            let bytes = tokio::fs::read(&source)
                .await
                .map_err(|_| FetchError::Http {
                    url: request.url.clone(),
                    reason: "status 404".to_string(),
                })?;

            let mut file = tokio::fs::File::create(&request.destination)
                .await
                .map_err(|source| FetchError::Io {
                    path: request.destination.clone(),
                    source,
                })?;

            let total = bytes.len() as u64;
            let mut written = 0u64;
            for chunk in bytes.chunks(7) {
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

            file.flush().await.map_err(|source| FetchError::Io {
                path: request.destination.clone(),
                source,
            })?;
            Ok(written)
        })
    }
}

/// Write a file, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
