//! The transport seam: fetching bytes for one file.
//!
//! The orchestrator depends only on the [`FileFetcher`] contract; the
//! actual transport (HTTP client, local mirror, test double) is an
//! external collaborator. [`HttpFetcher`] is the production
//! implementation.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::error::FetchError;

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Per-chunk progress callback: `(bytes_so_far, total_hint)`.
///
/// `total_hint` is the transport's idea of the full size (e.g. the
/// `Content-Length` header) and may be zero when unknown.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Everything a fetcher needs to deliver one file.
pub struct FetchRequest {
    /// Source URL.
    pub url: String,

    /// Destination file (the orchestrator passes a staging path; the
    /// fetcher never renames into place).
    pub destination: PathBuf,

    /// Optional bearer token for authenticated channels.
    pub auth_token: Option<String>,

    /// Optional per-chunk progress callback.
    pub on_progress: Option<ProgressFn>,

    /// Cooperative cancellation, checked between chunks.
    pub cancellation: CancellationToken,
}

/// Fetches one file's bytes to a destination path.
///
/// Implementations must stream (no whole-body buffering), observe the
/// cancellation token between chunks, and return the number of bytes
/// written. They do not verify digests; the orchestrator owns
/// integrity checking.
pub trait FileFetcher: Send + Sync + 'static {
    /// Fetch `request.url` into `request.destination`.
    fn fetch<'a>(
        &'a self,
        request: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<u64, FetchError>> + Send + 'a>>;
}

/// HTTP implementation of [`FileFetcher`] with streaming writes and
/// bearer-token authentication.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with default settings.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a fetcher with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FileFetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        request: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<u64, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let FetchRequest {
                url,
                destination,
                auth_token,
                on_progress,
                cancellation,
            } = request;

            let mut builder = self.client.get(&url);
            if let Some(token) = &auth_token {
                builder = builder.bearer_auth(token);
            }

            let response = builder.send().await.map_err(|e| FetchError::Http {
                url: url.clone(),
                reason: e.to_string(),
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Http {
                    url,
                    reason: format!("status {status}"),
                });
            }

            let total = response.content_length().unwrap_or(0);
            let mut file =
                tokio::fs::File::create(&destination)
                    .await
                    .map_err(|source| FetchError::Io {
                        path: destination.clone(),
                        source,
                    })?;

            let mut stream = response.bytes_stream();
            let mut written = 0u64;

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => return Err(FetchError::Cancelled),
                    next = stream.next() => next,
                };
                let Some(chunk) = next else { break };
                let chunk = chunk.map_err(|e| FetchError::Http {
                    url: url.clone(),
                    reason: format!("read error: {e}"),
                })?;

                file.write_all(&chunk)
                    .await
                    .map_err(|source| FetchError::Io {
                        path: destination.clone(),
                        source,
                    })?;

                written += chunk.len() as u64;
                if let Some(callback) = &on_progress {
                    callback(written, total);
                }
            }

            file.flush().await.map_err(|source| FetchError::Io {
                path: destination.clone(),
                source,
            })?;

            Ok(written)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_constructs() {
        let _ = HttpFetcher::new();
        let _ = HttpFetcher::with_timeout(Duration::from_secs(60));
    }
}
