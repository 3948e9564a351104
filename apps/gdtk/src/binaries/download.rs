//! HTTP transfers against the distribution server.
//!
//! All requests share one [`reqwest::Client`] built with explicit timeouts, so a
//! hung server fails the call instead of blocking forever. Downloads stream to
//! a `.part` file and are renamed into place only once complete. Failed
//! transfers are not retried.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

/// Progress event emitted during downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The response headers arrived. `total` is `None` when the server
    /// declares no content length.
    Started { total: Option<u64> },
    /// More bytes were written. Only emitted when the total is known.
    Progress { downloaded: u64, total: u64 },
    /// The whole body is on disk.
    Completed { downloaded: u64 },
}

impl ProgressEvent {
    /// Fraction of the body received, when the total is known.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Self::Progress { downloaded, total } if *total > 0 => {
                Some(*downloaded as f64 / *total as f64)
            }
            Self::Completed { .. } => Some(1.0),
            _ => None,
        }
    }
}

/// Callback receiving [`ProgressEvent`]s.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Minimum interval between two `Progress` callbacks.
const PROGRESS_INTERVAL_MS: u128 = 100;

/// A configured HTTP client for listings, manifests and archives.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    request_timeout: Duration,
    download_timeout: Duration,
}

impl HttpClient {
    /// Builds a client applying `request_timeout` to small requests and
    /// `download_timeout` to archive transfers.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(request_timeout: Duration, download_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .user_agent(concat!("gdtk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            request_timeout,
            download_timeout,
        })
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;

        if !response.status().is_success() {
            bail!("HTTP error {}: {url}", response.status());
        }

        Ok(response)
    }

    /// Fetches a page as text.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure, timeout or a non-2xx status.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        tracing::debug!(url, "fetching");
        self.get(url, self.request_timeout)
            .await?
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {url}"))
    }

    /// Fetches and deserializes a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure, timeout, a non-2xx status or
    /// a body that does not parse as `T`.
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).with_context(|| format!("Invalid JSON from {url}"))
    }

    /// Downloads `url` to `dest`, reporting progress to `callback`.
    ///
    /// When the server declares a content length the body is streamed in
    /// chunks with `Progress` events. Otherwise it is read whole with no
    /// incremental progress. The body lands in `dest` with a `.part`
    /// extension first and is renamed on success; a failed transfer removes
    /// the partial file.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure, timeout, a non-2xx status or
    /// a local write failure.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        callback: Option<ProgressCallback>,
    ) -> Result<u64> {
        let partial = dest.with_extension("part");

        let result = self.download_to(url, &partial, callback.as_ref()).await;
        match result {
            Ok(downloaded) => {
                tokio::fs::rename(&partial, dest).await.with_context(|| {
                    format!(
                        "Failed to rename {} to {}",
                        partial.display(),
                        dest.display()
                    )
                })?;
                if let Some(callback) = &callback {
                    callback(ProgressEvent::Completed { downloaded });
                }
                Ok(downloaded)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(e)
            }
        }
    }

    async fn download_to(
        &self,
        url: &str,
        dest: &Path,
        callback: Option<&ProgressCallback>,
    ) -> Result<u64> {
        tracing::debug!(url, dest = %dest.display(), "downloading");
        let response = self.get(url, self.download_timeout).await?;
        let total = response.content_length();

        if let Some(callback) = callback {
            callback(ProgressEvent::Started { total });
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create file: {}", dest.display()))?;

        let Some(total) = total else {
            let body = response
                .bytes()
                .await
                .with_context(|| format!("Failed to read body from {url}"))?;
            file.write_all(&body)
                .await
                .with_context(|| format!("Failed to write to {}", dest.display()))?;
            file.flush()
                .await
                .with_context(|| format!("Failed to flush {}", dest.display()))?;
            return Ok(body.len() as u64);
        };

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut last_report = Instant::now();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("Failed to read chunk from {url}"))?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write to {}", dest.display()))?;
            downloaded += chunk.len() as u64;

            if let Some(callback) = callback
                && last_report.elapsed().as_millis() >= PROGRESS_INTERVAL_MS
            {
                callback(ProgressEvent::Progress { downloaded, total });
                last_report = Instant::now();
            }
        }

        file.flush()
            .await
            .with_context(|| format!("Failed to flush {}", dest.display()))?;

        if let Some(callback) = callback {
            callback(ProgressEvent::Progress { downloaded, total });
        }

        Ok(downloaded)
    }
}

/// Formats bytes into a human-readable string (KB, MB, GB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}
