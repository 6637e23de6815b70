//! Async artifact downloader with progress reporting and security validation.
//!
//! The installable items only know the [`Downloader`] trait: they open the
//! destination file themselves and hand it over together with the URL.
//! [`HttpDownloader`] is the streaming reqwest implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};
use url::Url;

use super::progress::{DownloadProgress, ProgressSink};

// ============================================================================
// URL Security Validation
// ============================================================================

/// Allowed domains for downloading suite artifacts.
const ALLOWED_DOMAINS: &[&str] = &[
    "azul.com",
    "virtualbox.org",
    "hashicorp.com",
    "cygwin.com",
    "redhat.com",
    "jboss.org",
    "github.com",
];

/// Validates that a URL is safe for downloading.
///
/// Checks:
/// - URL scheme must be HTTPS
/// - Host must be in the allowed domain list
fn validate_url(url_str: &str) -> Result<()> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL: {}", url_str))?;

    if url.scheme() != "https" {
        anyhow::bail!("URL must use HTTPS: {}", url_str);
    }

    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("URL must have a host: {}", url_str))?;

    // Subdomains of an allowed domain are fine (cdn.azul.com, ...)
    let is_allowed = ALLOWED_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)));

    if !is_allowed {
        anyhow::bail!(
            "Download domain not allowed: {}. Allowed: {:?}",
            host,
            ALLOWED_DOMAINS
        );
    }

    Ok(())
}

// ============================================================================
// Downloader
// ============================================================================

/// Transfers the bytes behind a URL into a writable destination.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Streams `url` into `dest`, reporting progress to `progress`.
    ///
    /// `size_hint` is used as the progress total when the server does not
    /// announce a Content-Length. Returns the number of bytes written.
    async fn download(
        &self,
        url: &str,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
        expected_sha256: Option<&str>,
        size_hint: Option<u64>,
        progress: &dyn ProgressSink,
    ) -> Result<u64>;
}

/// HTTPS downloader built on reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(
        &self,
        url: &str,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
        expected_sha256: Option<&str>,
        size_hint: Option<u64>,
        progress: &dyn ProgressSink,
    ) -> Result<u64> {
        info!("Downloading {}", url);

        validate_url(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to start download from {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!(
                "Download failed with status {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            );
        }

        let total_bytes = response.content_length().or(size_hint);
        debug!("Content-Length: {:?}", response.content_length());

        let mut stream = response.bytes_stream();
        let mut bytes_downloaded: u64 = 0;
        let mut hasher = Sha256::new();

        progress.set_progress(&DownloadProgress::new(0, total_bytes));

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.with_context(|| "Failed to read chunk from response stream")?;

            hasher.update(&chunk);
            dest.write_all(&chunk)
                .await
                .with_context(|| "Failed to write chunk to destination")?;

            bytes_downloaded += chunk.len() as u64;
            progress.set_progress(&DownloadProgress::new(bytes_downloaded, total_bytes));
        }

        dest.flush().await.context("Failed to flush destination")?;

        if let Some(expected) = expected_sha256 {
            let actual_hex = format_sha256_hex(&hasher.finalize());
            if actual_hex != expected.to_lowercase() {
                anyhow::bail!(
                    "SHA256 checksum mismatch!\nExpected: {}\nActual: {}",
                    expected,
                    actual_hex
                );
            }
            debug!("SHA256 verified: {}", actual_hex);
        }

        info!("Download complete: {} bytes from {}", bytes_downloaded, url);
        Ok(bytes_downloaded)
    }
}

/// Formats a SHA256 hash as lowercase hex.
fn format_sha256_hex(hash: &[u8]) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}
