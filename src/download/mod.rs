//! Streaming HTTP download of recordings.

use anyhow::Result;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::pipeline::artifacts::partial_path;

/// Fetches a remote asset into a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Write the body of `url` to `dest`. On error `dest` is left untouched.
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("server returned {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Single-attempt streaming downloader with a bounded request timeout.
///
/// The body is streamed into `<dest>.part` and renamed into place once
/// complete, so `dest` only ever appears fully written.
pub struct HttpDownloader {
    client: reqwest::Client,
    show_progress: bool,
}

impl HttpDownloader {
    pub fn new(timeout: Duration, show_progress: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout_for_body(timeout))
            .build()?;
        Ok(Self {
            client,
            show_progress,
        })
    }

    async fn fetch_to(&self, url: &str, part: &Path) -> std::result::Result<u64, DownloadError> {
        let http_err = |source| DownloadError::Http {
            url: url.to_string(),
            source,
        };
        let io_err = |source| DownloadError::Io {
            path: part.display().to_string(),
            source,
        };

        let mut response = self.client.get(url).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status,
            });
        }

        let pb = self.progress_bar(response.content_length());
        let mut file = fs::File::create(part).await.map_err(io_err)?;
        let mut written: u64 = 0;

        while let Some(chunk) = response.chunk().await.map_err(http_err)? {
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }

        file.flush().await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        pb.finish_and_clear();

        Ok(written)
    }

    fn progress_bar(&self, len: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        match len {
            Some(len) => {
                let pb = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                {
                    pb.set_style(style.progress_chars("━╸━"));
                }
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
        }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let part = partial_path(dest);
        info!("Downloading {} to {:?}", url, dest);

        let result = match self.fetch_to(url, &part).await {
            Ok(bytes) => fs::rename(&part, dest)
                .await
                .map(|()| bytes)
                .map_err(|source| DownloadError::Io {
                    path: dest.display().to_string(),
                    source,
                }),
            Err(err) => Err(err),
        };

        match result {
            Ok(bytes) => {
                info!("Downloaded {} bytes to {:?}", bytes, dest);
                Ok(())
            }
            Err(err) => {
                remove_partial(&part).await;
                Err(err.into())
            }
        }
    }
}

async fn remove_partial(part: &Path) {
    if fs::remove_file(part).await.is_ok() {
        debug!("Removed partial download {:?}", part);
    }
}

/// Recordings are large; the request timeout bounds connection setup and
/// stalls, so the whole-body limit is scaled well beyond it.
fn timeout_for_body(timeout: Duration) -> Duration {
    timeout.saturating_mul(120)
}
