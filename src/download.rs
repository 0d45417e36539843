// src/download.rs

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download of {url} failed after {attempts} attempts: {last_error}")]
    DownloadFailed {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

/// A single transfer of `url` into the already-open, empty `dest`.
pub trait Fetch {
    fn fetch(&self, url: &str, dest: &mut File) -> Result<(), DownloadError>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(connect_timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("alistman/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpFetcher { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, dest: &mut File) -> Result<(), DownloadError> {
        let mut response = self.client.get(url).send()?.error_for_status()?;
        let written = response.copy_to(dest)?;
        debug!("Fetched {} bytes from {}", written, url);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay slept after failed attempt `attempt` (1-based); grows linearly.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff * attempt
    }

    /// Every delay slept when all attempts fail.
    #[cfg(test)]
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_retries).map(|a| self.backoff(a)).collect()
    }
}

impl From<&config::Download> for RetryPolicy {
    fn from(cfg: &config::Download) -> Self {
        RetryPolicy {
            max_retries: cfg.max_retries.max(1),
            initial_backoff: Duration::from_secs(cfg.initial_backoff_secs),
        }
    }
}

pub struct Downloader {
    fetcher: Box<dyn Fetch>,
    policy: RetryPolicy,
    sleep: Box<dyn Fn(Duration)>,
}

impl Downloader {
    pub fn new(fetcher: Box<dyn Fetch>, policy: RetryPolicy) -> Self {
        Downloader {
            fetcher,
            policy,
            sleep: Box::new(std::thread::sleep),
        }
    }

    #[cfg(test)]
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    /// Fetches `url` into `dest` until it holds a non-empty body. The handle
    /// is truncated before every attempt and never reopened by name; on
    /// failure it is left empty.
    #[instrument(skip(self, dest))]
    pub fn download(&self, url: &str, dest: &mut File) -> Result<(), DownloadError> {
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_retries {
            truncate(dest)?;

            debug!("Download attempt {}/{}", attempt, self.policy.max_retries);
            match self.fetcher.fetch(url, dest) {
                Ok(()) if dest.metadata()?.len() > 0 => {
                    dest.seek(SeekFrom::Start(0))?;
                    info!("Downloaded {} on attempt {}", url, attempt);
                    return Ok(());
                }
                Ok(()) => last_error = "downloaded file is empty".to_string(),
                Err(e) => last_error = e.to_string(),
            }

            warn!(
                "Download attempt {}/{} failed: {}",
                attempt, self.policy.max_retries, last_error
            );

            if attempt < self.policy.max_retries {
                let delay = self.policy.backoff(attempt);
                println!(
                    "⚠️ Download failed, retrying in {}s ({}/{})",
                    delay.as_secs(),
                    attempt,
                    self.policy.max_retries
                );
                (self.sleep)(delay);
            }
        }

        truncate(dest)?;
        Err(DownloadError::DownloadFailed {
            url: url.to_string(),
            attempts: self.policy.max_retries,
            last_error,
        })
    }
}

fn truncate(file: &mut File) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(())
}
