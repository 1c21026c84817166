//! Streaming artifact downloads
//!
//! A fetch writes to `{dest}.part` and renames on completion, so an
//! interrupted download never leaves a truncated file under its final name.
//! The SHA-512 of the body is computed while streaming.

use crate::{Config, Error, Result};
use sha2::{Digest, Sha512};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Progress callback for downloads and long-running steps
///
/// Called with:
/// - `message`: Description of current operation (e.g., "Downloading sodium.jar")
/// - `current`: Bytes processed so far
/// - `total`: Total bytes, or 0 when unknown
pub type ProgressCallback = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// Read buffer size for streaming bodies to disk
pub const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Result of a completed fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub size: u64,
    /// Lowercase hex SHA-512 of the written file
    pub sha512: String,
}

impl Fetched {
    /// Check the fetched body against an expected SHA-512.
    ///
    /// An empty expectation is skipped; the removal of the bad file is left
    /// to the caller.
    pub fn verify(&self, path: &Path, expected_sha512: Option<&str>) -> Result<()> {
        match expected_sha512.filter(|h| !h.is_empty()) {
            Some(expected) if !expected.eq_ignore_ascii_case(&self.sha512) => Err(Error::HashMismatch {
                path: path.display().to_string(),
                expected: expected.to_string(),
                computed: self.sha512.clone(),
            }),
            _ => Ok(()),
        }
    }
}

/// Moves remote bytes to local files
pub trait Fetcher: Send + Sync {
    /// Download `url` to `dest`, creating parent directories.
    fn fetch(&self, url: &str, dest: &Path) -> Result<Fetched>;
}

/// Blocking HTTP fetcher
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    progress: Option<ProgressCallback>,
}

impl HttpFetcher {
    pub fn new(timeout_seconds: u64, user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(1)))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            progress: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.catalog.timeout_seconds, &config.catalog.user_agent)
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        tracing::debug!(url, "fetching");

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                Error::CatalogUnavailable(format!("download of {} timed out", url))
            } else {
                Error::CatalogUnavailable(format!("download of {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::CatalogUnavailable(format!(
                "download of {} failed: HTTP {}",
                url,
                status.as_u16()
            )));
        }

        Ok(response)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<Fetched> {
        let mut response = self.get(url)?;
        let total = response.content_length().unwrap_or(0);
        let label = format!(
            "Downloading {}",
            dest.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| url.to_string())
        );

        let progress = self.progress.clone();
        write_streamed(&mut response, dest, |written| {
            if let Some(ref cb) = progress {
                cb(&label, written, total);
            }
        })
    }
}

/// Temporary name used while a download is in flight
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Stream `reader` into `dest` through its `.part` file, hashing as it goes.
///
/// `on_chunk` receives the running byte count after every chunk.
pub fn write_streamed<R: Read>(reader: &mut R, dest: &Path, mut on_chunk: impl FnMut(u64)) -> Result<Fetched> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let part = part_path(dest);
    let result = (|| -> Result<Fetched> {
        let mut file = File::create(&part)?;
        let mut hasher = Sha512::new();
        let mut buffer = vec![0; CHUNK_SIZE];
        let mut written: u64 = 0;

        loop {
            let n = reader.read(&mut buffer).map_err(|e| {
                Error::CatalogUnavailable(format!("connection dropped while downloading: {}", e))
            })?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n])?;
            hasher.update(&buffer[..n]);
            written += n as u64;
            on_chunk(written);
        }

        file.sync_all()?;
        Ok(Fetched {
            size: written,
            sha512: hex::encode(hasher.finalize()),
        })
    })();

    match result {
        Ok(fetched) => {
            fs::rename(&part, dest)?;
            tracing::debug!(path = %dest.display(), size = fetched.size, "fetched");
            Ok(fetched)
        }
        Err(e) => {
            let _ = fs::remove_file(&part);
            Err(e)
        }
    }
}
