//! HTTP downloads for vendor install scripts.
//!
//! Only two URLs are ever fetched: the Homebrew installer and the dotfiles
//! engine installer. Anything other than `200 OK` is fatal.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::error::{DotstrapError, Result};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Downloads a URL into memory.
pub trait Fetcher: Send + Sync {
    fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches over HTTP/HTTPS with a blocking client.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the default 60-second timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("dotstrap")
            .timeout(timeout)
            .build()
            .map_err(|e| DotstrapError::Other(anyhow::anyhow!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Fetcher for HttpFetcher {
    fn download(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().map_err(|e| network(url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DotstrapError::Network {
                url: url.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let body = response.bytes().map_err(|e| network(url, e))?;
        Ok(body.to_vec())
    }
}

fn network(url: &str, err: reqwest::Error) -> DotstrapError {
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    DotstrapError::Network {
        url: url.to_string(),
        message,
    }
}

/// A downloaded script on disk. The file is deleted when dropped.
#[derive(Debug)]
pub struct DownloadedScript {
    file: NamedTempFile,
}

impl DownloadedScript {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Download `url` into an executable temporary file.
pub fn download_script(fetcher: &dyn Fetcher, url: &str) -> Result<DownloadedScript> {
    let body = fetcher.download(url)?;

    let mut file = tempfile::Builder::new()
        .prefix("dotstrap-")
        .suffix(".sh")
        .tempfile()?;
    file.write_all(&body)
        .map_err(|e| DotstrapError::filesystem(file.path(), e))?;
    file.flush()
        .map_err(|e| DotstrapError::filesystem(file.path(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o755))
            .map_err(|e| DotstrapError::filesystem(file.path(), e))?;
    }

    tracing::debug!("Saved {} to {}", url, file.path().display());
    Ok(DownloadedScript { file })
}

/// In-memory fetcher for tests. Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    bodies: Mutex<HashMap<String, std::result::Result<Vec<u8>, u16>>>,
    requested: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn serve(&self, url: &str, body: &str) -> &Self {
        if let Ok(mut bodies) = self.bodies.lock() {
            bodies.insert(url.to_string(), Ok(body.as_bytes().to_vec()));
        }
        self
    }

    /// Answer `url` with an HTTP error status.
    pub fn fail(&self, url: &str, status: u16) -> &Self {
        if let Ok(mut bodies) = self.bodies.lock() {
            bodies.insert(url.to_string(), Err(status));
        }
        self
    }

    /// URLs requested so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Fetcher for MemoryFetcher {
    fn download(&self, url: &str) -> Result<Vec<u8>> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(url.to_string());
        }
        let entry = self
            .bodies
            .lock()
            .ok()
            .and_then(|bodies| bodies.get(url).cloned())
            .unwrap_or(Err(404));
        entry.map_err(|status| DotstrapError::Network {
            url: url.to_string(),
            message: format!("HTTP {}", status),
        })
    }
}
