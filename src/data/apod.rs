//! NASA APOD API client
//!
//! This module fetches per-date metadata from the APOD endpoint and downloads
//! picture bytes to local storage.

use chrono::NaiveDate;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::ApodMetadata;

/// Base URL for the APOD API
pub const DEFAULT_API_URL: &str = "https://api.nasa.gov/planetary/apod";

/// File name used when a URL has no usable final path segment
const FALLBACK_FILENAME: &str = "image.jpg";

/// Errors that can occur when talking to the APOD service
#[derive(Debug, Error)]
pub enum ApodError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Writing the downloaded bytes failed
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Source of APOD metadata and picture bytes
pub trait ApodSource {
    /// Fetches the metadata published for `date`
    fn fetch_metadata(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<ApodMetadata, ApodError>> + Send;

    /// Downloads `url` to `dest`, returning the number of bytes written
    ///
    /// `dest` must only exist once the whole body has been written.
    fn download(
        &self,
        url: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<u64, ApodError>> + Send;
}

/// Client for the APOD API
#[derive(Debug, Clone)]
pub struct ApodClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ApodClient {
    /// Creates a client for `base_url` whose requests give up after `timeout`
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApodError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cosmowall/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, api_key, base_url))
    }

    /// Creates a client with a custom HTTP client
    pub fn with_client(
        client: Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }
}

impl ApodSource for ApodClient {
    async fn fetch_metadata(&self, date: NaiveDate) -> Result<ApodMetadata, ApodError> {
        let date_param = date.format("%Y-%m-%d").to_string();
        tracing::debug!(date = %date_param, "fetching APOD metadata");

        // The request URL carries the API key, keep it out of error messages
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("api_key", self.api_key.as_str()), ("date", date_param.as_str())])
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApodError::Status {
                url: self.base_url.clone(),
                status,
            });
        }

        let text = response.text().await.map_err(reqwest::Error::without_url)?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, ApodError> {
        tracing::debug!(url, dest = %dest.display(), "downloading image");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApodError::Status {
                url: url.to_string(),
                status,
            });
        }

        let part = partial_path(dest);
        match write_body(response, &part).await {
            Ok(written) => {
                fs::rename(&part, dest).await.map_err(|source| ApodError::Io {
                    path: dest.to_path_buf(),
                    source,
                })?;
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&part).await;
                Err(e)
            }
        }
    }
}

/// Streams the response body into `path`
async fn write_body(response: reqwest::Response, path: &Path) -> Result<u64, ApodError> {
    let io_err = |source: io::Error| ApodError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(path).await.map_err(io_err)?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await.map_err(io_err)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(io_err)?;
    Ok(written)
}

/// Temporary sibling path used while a file is being written
pub(crate) fn partial_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string());
    dest.with_file_name(format!(".{}.part", name))
}

/// File name for a downloaded picture: the last segment of the URL path
///
/// Query strings and fragments are ignored. Falls back to `image.jpg` when
/// the path ends in a slash or is empty.
pub fn image_filename(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    match path.split_once('/') {
        Some((_host, path)) => path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| FALLBACK_FILENAME.to_string()),
        None => FALLBACK_FILENAME.to_string(),
    }
}
