use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use movequote_core::rates::RateTable;
use reqwest::header::{CACHE_CONTROL, PRAGMA, USER_AGENT};
use reqwest::Client;
use thiserror::Error;

const AGENT: &str = concat!("movequote/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum RateSourceError {
    #[error("could not build http client: {0}")]
    Client(String),
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("could not read `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("{source_name}: {message}")]
    Parse { source_name: String, message: String },
    #[error("every rate source failed: {}", .0.join("; "))]
    Exhausted(Vec<String>),
}

impl RateSourceError {
    pub(crate) fn parse(source_name: &str, message: impl Into<String>) -> Self {
        Self::Parse { source_name: source_name.to_string(), message: message.into() }
    }
}

/// One place a rate table can be fetched from.
#[async_trait]
pub trait RateSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> Result<RateTable, RateSourceError>;
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, RateSourceError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| RateSourceError::Client(error.to_string()))
}

/// Appends a timestamp parameter so intermediate caches never serve a stale export.
pub(crate) fn cache_busted(url: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}_={millis}")
}

pub(crate) async fn fetch_text(client: &Client, url: &str) -> Result<String, RateSourceError> {
    let request_url = cache_busted(url);
    let response = client
        .get(&request_url)
        .header(USER_AGENT, AGENT)
        .header(CACHE_CONTROL, "no-cache")
        .header(PRAGMA, "no-cache")
        .send()
        .await
        .map_err(|error| RateSourceError::Request { url: url.to_string(), message: error.to_string() })?;

    if !response.status().is_success() {
        return Err(RateSourceError::Status { url: url.to_string(), status: response.status().as_u16() });
    }

    response
        .text()
        .await
        .map_err(|error| RateSourceError::Request { url: url.to_string(), message: error.to_string() })
}
