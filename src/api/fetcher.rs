//! Fetcher API client
//!
//! Talks to the catalog backend's tRPC `fetcher` router. Each procedure is a
//! POST of the raw JSON input; successful answers come wrapped in
//! `{"result":{"data": ...}}`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::{Episode, Show};

/// Default backend location (Next.js dev server)
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/trpc";

/// Errors from a single request attempt
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Server returned HTTP {0}")]
    Status(u16),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// The three remote operations the catalog is built on
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Free-text show search
    async fn search(&self, text: &str) -> Result<Vec<Show>, ApiError>;

    /// Episodes of the show at `path`
    async fn episodes(&self, path: &str) -> Result<Vec<Episode>, ApiError>;

    /// Stream URLs for the episode at `path`
    async fn servers(&self, path: &str) -> Result<Vec<String>, ApiError>;
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct SearchInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct PathInput<'a> {
    path: &'a str,
}

/// tRPC response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<EnvelopeResult<T>>,
    error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeResult<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    #[serde(default)]
    message: String,
}

/// Procedure output: `{ data: [...] }`
#[derive(Debug, Deserialize)]
struct DataOutput<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

// =============================================================================
// Client
// =============================================================================

/// HTTP client for the fetcher router
pub struct FetcherClient {
    base_url: String,
    client: reqwest::Client,
}

impl FetcherClient {
    /// Create a client for the default backend
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_URL)
    }

    /// Create a client with a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call a procedure and unwrap the envelope
    async fn call<I, T>(&self, procedure: &str, input: &I) -> Result<Vec<T>, ApiError>
    where
        I: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, procedure);
        tracing::debug!(%url, "calling fetcher");

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(input)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let envelope: Envelope<DataOutput<T>> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(ApiError::Status(status.as_u16())),
            Err(e) => {
                return Err(ApiError::InvalidResponse(format!("JSON parse error: {}", e)));
            }
        };

        if let Some(err) = envelope.error {
            return Err(ApiError::Remote(err.message));
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        envelope
            .result
            .map(|r| r.data.data)
            .ok_or_else(|| ApiError::InvalidResponse("missing result".into()))
    }
}

impl Default for FetcherClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogApi for FetcherClient {
    async fn search(&self, text: &str) -> Result<Vec<Show>, ApiError> {
        self.call("fetcher.search", &SearchInput { text }).await
    }

    async fn episodes(&self, path: &str) -> Result<Vec<Episode>, ApiError> {
        self.call("fetcher.getEpisodes", &PathInput { path }).await
    }

    async fn servers(&self, path: &str) -> Result<Vec<String>, ApiError> {
        self.call("fetcher.getServers", &PathInput { path }).await
    }
}
