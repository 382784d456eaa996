//! # HTTP Retrieval Utilities
//!
//! A thin asynchronous JSON client around `reqwest`. It joins relative paths
//! onto a base URL, applies a request timeout and a user agent, and reports
//! non-success statuses as data instead of errors so callers decide what a
//! failure means.
//!
//! Requests are not retried; a failure is reported once.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::error::LoadError;

/// A standardized container for API responses.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// Asynchronous JSON-over-HTTP client bound to one base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for `base_url` with the given request timeout.
    ///
    /// # Errors
    /// `LoadError::Url` if `base_url` is not an absolute URL, and
    /// `LoadError::Request` if the TLS backend cannot be initialized.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LoadError> {
        let base_url = Url::parse(base_url)?;
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ordfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LoadError::Request(e.to_string()))?;

        Ok(Self { inner, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Performs a GET on `path` (relative to the base URL).
    ///
    /// # Errors
    /// `LoadError::Request` on network failure, `LoadError::Malformed` if a
    /// success body is not valid JSON for `T`.
    pub async fn get<T>(&self, path: &str) -> Result<ApiResponse<T>, LoadError>
    where
        T: DeserializeOwned,
    {
        let full_url = self.base_url.join(path)?;
        log::debug!("GET {}", full_url);

        let response = self
            .inner
            .get(full_url)
            .send()
            .await
            .map_err(|e| LoadError::Request(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();

        if status.is_success() {
            let body = response
                .bytes()
                .await
                .map_err(|e| LoadError::Request(e.to_string()))?;
            let data = serde_json::from_slice::<T>(&body).map_err(|e| LoadError::Malformed(e.to_string()))?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers,
            })
        } else {
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
                headers,
            })
        }
    }
}
