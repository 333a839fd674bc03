//! # HTTP Retrieval Utilities
//!
//! An asynchronous JSON client around `reqwest`. Requests go through
//! `RetryTransientMiddleware`, so connection failures and retryable statuses (5xx, 408, 429)
//! are retried with exponential backoff before the caller sees them.

use std::time::Duration;

use reqwest::{Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;

use crate::error::SourceError;

/// Per-request timeout applied by the underlying client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A decoded response plus the transaction metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The deserialized body, present on 2xx.
    pub data: Option<T>,
    /// The raw body of a non-2xx response.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Whether the status was in the 2xx range.
    pub success: bool,
}

impl<T> ApiResponse<T> {
    /// Returns the body of a 2xx response, or `SourceError::Unavailable` otherwise.
    pub fn into_data(self) -> Result<T, SourceError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(SourceError::Unavailable {
                status: self.status,
                body: self.error_body.unwrap_or_default(),
            }),
        }
    }
}

/// A JSON client bound to one base URL.
pub struct ApiClient {
    inner: ClientWithMiddleware,
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for `base_url` that retries transient failures `max_retries` times.
    ///
    /// A missing trailing slash on `base_url` is added, so relative paths join under it.
    ///
    /// # Errors
    /// `SourceError::Transport` if the URL is not absolute or the client cannot be built.
    pub fn new(base_url: &str, user_agent: &str, max_retries: u32) -> Result<Self, SourceError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let url = Url::parse(&normalized)
            .map_err(|e| SourceError::Transport(format!("invalid base URL '{base_url}': {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner: client,
            base_url: url,
        })
    }

    /// The base every request path is joined to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Performs a `GET` on `path` relative to the base URL.
    ///
    /// Non-2xx statuses are returned as an unsuccessful [`ApiResponse`], not as an error.
    ///
    /// # Errors
    /// `Transport` when no response arrived, `Decode` when a 2xx body is not valid `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, SourceError> {
        // 1. Construct the full absolute URL
        let full_url = self
            .base_url
            .join(path)
            .map_err(|e| SourceError::Transport(format!("invalid path '{path}': {e}")))?;

        // 2. Execute through the retry middleware
        let response = self
            .inner
            .request(Method::GET, full_url)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        let status = response.status();

        // 3. Decode on success, keep the raw body otherwise
        if status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| SourceError::Transport(e.to_string()))?;
            let data = serde_json::from_str::<T>(&text).map_err(|e| SourceError::Decode(e.to_string()))?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
            })
        } else {
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
            })
        }
    }
}
