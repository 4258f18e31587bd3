//! # HTTP Retrieval Utilities
//!
//! A small asynchronous API client around `reqwest`, with middleware support
//! for transient-error retries. The snapshot fetcher builds it with zero
//! retries: the initial load is a single attempt.

use std::time::Duration;

use reqwest::Url;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

/// Error bodies longer than this are cut before being logged.
const MAX_ERROR_BODY: usize = 512;

/// Raw outcome of one request.
#[derive(Debug)]
pub struct ApiResponse {
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The full body on success; the (truncated) error body otherwise.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Body as lossy UTF-8, for error reporting.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Asynchronous HTTP client bound to one base URL.
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL to which all relative paths are joined.
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Absolute base URL; relative paths are joined onto it.
    /// * `timeout` - Per-request timeout.
    /// * `max_retries` - Retries on transient failures (0 = single attempt).
    ///
    /// # Errors
    /// Fails if the underlying `reqwest` client cannot be built.
    pub fn new(base_url: Url, timeout: Duration, max_retries: u32) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("FleetDashboard/1.0")
            .build()?;

        let mut builder = ClientBuilder::new(http);
        if max_retries > 0 {
            let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(Self {
            inner: builder.build(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Performs a GET on `path` (relative to the base URL).
    ///
    /// Non-2xx responses are not errors here; they come back with
    /// `success == false` so the caller can decide.
    ///
    /// # Errors
    /// Returns an `anyhow::Error` if URL joining, the network exchange or
    /// reading the body fails.
    pub async fn get(&self, path: &str) -> anyhow::Result<ApiResponse> {
        let full_url = self.base_url.join(path)?;
        log::debug!("GET {}", full_url);

        let response = self.inner.get(full_url).send().await?;
        let status = response.status();
        let success = status.is_success();

        let mut body = response.bytes().await?.to_vec();
        if !success {
            body.truncate(MAX_ERROR_BODY);
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            success,
            body,
        })
    }
}
