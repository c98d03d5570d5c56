//! HTTP fetcher for review pages
//!
//! This module handles all requests to the review API, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Building the page URL and its fixed query parameters
//! - Classifying responses and transport errors as transient or fatal
//! - Retrying transient failures with bounded exponential backoff

use crate::config::ApiConfig;
use crate::crawler::retry::RetryPolicy;
use crate::review::{AppId, Cursor};
use crate::FetchError;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// How a response status is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx: the body is the page
    Success,
    /// 429 or 5xx: retry after a delay
    Retryable,
    /// Any other status: give up immediately
    Fatal,
}

/// Classifies an HTTP status for retry purposes
///
/// | Condition | Action |
/// |-----------|--------|
/// | 2xx | Success |
/// | HTTP 429 | Retry with backoff |
/// | HTTP 5xx | Retry with backoff |
/// | Other 4xx, 3xx, 1xx | Fatal, no retry |
pub fn classify_status(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusClass::Retryable
    } else {
        StatusClass::Fatal
    }
}

/// Returns true if a transport-level error is worth retrying
fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request() || err.is_decode()
}

/// Reads a `Retry-After` header given in whole seconds
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use review_crawler::config::ApiConfig;
/// use review_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&ApiConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues page requests against the review endpoint
pub struct Fetcher {
    client: Client,
    api: ApiConfig,
    retry: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher with a freshly built client
    pub fn new(api: ApiConfig, retry: RetryPolicy) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&api)?;
        Ok(Self::with_client(client, api, retry))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, api: ApiConfig, retry: RetryPolicy) -> Self {
        Self { client, api, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// URL of the review feed for `app_id`
    pub fn page_url(&self, app_id: AppId) -> String {
        format!(
            "{}/appreviews/{}",
            self.api.endpoint.trim_end_matches('/'),
            app_id
        )
    }

    /// Query parameters for one page request
    pub fn page_query(&self, cursor: &Cursor, page_size: u32) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("json", "1".to_string()),
            ("cursor", cursor.as_str().to_string()),
            ("num_per_page", page_size.to_string()),
            ("filter", self.api.review_filter.clone()),
            ("language", self.api.language.clone()),
            ("purchase_type", self.api.purchase_type.clone()),
        ];
        if let Some(days) = self.api.day_range {
            query.push(("day_range", days.to_string()));
        }
        query
    }

    /// URL of the store's app-details lookup
    pub fn app_details_url(&self) -> String {
        format!("{}/api/appdetails", self.api.endpoint.trim_end_matches('/'))
    }

    /// Fetches one page body, retrying transient failures
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The raw JSON body of the page
    /// * `Err(FetchError::Exhausted)` - Every allowed attempt failed transiently
    /// * `Err(FetchError::Fatal)` - A non-retryable status or transport error
    pub async fn fetch(
        &self,
        app_id: AppId,
        cursor: &Cursor,
        page_size: u32,
    ) -> Result<String, FetchError> {
        let url = self.page_url(app_id);
        let query = self.page_query(cursor, page_size);
        self.get_with_retry(&url, &query, &format!("cursor {}", cursor))
            .await
    }

    /// Fetches the store's app-details body for `app_id`
    ///
    /// Uses the same retry policy as page requests.
    pub async fn fetch_app_details(&self, app_id: AppId) -> Result<String, FetchError> {
        let url = self.app_details_url();
        let query = [("appids", app_id.to_string())];
        self.get_with_retry(&url, &query, &format!("app details of {}", app_id))
            .await
    }

    /// Retry loop shared by every request; `what` names the request in logs
    async fn get_with_retry(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<String, FetchError> {
        let mut backoff = self.retry.backoff();

        loop {
            let attempt = backoff.start_attempt();
            let (reason, hint) = match self.get_once(url, query).await {
                Ok(body) => return Ok(body),
                Err(FetchError::Transient {
                    reason,
                    retry_after,
                }) => (reason, retry_after),
                Err(other) => return Err(other),
            };

            match backoff.retry_after_failure(hint) {
                Some(delay) => {
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        self.retry.max_attempts(),
                        what,
                        reason,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::error!(
                        "Giving up on {} after {} attempts: {}",
                        what,
                        backoff.attempts(),
                        reason
                    );
                    return Err(FetchError::Exhausted {
                        attempts: backoff.attempts(),
                        last: reason,
                    });
                }
            }
        }
    }

    /// Sends a single request and classifies the outcome
    async fn get_once(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        tracing::debug!("GET {} {:?}", url, query);

        let response = match self.client.get(url).query(query).send().await {
            Ok(response) => response,
            Err(e) if is_retryable_error(&e) => {
                return Err(FetchError::Transient {
                    reason: e.to_string(),
                    retry_after: None,
                })
            }
            Err(e) => {
                return Err(FetchError::Fatal {
                    status: None,
                    message: e.to_string(),
                })
            }
        };

        let status = response.status();
        match classify_status(status) {
            StatusClass::Success => {}
            StatusClass::Retryable => {
                return Err(FetchError::Transient {
                    reason: format!("HTTP {}", status.as_u16()),
                    retry_after: retry_after(&response),
                })
            }
            StatusClass::Fatal => {
                return Err(FetchError::Fatal {
                    status: Some(status.as_u16()),
                    message: format!("HTTP {} from {}", status.as_u16(), url),
                })
            }
        }

        response.text().await.map_err(|e| FetchError::Transient {
            reason: format!("failed to read body: {}", e),
            retry_after: None,
        })
    }
}
