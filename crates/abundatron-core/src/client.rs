//! Blocking HTTP client for the INSPECT calculators.

use crate::domain::{AbundanceResult, InspectError, InspectResult, Query, SpectralLine};
use crate::parser::{parse_line_catalog, parse_result_block};
use crate::traits::AbundanceService;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://www.inspect-stars.com";
pub const USER_AGENT: &str = concat!("abundatron/", env!("CARGO_PKG_VERSION"));

/// Statuses treated as transient and retried.
const RETRYABLE_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Retry policy for calculator requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Backoff multiplier applied per retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            multiplier,
        }
    }

    /// `initial_delay * multiplier^retry`, capped at `max_delay`.
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let delay_ms = (self.initial_delay.as_millis() as f64
            * self.multiplier.powi(retry as i32))
        .min(self.max_delay.as_millis() as f64) as u64;
        Duration::from_millis(delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub method: HttpMethod,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            method: HttpMethod::Get,
            retry: RetryPolicy::default(),
        }
    }
}

/// Why a single attempt failed in a way worth retrying.
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("request timed out: {0}")]
    Timeout(reqwest::Error),
    #[error("request failed: {0}")]
    Transport(reqwest::Error),
    #[error("failed to read response body: {0}")]
    Body(reqwest::Error),
}

pub struct InspectClient {
    http: Client,
    base_url: String,
    method: HttpMethod,
    retry: RetryPolicy,
}

impl InspectClient {
    pub fn new(config: ClientConfig) -> InspectResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| {
                InspectError::internal(
                    "INTERNAL.HTTP_CLIENT",
                    format!("failed to build HTTP client: {error}"),
                )
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            method: config.method,
            retry: config.retry,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Sends the request built by `build`, retrying transient failures, and
    /// returns the response body.
    fn send_with_retry<F>(&self, description: &str, build: F) -> InspectResult<String>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retry = 0;
        loop {
            let failure = match build().send() {
                Ok(response) if response.status().is_success() => match response.text() {
                    Ok(body) => return Ok(body),
                    Err(error) => AttemptError::Body(error),
                },
                Ok(response) if RETRYABLE_STATUSES.contains(&response.status()) => {
                    AttemptError::Status(response.status())
                }
                Ok(response) => {
                    return Err(InspectError::network(
                        "NET.STATUS",
                        format!("{description} failed with HTTP {}", response.status()),
                    ));
                }
                Err(error) if error.is_timeout() => AttemptError::Timeout(error),
                Err(error) => AttemptError::Transport(error),
            };

            if retry >= self.retry.max_retries {
                return Err(InspectError::network(
                    "NET.RETRIES_EXHAUSTED",
                    format!(
                        "{description} failed after {} attempt(s): {failure}",
                        retry + 1
                    ),
                ));
            }

            let delay = self.retry.calculate_delay(retry);
            warn!(
                retry = retry + 1,
                delay_ms = delay.as_millis() as u64,
                "{description}: {failure}; retrying"
            );
            std::thread::sleep(delay);
            retry += 1;
        }
    }
}

impl AbundanceService for InspectClient {
    fn line_catalog(&self, element: &str) -> InspectResult<Vec<SpectralLine>> {
        // The LTE form page carries the same dropdown as the EW one.
        let url = self.endpoint(crate::domain::CalculationMode::Lte.endpoint_path());
        debug!(%url, element, "fetching line catalog");
        let body = self.send_with_retry("line catalog request", || {
            self.http.get(&url).query(&[("element_name", element)])
        })?;
        parse_line_catalog(&body, element)
    }

    fn submit(&self, query: &Query) -> InspectResult<AbundanceResult> {
        let url = self.endpoint(query.mode.endpoint_path());
        let fields = query.form_fields();
        debug!(%url, mode = %query.mode, value = query.value, wi = query.line.index, "submitting query");
        let body = self.send_with_retry("calculator request", || match self.method {
            HttpMethod::Get => self.http.get(&url).query(&fields),
            HttpMethod::Post => self.http.post(&url).form(&fields),
        })?;
        parse_result_block(&body)
    }
}
