//! Retry logic with bounded exponential backoff, and the resilient fetcher built on it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::ProviderId;

/// Backoff strategy for retrying failed requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Uses an exponential delay between retries.
    ///
    /// The delay is `multiplier * factor ^ retry`, clamped to `[min, max]`.
    Exponential {
        /// Scale of the first retry before clamping.
        multiplier: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// Lower bound of any delay.
        min: Duration,
        /// Upper bound of any delay.
        max: Duration,
        /// Whether to apply random jitter (+/- 50%) before clamping.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            multiplier: Duration::from_secs(1),
            factor: 2.0,
            min: Duration::from_secs(4),
            max: Duration::from_secs(10),
            jitter: false,
        }
    }
}

impl Backoff {
    /// Delay before retry number `retry` (0-based: `0` is the wait before the second attempt).
    pub fn delay(self, retry: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                multiplier,
                factor,
                min,
                max,
                jitter,
            } => {
                let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
                let mut seconds = multiplier.as_secs_f64() * factor.powi(exponent);

                if jitter {
                    let spread = seconds * 0.5;
                    seconds += (fastrand::f64() * 2.0 - 1.0) * spread;
                }

                let upper = max.as_secs_f64().max(min.as_secs_f64());
                let clamped = if seconds.is_finite() {
                    seconds.clamp(min.as_secs_f64(), upper)
                } else {
                    upper
                };
                Duration::from_secs_f64(clamped)
            }
        }
    }
}

/// Retry policy handed to the fetcher. Inspectable and usable on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never less than one.
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Statuses answering "this resource does not exist". Never retried.
    pub permanent_status: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
            permanent_status: vec![404, 410],
        }
    }
}

impl RetryPolicy {
    /// Policy with a single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn is_permanent_status(&self, status: u16) -> bool {
        self.permanent_status.contains(&status)
    }

    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }

    /// Classifies a non-success HTTP status.
    pub fn classify_status(&self, status: u16, url: &str) -> SourceError {
        if self.is_permanent_status(status) {
            SourceError::not_found(format!("upstream returned {status} for {url}"))
        } else {
            SourceError::transient(format!("upstream returned {status} for {url}"))
        }
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent. Delays are applied only between attempts and
    /// the last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.retryable() && attempt < max_attempts => {
                    let delay = self.delay_for_retry(attempt - 1);
                    tracing::warn!(
                        upstream = label,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "transient upstream failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    if error.retryable() {
                        tracing::warn!(upstream = label, attempt, error = %error, "retry budget exhausted");
                    }
                    return Err(error);
                }
            }
        }
    }
}

/// Issues requests to one upstream through an [`HttpClient`] under a [`RetryPolicy`].
#[derive(Clone)]
pub struct Fetcher {
    http_client: Arc<dyn HttpClient>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(http_client: Arc<dyn HttpClient>, policy: RetryPolicy) -> Self {
        Self {
            http_client,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches and decodes a response. A decode failure counts as a malformed
    /// payload and is retried like any other transient failure.
    pub async fn fetch_with<T, D>(
        &self,
        provider: ProviderId,
        request: HttpRequest,
        decode: D,
    ) -> Result<T, SourceError>
    where
        D: Fn(&HttpResponse) -> Result<T, SourceError> + Send + Sync,
    {
        let url = request.full_url();
        self.policy
            .run(provider.as_str(), || async {
                let response = self
                    .http_client
                    .execute(request.clone())
                    .await
                    .map_err(|error| transport_error(&error, &url))?;
                if !response.is_success() {
                    return Err(self.policy.classify_status(response.status, &url));
                }
                decode(&response)
            })
            .await
            .map_err(|error| error.with_provider(provider))
    }
}

fn transport_error(error: &HttpError, url: &str) -> SourceError {
    if error.retryable() {
        SourceError::transient(format!("request to {url} failed: {error}"))
    } else {
        SourceError::invalid_request(format!("request to {url} failed: {error}"))
    }
}
