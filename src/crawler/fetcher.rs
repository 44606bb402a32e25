//! HTTP fetcher implementation
//!
//! This module handles every request of a run, including:
//! - Building the HTTP client with the crawler's user agent
//! - Admission through the shared [`Scheduler`]
//! - Retry with exponential backoff and jitter for transient failures
//! - Error classification (transient vs permanent)
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 404 / 410 / other 4xx | Immediate → Permanent |
//! | HTTP 408 / 429 / 5xx | Retry with backoff → Transient |
//! | Timeout / connection error | Retry with backoff → Transient |
//! | Body read error | Retry with backoff → Transient |
//! | Body not decodable | Immediate → Permanent |
//! | Redirect chain > 10 | Immediate → Permanent |
//!
//! A whole call never takes longer than `timeout * (max_retries + 1)`.

use crate::config::{FetcherConfig, UserAgentConfig};
use crate::crawler::scheduler::Scheduler;
use crate::url::host_key;
use chrono::{DateTime, Utc};
use reqwest::{header, redirect::Policy, Client, StatusCode};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

/// Redirect hops followed before a fetch fails permanently
const MAX_REDIRECTS: usize = 10;

/// What a request is for; used in logs and accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Listing,
    Detail,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Detail => "detail",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful (2xx) response
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    /// Attempts it took, including the successful one
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Retrying later may succeed
    Transient,
    /// Retrying would not help
    Permanent,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => f.write_str("transient"),
            Self::Permanent => f.write_str("permanent"),
        }
    }
}

/// Why a fetch failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("body error: {0}")]
    Body(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("time budget exhausted")]
    BudgetExhausted,

    #[error("{0}")]
    Other(String),
}

/// A fetch that did not produce a 2xx response
#[derive(Debug, Clone, Error)]
#[error("{kind} failure fetching {url} after {attempts} attempt(s): {reason}")]
pub struct FetchError {
    pub url: String,
    pub kind: FetchErrorKind,
    pub reason: FetchFailure,
    pub attempts: u32,
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        self.kind == FetchErrorKind::Transient
    }

    /// 404 and 410: the resource is gone
    pub fn is_gone(&self) -> bool {
        matches!(self.reason, FetchFailure::Status(404) | FetchFailure::Status(410))
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use cws_lister::config::{FetcherConfig, UserAgentConfig};
/// use cws_lister::crawler::build_http_client;
///
/// let client =
///     build_http_client(&UserAgentConfig::default(), &FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    config: &FetcherConfig,
) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_millis(config.timeout_ms);

    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Exponential backoff with 50%-150% jitter
///
/// `attempt` is 1-based: the delay before the second attempt uses 1.
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(32) as i32;
    let exponential = (base_ms as f64 * 2f64.powi(exponent)) as u64;
    let capped = exponential.min(max_ms);

    let jitter_factor = 0.5 + fastrand::f64();
    Duration::from_millis((capped as f64 * jitter_factor) as u64)
}

/// Outcome of one attempt that did not succeed
struct AttemptFailure {
    reason: FetchFailure,
    kind: FetchErrorKind,
}

impl AttemptFailure {
    fn transient(reason: FetchFailure) -> Self {
        Self {
            reason,
            kind: FetchErrorKind::Transient,
        }
    }

    fn permanent(reason: FetchFailure) -> Self {
        Self {
            reason,
            kind: FetchErrorKind::Permanent,
        }
    }
}

struct FetcherInner {
    client: Client,
    scheduler: Scheduler,
    config: FetcherConfig,
    retries: AtomicU64,
    requests: AtomicU64,
}

/// Rate-limited, retrying HTTP fetcher
///
/// Cheap to clone; clones share the client, the scheduler and the counters.
#[derive(Clone)]
pub struct Fetcher {
    inner: Arc<FetcherInner>,
}

impl Fetcher {
    pub fn new(client: Client, config: FetcherConfig) -> Self {
        let scheduler = Scheduler::new(
            config.max_concurrency,
            Duration::from_millis(config.min_interval_ms),
        );

        Self {
            inner: Arc::new(FetcherInner {
                client,
                scheduler,
                config,
                retries: AtomicU64::new(0),
                requests: AtomicU64::new(0),
            }),
        }
    }

    /// Builds the client from the configuration and wraps it
    pub fn from_config(
        user_agent: &UserAgentConfig,
        config: &FetcherConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, config)?;
        Ok(Self::new(client, config.clone()))
    }

    /// Retries performed so far, across all clones
    pub fn retries(&self) -> u64 {
        self.inner.retries.load(Ordering::Relaxed)
    }

    /// Attempts sent so far, across all clones
    pub fn requests(&self) -> u64 {
        self.inner.requests.load(Ordering::Relaxed)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Longest a single [`Fetcher::fetch`] call may take
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.inner.config.timeout_ms)
            .saturating_mul(self.inner.config.max_retries + 1)
    }

    /// Fetches `url`, retrying transient failures
    pub async fn fetch(&self, url: &str, kind: RequestKind) -> Result<RawResponse, FetchError> {
        let config = &self.inner.config;
        let fail = |kind, reason, attempts| FetchError {
            url: url.to_string(),
            kind,
            reason,
            attempts,
        };

        let parsed = Url::parse(url).map_err(|e| {
            fail(
                FetchErrorKind::Permanent,
                FetchFailure::InvalidUrl(e.to_string()),
                0,
            )
        })?;
        let host = host_key(&parsed).ok_or_else(|| {
            fail(
                FetchErrorKind::Permanent,
                FetchFailure::InvalidUrl("missing host".to_string()),
                0,
            )
        })?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let deadline = Instant::now() + self.budget();
        let mut attempts = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(fail(
                    FetchErrorKind::Transient,
                    FetchFailure::BudgetExhausted,
                    attempts,
                ));
            }

            attempts += 1;
            let attempt = self.attempt(&parsed, &host, timeout.min(remaining));
            let failure = match tokio::time::timeout(remaining, attempt).await {
                Ok(Ok(mut response)) => {
                    response.attempts = attempts;
                    tracing::debug!(
                        "Fetched {} {} ({} attempt(s))",
                        kind,
                        url,
                        attempts
                    );
                    return Ok(response);
                }
                Ok(Err(failure)) => failure,
                Err(_) => AttemptFailure::transient(FetchFailure::BudgetExhausted),
            };

            if failure.kind == FetchErrorKind::Permanent || attempts > config.max_retries {
                return Err(fail(failure.kind, failure.reason, attempts));
            }

            let delay = backoff_delay(attempts, config.backoff_base_ms, config.backoff_max_ms);
            let remaining = deadline.saturating_duration_since(Instant::now());
            if delay >= remaining {
                return Err(fail(failure.kind, failure.reason, attempts));
            }

            tracing::debug!(
                "Retrying {} {} in {:?} after attempt {}: {}",
                kind,
                url,
                delay,
                attempts,
                failure.reason
            );
            self.inner.retries.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(delay).await;
        }
    }

    /// One admitted request and its classification
    async fn attempt(
        &self,
        url: &Url,
        host: &str,
        timeout: Duration,
    ) -> Result<RawResponse, AttemptFailure> {
        let _slot = self
            .inner
            .scheduler
            .acquire(host)
            .await
            .ok_or_else(|| AttemptFailure::permanent(FetchFailure::Other("scheduler closed".into())))?;

        self.inner.requests.fetch_add(1, Ordering::Relaxed);

        let response = self
            .inner
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = retry_after(&response).unwrap_or_else(|| {
                    Duration::from_millis(self.inner.config.backoff_base_ms)
                });
                let retry_after =
                    retry_after.min(Duration::from_millis(self.inner.config.backoff_max_ms));
                self.inner
                    .scheduler
                    .mark_rate_limited(host, retry_after)
                    .await;
            }
            return Err(classify_status(status));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(|e| {
            if e.is_decode() {
                AttemptFailure::permanent(FetchFailure::Body(e.to_string()))
            } else if e.is_timeout() {
                AttemptFailure::transient(FetchFailure::Timeout)
            } else {
                AttemptFailure::transient(FetchFailure::Body(e.to_string()))
            }
        })?;

        Ok(RawResponse {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
            attempts: 0,
        })
    }
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("config", &self.inner.config)
            .field("retries", &self.retries())
            .field("requests", &self.requests())
            .finish()
    }
}

fn classify_send_error(e: reqwest::Error) -> AttemptFailure {
    if e.is_timeout() {
        AttemptFailure::transient(FetchFailure::Timeout)
    } else if e.is_connect() {
        AttemptFailure::transient(FetchFailure::Connect(e.to_string()))
    } else if e.is_redirect() {
        AttemptFailure::permanent(FetchFailure::Other(format!("redirect error: {}", e)))
    } else if e.is_builder() {
        AttemptFailure::permanent(FetchFailure::InvalidUrl(e.to_string()))
    } else {
        AttemptFailure::transient(FetchFailure::Other(e.to_string()))
    }
}

fn classify_status(status: StatusCode) -> AttemptFailure {
    let reason = FetchFailure::Status(status.as_u16());
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        AttemptFailure::transient(reason)
    } else {
        AttemptFailure::permanent(reason)
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    let value = response.headers().get(header::RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after(value, Utc::now())
}

/// Parses `Retry-After` as delta-seconds or as an HTTP date
///
/// A date in the past means no wait.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    Some(
        (date.with_timezone(&Utc) - now)
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}
