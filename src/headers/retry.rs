//! Retry policy carried as request headers.
//!
//! The client never retries anything itself. A [`RetryPolicy`] is only a typed
//! view over the `x-envoy-*` headers the engine interprets.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::headers::Headers;

const MAX_RETRIES: &str = "x-envoy-max-retries";
const RETRY_ON: &str = "x-envoy-retry-on";
const PER_TRY_TIMEOUT_MS: &str = "x-envoy-upstream-rq-per-try-timeout-ms";
const TOTAL_TIMEOUT_MS: &str = "x-envoy-upstream-rq-timeout-ms";

pub(crate) const POLICY_HEADERS: [&str; 4] =
    [MAX_RETRIES, RETRY_ON, PER_TRY_TIMEOUT_MS, TOTAL_TIMEOUT_MS];

/// Conditions under which the engine may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryRule {
    Status5xx,
    GatewayError,
    ConnectFailure,
    Retriable4xx,
    RefusedUpstream,
}

impl RetryRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryRule::Status5xx => "5xx",
            RetryRule::GatewayError => "gateway-error",
            RetryRule::ConnectFailure => "connect-failure",
            RetryRule::Retriable4xx => "retriable-4xx",
            RetryRule::RefusedUpstream => "refused-upstream",
        }
    }
}

impl fmt::Display for RetryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown retry rule: {0}")]
pub struct UnknownRetryRule(pub String);

impl FromStr for RetryRule {
    type Err = UnknownRetryRule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "5xx" => Ok(RetryRule::Status5xx),
            "gateway-error" => Ok(RetryRule::GatewayError),
            "connect-failure" => Ok(RetryRule::ConnectFailure),
            "retriable-4xx" => Ok(RetryRule::Retriable4xx),
            "refused-upstream" => Ok(RetryRule::RefusedUpstream),
            other => Err(UnknownRetryRule(other.to_string())),
        }
    }
}

/// Retry settings forwarded to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retry_count: u32,
    pub retry_on: Vec<RetryRule>,
    pub per_retry_timeout_ms: Option<u64>,
    /// Overall budget across all attempts. `None` disables the upstream timeout.
    pub total_upstream_timeout_ms: Option<u64>,
}

impl RetryPolicy {
    pub fn new(max_retry_count: u32, retry_on: Vec<RetryRule>) -> Self {
        Self {
            max_retry_count,
            retry_on,
            per_retry_timeout_ms: None,
            total_upstream_timeout_ms: None,
        }
    }

    pub fn with_per_retry_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.per_retry_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_total_upstream_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.total_upstream_timeout_ms = Some(timeout_ms);
        self
    }

    /// Header representation understood by the engine.
    ///
    /// The total timeout header is always present; `0` means "no timeout".
    pub fn outbound_headers(&self) -> Vec<(&'static str, Vec<String>)> {
        let mut headers = vec![
            (MAX_RETRIES, vec![self.max_retry_count.to_string()]),
            (
                RETRY_ON,
                self.retry_on.iter().map(|rule| rule.as_str().to_string()).collect(),
            ),
            (
                TOTAL_TIMEOUT_MS,
                vec![self.total_upstream_timeout_ms.unwrap_or(0).to_string()],
            ),
        ];
        if let Some(per_retry) = self.per_retry_timeout_ms {
            headers.push((PER_TRY_TIMEOUT_MS, vec![per_retry.to_string()]));
        }
        headers
    }

    /// Read a policy back from headers. Returns `None` without a parseable
    /// `x-envoy-max-retries`. Unknown retry rules are skipped.
    pub fn from_headers<H: Headers + ?Sized>(headers: &H) -> Option<Self> {
        let max_retry_count = headers.first_value(MAX_RETRIES)?.parse().ok()?;
        let retry_on = headers
            .value(RETRY_ON)
            .map(|values| values.iter().filter_map(|v| v.parse().ok()).collect())
            .unwrap_or_default();
        let per_retry_timeout_ms = headers
            .first_value(PER_TRY_TIMEOUT_MS)
            .and_then(|v| v.parse().ok());
        let total_upstream_timeout_ms = headers
            .first_value(TOTAL_TIMEOUT_MS)
            .and_then(|v| v.parse().ok())
            .filter(|ms| *ms > 0);

        Some(Self {
            max_retry_count,
            retry_on,
            per_retry_timeout_ms,
            total_upstream_timeout_ms,
        })
    }
}
