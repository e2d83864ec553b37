// src/ingest/fetch.rs
//! Outbound GET with bounded retries, exponential backoff and block detection.
//!
//! - 403 / 451 → `Fetched::Blocked` immediately, no retry.
//! - 429 / 5xx / transport errors → retried up to `max_retries` times,
//!   sleeping `min(backoff_max, backoff_base * 2^attempt)` between attempts.
//! - Any other non-success status → `FetchError::Status`, no retry.

use metrics::counter;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_USER_AGENT: &str = "geo-monitor/1.0 (+copper supply-chain risk monitor)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(5),
            max_retries: 3,
            backoff_base: Duration::from_millis(600),
            backoff_max: Duration::from_secs(6),
        }
    }
}

impl FetchPolicy {
    /// Delay before retry number `attempt + 1` (attempt is 0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_max)
    }
}

/// Upstream refused us (403/451). Not retried; the source is skipped this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedSignal {
    pub url: String,
    pub status: u16,
}

impl fmt::Display for BlockedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blocked by upstream (HTTP {}) at {}", self.status, self.url)
    }
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchedPage {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[derive(Debug, Clone)]
pub enum Fetched {
    Page(FetchedPage),
    Blocked(BlockedSignal),
}

impl Fetched {
    pub fn into_page(self) -> Result<FetchedPage, BlockedSignal> {
        match self {
            Fetched::Page(p) => Ok(p),
            Fetched::Blocked(b) => Err(b),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || (500..600).contains(status)
            }
            FetchError::Transport { .. } => true,
            FetchError::Client(_) => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResilientFetcher {
    client: reqwest::Client,
    policy: FetchPolicy,
}

impl ResilientFetcher {
    pub fn new(policy: FetchPolicy) -> Result<Self, FetchError> {
        Self::with_user_agent(policy, DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(policy: FetchPolicy, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(policy.connect_timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.policy.timeout = timeout;
        self
    }

    /// GET `url` with query `params`; `headers` are added to (or override) the defaults.
    pub async fn get(
        &self,
        url: &str,
        params: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> Result<Fetched, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            match self.attempt(url, params, headers).await {
                Ok(fetched) => return Ok(fetched),
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        error = %e,
                        url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "fetch failed, retrying"
                    );
                    counter!("ingest_fetch_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(
        &self,
        url: &str,
        params: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> Result<Fetched, FetchError> {
        let mut req = self.client.get(url).timeout(self.policy.timeout);
        if !params.is_empty() {
            req = req.query(params);
        }
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let rsp = req.send().await.map_err(transport)?;
        let status = rsp.status();

        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS {
            warn!(url, status = status.as_u16(), "source blocked");
            return Ok(Fetched::Blocked(BlockedSignal {
                url: url.to_string(),
                status: status.as_u16(),
            }));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = rsp.url().to_string();
        let body = rsp.bytes().await.map_err(transport)?;
        debug!(url = %final_url, bytes = body.len(), "fetched");
        Ok(Fetched::Page(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            body: body.to_vec(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let p = FetchPolicy::default();
        assert_eq!(p.backoff(0), Duration::from_millis(600));
        assert_eq!(p.backoff(1), Duration::from_millis(1200));
        assert_eq!(p.backoff(2), Duration::from_millis(2400));
        assert_eq!(p.backoff(3), Duration::from_millis(4800));
        assert_eq!(p.backoff(4), Duration::from_secs(6));
        assert_eq!(p.backoff(40), Duration::from_secs(6));
    }

    #[test]
    fn retryable_statuses() {
        let st = |status| FetchError::Status {
            url: "u".into(),
            status,
        };
        assert!(st(429).is_retryable());
        assert!(st(500).is_retryable());
        assert!(st(503).is_retryable());
        assert!(!st(404).is_retryable());
        assert!(!st(400).is_retryable());
    }

    #[test]
    fn blocked_signal_message_names_status_and_url() {
        let b = BlockedSignal {
            url: "https://ofac.treasury.gov/recent-actions".into(),
            status: 403,
        };
        let s = b.to_string();
        assert!(s.contains("403") && s.contains("ofac.treasury.gov"));
    }
}
