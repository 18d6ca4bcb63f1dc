//! Index service endpoint and request retry policy.

use std::time::Duration;

use secrecy::SecretString;

use crate::config::{RequestSettings, Settings};

/// Where the index service lives and how to authenticate against it.
///
/// Built once at startup and shared read-only for the whole run.
#[derive(Debug, Clone)]
pub struct IndexEndpointConfig {
    /// Base URL without trailing slash (e.g., "http://localhost:7700")
    pub base_url: String,

    /// Bearer token; `None` sends no Authorization header
    pub api_key: Option<SecretString>,
}

impl IndexEndpointConfig {
    /// Create an endpoint config. Empty keys are treated as absent.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let api_key = api_key
            .filter(|key| !key.is_empty())
            .map(SecretString::from);
        Self { base_url, api_key }
    }

    /// Build from loaded settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.index_url.clone(), settings.api_key.clone())
    }

    /// Join a request path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Timeout, attempt bound and backoff base for index service requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on a single attempt
    pub timeout: Duration,

    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each further retry
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            max_attempts: 5,
            backoff_base: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Build from the `request` settings table.
    pub fn from_settings(settings: &RequestSettings) -> Self {
        Self {
            timeout: Duration::from_millis(settings.timeout_ms),
            max_attempts: settings.max_attempts,
            backoff_base: Duration::from_millis(settings.backoff_base_ms),
        }
    }

    /// Delay before retry `retry` (1-indexed): `base * 2^(retry - 1)`.
    ///
    /// Uncapped; saturates instead of overflowing for absurd retry counts.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }

    /// Number of retries after the initial attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.timeout, Duration::from_millis(5000));
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.max_retries(), 4);
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (1..=4)
            .map(|k| policy.delay_for_retry(k).as_millis())
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000]);
    }

    #[test]
    fn test_backoff_is_uncapped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_retry(11), Duration::from_millis(1_024_000));
    }

    #[test]
    fn test_endpoint_url_join() {
        let endpoint = IndexEndpointConfig::new("http://localhost:7700/", None);
        assert_eq!(endpoint.base_url, "http://localhost:7700");
        assert_eq!(
            endpoint.url("/indexes/messages"),
            "http://localhost:7700/indexes/messages"
        );
        assert_eq!(endpoint.url("health"), "http://localhost:7700/health");
    }

    #[test]
    fn test_empty_api_key_is_absent() {
        let endpoint = IndexEndpointConfig::new("http://localhost:7700", Some(String::new()));
        assert!(endpoint.api_key.is_none());

        let endpoint = IndexEndpointConfig::new("http://localhost:7700", Some("k".to_string()));
        assert_eq!(endpoint.api_key.unwrap().expose_secret(), "k");
    }
}
