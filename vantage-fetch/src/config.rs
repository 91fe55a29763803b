//! Fetch configuration with sensible defaults.
//!
//! [`FetchConfig`] controls per-session timeouts, retry behaviour, proxy
//! routing, identity headers, endpoint substitution and result caps. The
//! defaults are tuned for polite scraping of slow, throttled endpoints.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::FetchError;
use crate::retry::RetryPolicy;

/// Configuration for one [`Session`](crate::Session).
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides. Missing fields fall back to defaults when deserialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-exchange timeout in seconds. Expiry is classified as a retryable timeout.
    pub timeout_seconds: u64,
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt, in seconds.
    pub initial_delay_seconds: f64,
    /// Factor applied to the delay after every further failed attempt.
    pub backoff_multiplier: f64,
    /// Proxy descriptor, e.g. `socks5://127.0.0.1:7890`. All traffic is routed through it.
    pub proxy: Option<String>,
    /// Base-URL substitutions applied to every target before it is sent.
    ///
    /// Keys are original base URLs (`https://www.example.com`), values are
    /// their replacements. The longest matching key wins.
    pub endpoint_overrides: BTreeMap<String, String>,
    /// Upper bound on results any paginated search may return.
    pub max_results_cap: usize,
    /// Fixed User-Agent. If `None`, each request picks one from a rotation list.
    pub user_agent: Option<String>,
    /// Identity headers sent with every request of the session.
    pub headers: BTreeMap<String, String>,
    /// How long aggregated results are cached, in seconds. 0 disables caching.
    pub cache_ttl_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            max_attempts: 3,
            initial_delay_seconds: 1.0,
            backoff_multiplier: 2.0,
            proxy: None,
            endpoint_overrides: BTreeMap::new(),
            max_results_cap: 500,
            user_agent: None,
            headers: BTreeMap::new(),
            cache_ttl_seconds: 600,
        }
    }
}

impl FetchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `timeout_seconds`, `max_attempts` and `max_results_cap` must be greater than 0
    /// - `initial_delay_seconds` must be finite and non-negative
    /// - `backoff_multiplier` must be finite and at least 1
    /// - `proxy` and both sides of every endpoint override must be valid URLs
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.timeout_seconds == 0 {
            return Err(FetchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(FetchError::Config(
                "max_attempts must be greater than 0".into(),
            ));
        }
        if self.max_results_cap == 0 {
            return Err(FetchError::Config(
                "max_results_cap must be greater than 0".into(),
            ));
        }
        if !self.initial_delay_seconds.is_finite() || self.initial_delay_seconds < 0.0 {
            return Err(FetchError::Config(
                "initial_delay_seconds must be a non-negative number".into(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(FetchError::Config(
                "backoff_multiplier must be at least 1".into(),
            ));
        }
        if let Some(ref proxy) = self.proxy {
            Url::parse(proxy)
                .map_err(|e| FetchError::Config(format!("invalid proxy {proxy}: {e}")))?;
        }
        for (from, to) in &self.endpoint_overrides {
            for side in [from, to] {
                let parsed = Url::parse(side).map_err(|e| {
                    FetchError::Config(format!("invalid endpoint override {side}: {e}"))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(FetchError::Config(format!(
                        "endpoint override {side} must be http or https"
                    )));
                }
            }
        }
        Ok(())
    }

    /// The retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::try_from_secs_f64(self.initial_delay_seconds).unwrap_or(Duration::ZERO),
            self.backoff_multiplier,
        )
    }

    /// Rewrite `target` through the endpoint overrides.
    ///
    /// Returns the target unchanged when no override base prefixes it.
    pub fn resolve_target(&self, target: &str) -> String {
        let best = self
            .endpoint_overrides
            .iter()
            .filter(|(from, _)| prefixes_base(target, from))
            .max_by_key(|(from, _)| from.len());

        match best {
            Some((from, to)) => {
                let rest = &target[from.trim_end_matches('/').len()..];
                format!("{}{rest}", to.trim_end_matches('/'))
            }
            None => target.to_string(),
        }
    }
}

/// `base` prefixes `target` on a path boundary, so `https://a.com` does not
/// match `https://a.com.evil.net`.
fn prefixes_base(target: &str, base: &str) -> bool {
    let base = base.trim_end_matches('/');
    match target.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout_seconds, 10);
        assert_eq!(config.max_attempts, 3);
        assert!((config.initial_delay_seconds - 1.0).abs() < f64::EPSILON);
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.max_results_cap, 500);
        assert_eq!(config.cache_ttl_seconds, 600);
        assert!(config.proxy.is_none());
        assert!(config.user_agent.is_none());
        assert!(config.endpoint_overrides.is_empty());
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(FetchConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = FetchConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));
    }

    #[test]
    fn zero_attempts_rejected() {
        let config = FetchConfig {
            max_attempts: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn zero_cap_rejected() {
        let config = FetchConfig {
            max_results_cap: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_delay_rejected() {
        let config = FetchConfig {
            initial_delay_seconds: -1.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("initial_delay_seconds"));
    }

    #[test]
    fn shrinking_backoff_rejected() {
        let config = FetchConfig {
            backoff_multiplier: 0.5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backoff_multiplier"));
    }

    #[test]
    fn socks_proxy_accepted() {
        let config = FetchConfig {
            proxy: Some("socks5://127.0.0.1:7890".into()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_override_rejected() {
        let mut config = FetchConfig::default();
        config
            .endpoint_overrides
            .insert("not a url".into(), "https://mirror.test".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn retry_policy_from_config() {
        let config = FetchConfig {
            max_attempts: 4,
            initial_delay_seconds: 0.5,
            backoff_multiplier: 3.0,
            ..Default::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
        assert!((policy.backoff_multiplier - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn resolve_target_without_overrides_is_identity() {
        let config = FetchConfig::default();
        assert_eq!(
            config.resolve_target("https://duckduckgo.com/?q=x"),
            "https://duckduckgo.com/?q=x"
        );
    }

    #[test]
    fn resolve_target_substitutes_base() {
        let mut config = FetchConfig::default();
        config.endpoint_overrides.insert(
            "https://links.duckduckgo.com".into(),
            "http://127.0.0.1:8080/".into(),
        );
        assert_eq!(
            config.resolve_target("https://links.duckduckgo.com/d.js?s=0"),
            "http://127.0.0.1:8080/d.js?s=0"
        );
    }

    #[test]
    fn resolve_target_prefers_longest_match() {
        let mut config = FetchConfig::default();
        config
            .endpoint_overrides
            .insert("https://api.test".into(), "http://a.local".into());
        config
            .endpoint_overrides
            .insert("https://api.test/v2".into(), "http://b.local".into());
        assert_eq!(
            config.resolve_target("https://api.test/v2/items"),
            "http://b.local/items"
        );
        assert_eq!(
            config.resolve_target("https://api.test/v1/items"),
            "http://a.local/v1/items"
        );
    }

    #[test]
    fn resolve_target_respects_host_boundary() {
        let mut config = FetchConfig::default();
        config
            .endpoint_overrides
            .insert("https://a.com".into(), "http://mirror.local".into());
        assert_eq!(
            config.resolve_target("https://a.com.evil.net/x"),
            "https://a.com.evil.net/x"
        );
    }

    #[test]
    fn partial_document_uses_defaults() {
        let config: FetchConfig =
            serde_json::from_str(r#"{"max_attempts": 5}"#).expect("deserialize");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.timeout_seconds, 10);
    }
}
