//! Remote service configuration.

use std::time::Duration;

use thiserror::Error;

pub const ENV_API_URL: &str = "DENTALCARE_API_URL";
pub const ENV_API_KEY: &str = "DENTALCARE_API_KEY";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "DENTALCARE_REQUEST_TIMEOUT_MS";
pub const ENV_INIT_TIMEOUT_MS: &str = "DENTALCARE_INIT_TIMEOUT_MS";
pub const ENV_PROFILE_RETRIES: &str = "DENTALCARE_PROFILE_RETRIES";

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_INIT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PROFILE_RETRIES: u32 = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Connection settings for the hosted data and identity service.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Base URL, without trailing slash (e.g. `https://xyz.example.co`).
    pub api_url: String,
    /// Public (anon) key sent as the `apikey` header on every request.
    pub api_key: String,
    pub request_timeout: Duration,
    /// How long the session store waits for the first identity notification.
    pub init_timeout: Duration,
    /// Extra attempts for a profile fetch that failed on the network.
    pub profile_retries: u32,
}

impl core::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("init_timeout", &self.init_timeout)
            .field("profile_retries", &self.profile_retries)
            .finish()
    }
}

impl RemoteConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            init_timeout: Duration::from_millis(DEFAULT_INIT_TIMEOUT_MS),
            profile_retries: DEFAULT_PROFILE_RETRIES,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn with_profile_retries(mut self, retries: u32) -> Self {
        self.profile_retries = retries;
        self
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup (the environment, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |var: &'static str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };
        let api_url = required(ENV_API_URL)?;
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: ENV_API_URL,
                value: api_url,
            });
        }
        let api_key = required(ENV_API_KEY)?;

        let mut cfg = Self::new(api_url, api_key);
        if let Some(ms) = parse_opt::<u64>(&lookup, ENV_REQUEST_TIMEOUT_MS)? {
            cfg.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_opt::<u64>(&lookup, ENV_INIT_TIMEOUT_MS)? {
            cfg.init_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_opt::<u32>(&lookup, ENV_PROFILE_RETRIES)? {
            cfg.profile_retries = n;
        }
        Ok(cfg)
    }
}

fn parse_opt<T: core::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_absent() {
        let cfg = RemoteConfig::from_lookup(lookup(&[
            (ENV_API_URL, "https://clinic.example.co/"),
            (ENV_API_KEY, "anon"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_url, "https://clinic.example.co");
        assert_eq!(cfg.request_timeout, Duration::from_millis(10_000));
        assert_eq!(cfg.init_timeout, Duration::from_millis(5_000));
        assert_eq!(cfg.profile_retries, 2);
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let err = RemoteConfig::from_lookup(lookup(&[(ENV_API_URL, "https://x.co")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_API_KEY));
    }

    #[test]
    fn bad_numbers_and_urls_are_rejected() {
        let err = RemoteConfig::from_lookup(lookup(&[
            (ENV_API_URL, "https://x.co"),
            (ENV_API_KEY, "k"),
            (ENV_PROFILE_RETRIES, "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_PROFILE_RETRIES, .. }));

        let err = RemoteConfig::from_lookup(lookup(&[(ENV_API_URL, "x.co"), (ENV_API_KEY, "k")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_API_URL, .. }));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let cfg = RemoteConfig::new("https://x.co", "super-secret");
        assert!(!format!("{cfg:?}").contains("super-secret"));
    }
}
