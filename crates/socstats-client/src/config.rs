//! Client configuration and builder pattern.

use crate::error::{ClientError, Result};
use std::time::Duration;

/// Public endpoint of the Socialstyrelsen statistics database.
pub const DEFAULT_BASE_URL: &str = "https://sdb.socialstyrelsen.se/api";

/// Page size the service uses when `per_sida` is not sent.
pub const DEFAULT_PAGE_SIZE: u32 = 5000;

/// Configuration for the statistics client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "https://sdb.socialstyrelsen.se/api")
    pub base_url: String,
    /// API version path segment (default: "v1")
    pub version: String,
    /// Response language path segment, "sv" or "en" (default: "sv")
    pub language: String,
    /// Request timeout (default: 30 seconds)
    pub timeout: Duration,
    /// Total attempts per request for transient transport failures (default: 3)
    pub max_attempts: u32,
    /// Fixed delay between attempts (default: 2 seconds)
    pub retry_delay: Duration,
    /// Pause before following the next page of a result (default: 100ms)
    pub page_delay: Duration,
    /// Maximum number of subjects kept in the metadata cache (default: unbounded)
    pub metadata_cache_capacity: Option<usize>,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            version: "v1".to_string(),
            language: "sv".to_string(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            page_delay: Duration::from_millis(100),
            metadata_cache_capacity: None,
            user_agent: format!("socstats-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(base_url)
    }

    /// Minimum allowed timeout value.
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

    /// Build a configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `SOCSTATS_BASE_URL`: API base URL
    /// - `SOCSTATS_API_VERSION`: version segment (default: v1)
    /// - `SOCSTATS_LANGUAGE`: language segment (default: sv)
    /// - `SOCSTATS_TIMEOUT_SECS`: request timeout in seconds
    /// - `SOCSTATS_MAX_ATTEMPTS`: attempts per request
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup, using the same
    /// keys as [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup("SOCSTATS_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(version) = lookup("SOCSTATS_API_VERSION") {
            config.version = version;
        }
        if let Some(language) = lookup("SOCSTATS_LANGUAGE") {
            config.language = language;
        }
        if let Some(raw) = lookup("SOCSTATS_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ClientError::Config(format!("SOCSTATS_TIMEOUT_SECS is not a number: {raw}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("SOCSTATS_MAX_ATTEMPTS") {
            config.max_attempts = raw.trim().parse::<u32>().map_err(|_| {
                ClientError::Config(format!("SOCSTATS_MAX_ATTEMPTS is not a number: {raw}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::Config("base_url cannot be empty".to_string()));
        }

        url::Url::parse(&self.base_url)
            .map_err(|e| ClientError::Config(format!("Invalid base_url: {}", e)))?;

        if self.version.trim().is_empty() {
            return Err(ClientError::Config("version cannot be empty".to_string()));
        }
        if self.language.trim().is_empty() {
            return Err(ClientError::Config("language cannot be empty".to_string()));
        }

        if self.max_attempts == 0 {
            return Err(ClientError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        if self.metadata_cache_capacity == Some(0) {
            return Err(ClientError::Config(
                "metadata_cache_capacity must be > 0 when set".to_string(),
            ));
        }

        if self.timeout < Self::MIN_TIMEOUT {
            return Err(ClientError::Config(format!(
                "timeout ({:?}) must be >= {:?}",
                self.timeout,
                Self::MIN_TIMEOUT
            )));
        }

        Ok(())
    }
}

/// Builder for client configuration.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                base_url: base_url.into(),
                ..Default::default()
            },
        }
    }

    /// Set the API version segment.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.config.version = version.into();
        self
    }

    /// Set the response language segment.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the total number of attempts per request.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.max_attempts = max_attempts;
        self
    }

    /// Set the fixed delay between attempts.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Set the pause between followed pages.
    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.config.page_delay = delay;
        self
    }

    /// Bound the number of subjects kept in the metadata cache.
    pub fn metadata_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.metadata_cache_capacity = Some(capacity);
        self
    }

    /// Set a custom User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.version, "v1");
        assert_eq!(config.language, "sv");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.page_delay, Duration::from_millis(100));
        assert!(config.metadata_cache_capacity.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::builder("https://api.example.com")
            .version("v2")
            .language("en")
            .timeout(Duration::from_secs(60))
            .max_attempts(5)
            .retry_delay(Duration::from_millis(500))
            .page_delay(Duration::ZERO)
            .metadata_cache_capacity(20)
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.version, "v2");
        assert_eq!(config.language, "en");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(500));
        assert_eq!(config.page_delay, Duration::ZERO);
        assert_eq!(config.metadata_cache_capacity, Some(20));
    }

    #[test]
    fn test_invalid_url() {
        let result = ClientConfig::builder("not a valid url").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_url() {
        let result = ClientConfig::builder("").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = ClientConfig::builder(DEFAULT_BASE_URL)
            .max_attempts(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_zero_cache_capacity_rejected() {
        let result = ClientConfig::builder(DEFAULT_BASE_URL)
            .metadata_cache_capacity(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_language_rejected() {
        let result = ClientConfig::builder(DEFAULT_BASE_URL).language("").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_timeout_too_small() {
        let result = ClientConfig::builder(DEFAULT_BASE_URL)
            .timeout(Duration::from_millis(50))
            .build();

        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(
            err.to_string().contains("timeout"),
            "Error should mention timeout"
        );
    }

    #[test]
    fn test_timeout_at_minimum() {
        let result = ClientConfig::builder(DEFAULT_BASE_URL)
            .timeout(ClientConfig::MIN_TIMEOUT)
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_from_lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("SOCSTATS_BASE_URL", "http://localhost:8080/api"),
            ("SOCSTATS_LANGUAGE", "en"),
            ("SOCSTATS_TIMEOUT_SECS", "5"),
            ("SOCSTATS_MAX_ATTEMPTS", "1"),
        ]
        .into_iter()
        .collect();

        let config =
            ClientConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.version, "v1");
        assert_eq!(config.language, "en");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = ClientConfig::from_lookup(|key| {
            (key == "SOCSTATS_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ClientError::Config(_))));
    }
}
