//! Configuration types for the resolution layer
//!
//! Configuration is immutable once a resolver is built from it. Changing it
//! means building a fresh `Aggregator` (and fresh, empty caches).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::kind::ResourceKind;
use crate::provider::{location, public_ip};
use crate::retry::RetryPolicy;

/// Upper bound for a single provider attempt
const MAX_TIMEOUT_MS: u64 = 60_000;

/// Upper bound for in-place retries of one provider
const MAX_RETRIES: u32 = 10;

/// Main configuration: one resolution config per resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetposConfig {
    /// Public address resolution
    #[serde(default = "ResolutionConfig::public_ip_defaults")]
    pub public_ip: ResolutionConfig,

    /// Geolocation resolution
    #[serde(default = "ResolutionConfig::location_defaults")]
    pub location: ResolutionConfig,

    /// Local interface enumeration (only the cache settings apply)
    #[serde(default = "ResolutionConfig::interfaces_defaults")]
    pub interfaces: ResolutionConfig,
}

impl NetposConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            public_ip: ResolutionConfig::public_ip_defaults(),
            location: ResolutionConfig::location_defaults(),
            interfaces: ResolutionConfig::interfaces_defaults(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.public_ip.validate(ResourceKind::PublicIp)?;
        self.location.validate(ResourceKind::Location)?;
        self.interfaces.validate(ResourceKind::Interfaces)?;

        if self.public_ip.providers.is_empty() {
            return Err(crate::Error::config("No public-ip providers configured"));
        }
        if self.location.providers.is_empty() {
            return Err(crate::Error::config("No location providers configured"));
        }

        Ok(())
    }

    /// Apply one setting to every resolver
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.public_ip.cache_enabled = enabled;
        self.location.cache_enabled = enabled;
        self.interfaces.cache_enabled = enabled;
        self
    }
}

impl Default for NetposConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-resolver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Time budget of one provider attempt, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// In-place retries for providers that opt in (0 = single shot)
    #[serde(default)]
    pub max_retries: u32,

    /// Providers from `providers` that retry in place before the chain
    /// moves on
    #[serde(default)]
    pub retry_providers: Vec<String>,

    /// Base delay of the retry backoff, in milliseconds
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Whether resolved values are cached
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Lifetime of a cached value, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Provider names, in fallback order
    #[serde(default)]
    pub providers: Vec<String>,
}

impl ResolutionConfig {
    /// Defaults for the public address: five minute cache
    pub fn public_ip_defaults() -> Self {
        Self {
            cache_ttl_secs: 300,
            providers: names(public_ip::DEFAULT_CHAIN),
            ..Self::default()
        }
    }

    /// Defaults for geolocation: one hour cache
    pub fn location_defaults() -> Self {
        Self {
            cache_ttl_secs: 3600,
            providers: names(location::DEFAULT_CHAIN),
            ..Self::default()
        }
    }

    /// Defaults for local interfaces: one minute cache, no providers
    pub fn interfaces_defaults() -> Self {
        Self {
            cache_ttl_secs: 60,
            ..Self::default()
        }
    }

    /// Replace the provider order
    pub fn with_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = providers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Enable or disable caching
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Set the cache lifetime
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    /// Opt the named providers in to in-place retry
    pub fn with_retry_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retry_providers = providers.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `provider` retries in place
    pub fn retries(&self, provider: &str) -> bool {
        self.retry_providers.iter().any(|name| name == provider)
    }

    /// Set the in-place retry budget
    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay_ms = base_delay.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache lifetime
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Retry policy applied to providers that opt in
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries.saturating_add(1),
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    /// Validate the settings for one resolver
    pub fn validate(&self, kind: ResourceKind) -> Result<(), crate::Error> {
        if self.timeout_ms == 0 || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(crate::Error::config(format!(
                "{} timeout must be between 1 and {} ms, got {}",
                kind, MAX_TIMEOUT_MS, self.timeout_ms
            )));
        }

        if self.max_retries > MAX_RETRIES {
            return Err(crate::Error::config(format!(
                "{} max_retries must be at most {}, got {}",
                kind, MAX_RETRIES, self.max_retries
            )));
        }

        if self.cache_enabled && self.cache_ttl_secs == 0 {
            return Err(crate::Error::config(format!(
                "{} cache TTL must be > 0 when caching is enabled",
                kind
            )));
        }

        let mut seen = HashSet::new();
        for name in &self.providers {
            if name.trim().is_empty() {
                return Err(crate::Error::config(format!("{} provider name cannot be empty", kind)));
            }
            if !seen.insert(name.as_str()) {
                return Err(crate::Error::config(format!(
                    "{} provider {} listed more than once",
                    kind, name
                )));
            }
        }

        for name in &self.retry_providers {
            if !self.providers.contains(name) {
                return Err(crate::Error::config(format!(
                    "{} retry provider {} is not in the provider chain",
                    kind, name
                )));
            }
        }

        Ok(())
    }
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_retries: 0,
            retry_providers: Vec::new(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            cache_enabled: default_cache_enabled(),
            cache_ttl_secs: default_cache_ttl_secs(),
            providers: Vec::new(),
        }
    }
}

fn names(chain: &[&str]) -> Vec<String> {
    chain.iter().map(|s| s.to_string()).collect()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    300
}
