//! Fallback-chain resolution
//!
//! ## Flow
//!
//! ```text
//!  resolve(param)
//!       │
//!       ├─ param rejected? ──────────────▶ Err(InvalidParameter)
//!       │
//!       ├─ live cache entry? ────────────▶ Ok(cached)
//!       │
//!       ▼
//!  ┌──────────┐  fail  ┌──────────┐  fail        fail  ┌──────────┐
//!  │provider 1│──────▶ │provider 2│──────▶ ... ──────▶ │provider N│──▶ Err(AllProvidersExhausted)
//!  └──────────┘        └──────────┘                    └──────────┘
//!       │ ok                │ ok                             │ ok
//!       ▼                   ▼                                ▼
//!                 cache.set(key, value); Ok(value)
//! ```
//!
//! An attempt fails on transport error, timeout, unparseable body or a
//! candidate rejected by the provider's validator. Failures are logged and
//! never escape individually.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::config::ResolutionConfig;
use crate::error::{Error, Result};
use crate::kind::ResourceKind;
use crate::provider::ProviderSpec;
use crate::traits::Fetcher;

/// Resolves one resource kind through an ordered list of providers
///
/// Providers are contacted one at a time, always starting from the first;
/// no health is carried over between calls. Only the first validated value is
/// cached.
pub struct FallbackResolver<T> {
    /// Kind resolved by this chain
    kind: ResourceKind,

    /// Providers in fallback order
    providers: Vec<ProviderSpec<T>>,

    /// HTTP transport
    fetcher: Arc<dyn Fetcher>,

    /// Immutable settings
    config: ResolutionConfig,

    /// Read-through cache owned by this resolver
    cache: TtlCache<T>,

    /// Check applied to caller-supplied parameters before any request
    param_check: Option<fn(&str) -> bool>,
}

impl<T: Clone + Send + Sync> FallbackResolver<T> {
    /// Create a resolver with a fresh, empty cache
    ///
    /// # Parameters
    ///
    /// - `kind`: Resource kind (used for cache keys and errors)
    /// - `providers`: Fallback chain, in order
    /// - `fetcher`: HTTP transport
    /// - `config`: Timeout, retry and cache settings; providers named in
    ///   `retry_providers` are opted in to retry
    pub fn new(
        kind: ResourceKind,
        providers: Vec<ProviderSpec<T>>,
        fetcher: Arc<dyn Fetcher>,
        config: ResolutionConfig,
    ) -> Self {
        let cache = TtlCache::new(config.cache_ttl(), config.cache_enabled);
        let providers = providers
            .into_iter()
            .map(|provider| {
                let retry = provider.retries() || config.retries(provider.name());
                provider.with_retry(retry)
            })
            .collect();
        Self {
            kind,
            providers,
            fetcher,
            config,
            cache,
            param_check: None,
        }
    }

    /// Reject parameters failing `check` before any provider is contacted
    pub fn with_param_check(mut self, check: fn(&str) -> bool) -> Self {
        self.param_check = Some(check);
        self
    }

    /// Resolve the value for `param`
    ///
    /// # Returns
    ///
    /// - `Ok(T)`: Cached value, or the first validated provider answer
    /// - `Err(Error::InvalidParameter)`: `param` failed the parameter check
    /// - `Err(Error::AllProvidersExhausted)`: No provider produced a valid value
    pub async fn resolve(&self, param: Option<&str>) -> Result<T> {
        if let (Some(param), Some(check)) = (param, self.param_check) {
            if !check(param) {
                return Err(Error::invalid_parameter(format!(
                    "{:?} is not a valid {} parameter",
                    param, self.kind
                )));
            }
        }

        let key = self.kind.cache_key(param);
        if let Some(value) = self.cache.get(&key) {
            debug!("Cache hit for {}", key);
            return Ok(value);
        }

        let mut attempted = 0;
        for provider in &self.providers {
            let Some(url) = provider.url(param) else {
                debug!(
                    "Provider {} cannot serve {}, skipping",
                    provider.name(),
                    key
                );
                continue;
            };

            attempted += 1;
            match self.attempt(provider, &url).await {
                Ok(value) => {
                    info!("Resolved {} via {}", key, provider.name());
                    self.cache.set(key, value.clone());
                    return Ok(value);
                }
                Err(e) => {
                    warn!("Provider {} failed for {}: {}", provider.name(), key, e);
                }
            }
        }

        warn!("All {} provider(s) failed for {}", attempted, key);
        Err(Error::exhausted(self.kind, attempted))
    }

    /// One provider attempt: fetch (with opt-in retry), parse, validate
    async fn attempt(&self, provider: &ProviderSpec<T>, url: &str) -> Result<T> {
        let body = if provider.retries() {
            self.config
                .retry_policy()
                .execute(move || self.fetch_once(provider, url))
                .await?
        } else {
            self.fetch_once(provider, url).await?
        };

        let candidate = provider
            .parse(&body)
            .map_err(|e| Error::provider(provider.name(), format!("unparseable response: {}", e)))?;

        if !provider.validate(&candidate) {
            return Err(Error::provider(provider.name(), "response failed validation"));
        }

        Ok(candidate)
    }

    async fn fetch_once(&self, provider: &ProviderSpec<T>, url: &str) -> Result<Vec<u8>> {
        let timeout = self.config.timeout();
        debug!("Fetching {} ({})", url, provider.name());

        match tokio::time::timeout(timeout, self.fetcher.fetch(url, timeout)).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(e)) => Err(Error::provider(provider.name(), e.to_string())),
            Err(_) => Err(Error::provider(provider.name(), Error::Timeout(timeout).to_string())),
        }
    }

    /// Cached value for `param`, without contacting any provider
    pub fn cached(&self, param: Option<&str>) -> Option<T> {
        self.cache.get(&self.kind.cache_key(param))
    }

    /// Drop the cached value for `param`
    pub fn invalidate(&self, param: Option<&str>) {
        self.cache.invalidate(Some(&self.kind.cache_key(param)));
    }

    /// Drop every cached value
    pub fn clear_cache(&self) {
        self.cache.invalidate(None);
    }

    /// Kind resolved by this chain
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Settings this resolver was built with
    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    /// Provider names, in fallback order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::EndpointTemplate;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers from a fixed URL → body table; unknown URLs fail
    struct TableFetcher {
        bodies: HashMap<String, Vec<u8>>,
        calls: Mutex<Vec<String>>,
    }

    impl TableFetcher {
        fn new(bodies: &[(&str, &str)]) -> Self {
            Self {
                bodies: bodies
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.as_bytes().to_vec()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for TableFetcher {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(url.to_string());
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| Error::http("connection refused"))
        }
    }

    fn text_provider(name: &str) -> ProviderSpec<String> {
        ProviderSpec::new(
            name,
            EndpointTemplate::fixed(format!("http://{}/ip", name)),
            crate::provider::public_ip::parse_plain_text,
            |ip: &String| crate::ip::is_valid_ip(ip),
        )
    }

    #[tokio::test]
    async fn test_invalid_candidate_moves_to_next_provider() {
        let fetcher = Arc::new(TableFetcher::new(&[
            ("http://a/ip", "not an address"),
            ("http://b/ip", "198.51.100.10"),
        ]));
        let resolver = FallbackResolver::new(
            ResourceKind::PublicIp,
            vec![text_provider("a"), text_provider("b")],
            fetcher.clone(),
            ResolutionConfig::default(),
        );

        assert_eq!(resolver.resolve(None).await.unwrap(), "198.51.100.10");
        assert_eq!(fetcher.calls(), vec!["http://a/ip", "http://b/ip"]);
    }

    #[tokio::test]
    async fn test_param_check_fails_fast() {
        let fetcher = Arc::new(TableFetcher::new(&[]));
        let resolver = FallbackResolver::new(
            ResourceKind::Location,
            vec![text_provider("a")],
            fetcher.clone(),
            ResolutionConfig::default(),
        )
        .with_param_check(crate::ip::is_valid_ip);

        let err = resolver.resolve(Some("999.1.1.1")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unservable_providers_are_not_counted() {
        let fetcher = Arc::new(TableFetcher::new(&[]));
        let resolver = FallbackResolver::new(
            ResourceKind::Location,
            vec![text_provider("a")],
            fetcher.clone(),
            ResolutionConfig::default(),
        );

        // Fixed endpoints cannot take a parameter
        let err = resolver.resolve(Some("8.8.8.8")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::AllProvidersExhausted { attempted: 0, .. }
        ));
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_opt_in_retry_repeats_same_provider() {
        let fetcher = Arc::new(TableFetcher::new(&[("http://b/ip", "198.51.100.11")]));
        let config = ResolutionConfig::default().with_retries(2, Duration::from_millis(50));
        let resolver = FallbackResolver::new(
            ResourceKind::PublicIp,
            vec![text_provider("a").with_retry(true), text_provider("b")],
            fetcher.clone(),
            config,
        );

        assert_eq!(resolver.resolve(None).await.unwrap(), "198.51.100.11");
        assert_eq!(
            fetcher.calls(),
            vec!["http://a/ip", "http://a/ip", "http://a/ip", "http://b/ip"]
        );
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_lookup() {
        let fetcher = Arc::new(TableFetcher::new(&[("http://a/ip", "198.51.100.12")]));
        let resolver = FallbackResolver::new(
            ResourceKind::PublicIp,
            vec![text_provider("a")],
            fetcher.clone(),
            ResolutionConfig::default(),
        );

        resolver.resolve(None).await.unwrap();
        resolver.resolve(None).await.unwrap();
        assert_eq!(fetcher.calls().len(), 1);
        assert_eq!(resolver.cached(None).as_deref(), Some("198.51.100.12"));

        resolver.invalidate(None);
        assert!(resolver.cached(None).is_none());
        resolver.resolve(None).await.unwrap();
        assert_eq!(fetcher.calls().len(), 2);
        assert_eq!(resolver.provider_names(), vec!["a"]);
    }
}
