// # Fetcher Trait
//
// Defines the HTTP transport capability consumed by the fallback resolvers.
//
// ## Implementations
//
// - reqwest-based: `netpos-http` crate
// - Test doubles: scripted fetchers in `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use netpos_core::Fetcher;
// use std::time::Duration;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let fetcher = /* Fetcher implementation */;
//
//     let body = fetcher
//         .fetch("https://api.ipify.org", Duration::from_secs(5))
//         .await?;
//     println!("{}", String::from_utf8_lossy(&body));
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::time::Duration;

/// Trait for HTTP transport implementations
///
/// A fetch performs one GET and returns the raw response body. Timeouts,
/// connection failures and non-success statuses are all plain errors: the
/// caller treats every one of them as "this attempt failed".
///
/// # Trust Level: Untrusted
///
/// Fetchers only move bytes. They must not:
/// - retry (retries are opted into per provider by the resolver)
/// - cache (caching is owned by the resolver's `TtlCache`)
/// - interpret bodies (parsing and validation are owned by `ProviderSpec`)
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`, giving up after `timeout`
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<u8>)`: The response body of a successful response
    /// - `Err(Error)`: Transport failure, timeout or non-success status
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, crate::Error>;

    /// Short name used in logs
    fn name(&self) -> &'static str {
        "fetcher"
    }
}
