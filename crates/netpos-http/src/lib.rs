// # HTTP Fetcher
//
// This crate provides the HTTP transport used by the resolution chains.
//
// ## Purpose
//
// `netpos-core` never talks to the network itself: every provider request goes
// through the `Fetcher` capability. This crate implements it on top of a
// shared `reqwest::Client`.
//
// ## Behavior
//
// - One GET per call, no redirects beyond reqwest's default policy
// - Any non-2xx status is an error (the chain moves on)
// - The per-call timeout bounds the whole request, body included
// - Bodies larger than `MAX_BODY_BYTES` are rejected

use async_trait::async_trait;
use netpos_core::traits::Fetcher;
use netpos_core::{Error, Result};

use std::time::Duration;

/// Upper bound for the client-wide timeout (per-call timeouts are shorter)
const CLIENT_TIMEOUT_SECS: u64 = 60;

/// Largest response body accepted from a provider
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// User agent sent with every request
const USER_AGENT: &str = concat!("netpos/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed Fetcher
#[derive(Clone)]
pub struct ReqwestFetcher {
    /// HTTP client (connection pool shared by every chain)
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Create a fetcher with a fresh connection pool
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        tracing::trace!("GET {} (timeout {:?})", url, timeout);

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(timeout)
                } else {
                    Error::http(format!("Request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(Error::http(format!("HTTP error: {}", response.status())));
        }

        if let Some(length) = response.content_length() {
            check_length(length)?;
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {}", e)))?;
        check_length(body.len() as u64)?;

        Ok(body.to_vec())
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

fn check_length(length: u64) -> Result<()> {
    if length > MAX_BODY_BYTES as u64 {
        return Err(Error::http(format!(
            "Response too large: {} bytes (limit {})",
            length, MAX_BODY_BYTES
        )));
    }
    Ok(())
}
