//! Caller address extraction
//!
//! Pure data massaging over request metadata handed in by the request layer.
//! No network, no cache, no fallback chain, and no error path: when nothing
//! usable is present the result is [`UNKNOWN_ADDRESS`].

use serde::{Deserialize, Serialize};

use crate::ip::is_valid_ipv4;

/// Sentinel returned when no caller address can be determined
pub const UNKNOWN_ADDRESS: &str = "unknown";

const IPV6_LOOPBACK: &str = "::1";
const IPV4_LOOPBACK: &str = "127.0.0.1";
const IPV4_MAPPED_PREFIX: &str = "::ffff:";

/// A raw header value, which frameworks expose either as one string or as a
/// list of repeated header lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    /// One header line, possibly a comma-separated list
    Single(String),
    /// Repeated header lines, in arrival order
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// First comma-separated entry of the first header line
    fn first_entry(&self) -> Option<&str> {
        let line = match self {
            HeaderValue::Single(line) => line.as_str(),
            HeaderValue::Multiple(lines) => lines.first()?.as_str(),
        };
        line.split(',').next()
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Single(value.to_string())
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        HeaderValue::Multiple(values)
    }
}

/// Request metadata relevant to the caller's address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Address already parsed by the request layer (socket peer or trusted proxy result)
    #[serde(default)]
    pub direct_address: Option<String>,

    /// `x-forwarded-for`
    #[serde(default)]
    pub forwarded_for: Option<HeaderValue>,

    /// `x-real-ip`
    #[serde(default)]
    pub real_ip: Option<String>,

    /// `x-client-ip`
    #[serde(default)]
    pub client_ip: Option<String>,
}

impl RequestMetadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pre-parsed address
    pub fn with_direct_address(mut self, address: impl Into<String>) -> Self {
        self.direct_address = Some(address.into());
        self
    }

    /// Set `x-forwarded-for`
    pub fn with_forwarded_for(mut self, value: impl Into<HeaderValue>) -> Self {
        self.forwarded_for = Some(value.into());
        self
    }

    /// Set `x-real-ip`
    pub fn with_real_ip(mut self, value: impl Into<String>) -> Self {
        self.real_ip = Some(value.into());
        self
    }

    /// Set `x-client-ip`
    pub fn with_client_ip(mut self, value: impl Into<String>) -> Self {
        self.client_ip = Some(value.into());
        self
    }

    /// Candidate addresses in precedence order
    fn candidates(&self) -> impl Iterator<Item = &str> {
        [
            self.direct_address.as_deref(),
            self.forwarded_for.as_ref().and_then(HeaderValue::first_entry),
            self.real_ip.as_deref(),
            self.client_ip.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Normalize an address as reported by a socket layer
///
/// - `::1` becomes `127.0.0.1`
/// - `::ffff:a.b.c.d` becomes `a.b.c.d`
/// - anything else is returned trimmed but otherwise unchanged
pub fn normalize_address(address: &str) -> String {
    let address = address.trim();

    if address == IPV6_LOOPBACK {
        return IPV4_LOOPBACK.to_string();
    }

    let prefix_len = IPV4_MAPPED_PREFIX.len();
    let mapped = address
        .get(..prefix_len)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(IPV4_MAPPED_PREFIX));
    if mapped {
        if let Some(embedded) = address.get(prefix_len..).filter(|e| is_valid_ipv4(e)) {
            return embedded.to_string();
        }
    }

    address.to_string()
}

/// Extract the caller's address from request metadata
///
/// Precedence: pre-parsed address, first `x-forwarded-for` entry,
/// `x-real-ip`, `x-client-ip`. Blank values are skipped.
pub fn extract_client_address(request: &RequestMetadata) -> String {
    request
        .candidates()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .map(normalize_address)
        .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())
}
