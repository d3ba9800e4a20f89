//! Resource kinds and cache keys

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The category of fact being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// The machine's public address, as seen by external services
    PublicIp,
    /// The caller's address, extracted from request metadata
    ClientAddress,
    /// Geolocation for an address (or for the machine itself)
    Location,
    /// Local network interfaces
    Interfaces,
}

impl ResourceKind {
    /// Every kind, in a stable order
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::PublicIp,
        ResourceKind::ClientAddress,
        ResourceKind::Location,
        ResourceKind::Interfaces,
    ];

    /// Stable textual name, also used as cache key prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::PublicIp => "public-ip",
            ResourceKind::ClientAddress => "client-address",
            ResourceKind::Location => "location",
            ResourceKind::Interfaces => "interfaces",
        }
    }

    /// Compute the cache key for a resolution of this kind
    ///
    /// A parameterless resolution maps to the bare kind name, which contains
    /// no `:` and so never collides with a parameterized key.
    pub fn cache_key(&self, param: Option<&str>) -> String {
        match param {
            Some(p) => format!("{}:{}", self.as_str(), p),
            None => self.as_str().to_string(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public-ip" | "public_ip" | "ip" => Ok(ResourceKind::PublicIp),
            "client-address" | "client_address" | "client" => Ok(ResourceKind::ClientAddress),
            "location" | "geo" => Ok(ResourceKind::Location),
            "interfaces" | "network" => Ok(ResourceKind::Interfaces),
            other => Err(crate::Error::config(format!("Unknown resource kind: {}", other))),
        }
    }
}
