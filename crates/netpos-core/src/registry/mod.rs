//! Named provider registry
//!
//! The registry maps provider names to [`ProviderSpec`]s so fallback chains
//! can be assembled from configuration (an ordered list of names) instead of
//! hard-coded lists.
//!
//! ## Usage
//!
//! ```rust
//! use netpos_core::registry::ProviderRegistry;
//!
//! let registry = ProviderRegistry::with_builtin();
//! let chain = registry
//!     .public_ip_chain(&["icanhazip".to_string(), "ipify".to_string()])
//!     .unwrap();
//! assert_eq!(chain[0].name(), "icanhazip");
//! ```
//!
//! ## Registration
//!
//! Custom providers register under their own name and can then be listed in
//! `ResolutionConfig::providers` like the built-in ones:
//!
//! ```rust,ignore
//! registry.register_location(ProviderSpec::new(
//!     "internal-geo",
//!     EndpointTemplate::new("https://geo.internal/{param}"),
//!     parse_internal,
//!     |loc: &GeoLocation| loc.is_complete(),
//! ));
//! ```

use crate::error::{Error, Result};
use crate::provider::{GeoLocation, ProviderSpec, location, public_ip};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

type Specs<T> = RwLock<HashMap<String, ProviderSpec<T>>>;

/// Provider registry for configuration-driven fallback chains
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered public address providers
    public_ip: Specs<String>,

    /// Registered geolocation providers
    location: Specs<GeoLocation>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in provider
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        for spec in public_ip::builtin() {
            registry.register_public_ip(spec);
        }
        for spec in location::builtin() {
            registry.register_location(spec);
        }
        registry
    }

    /// Register a public address provider under its own name
    ///
    /// Registering a name twice replaces the earlier spec.
    pub fn register_public_ip(&self, spec: ProviderSpec<String>) {
        insert(&self.public_ip, spec);
    }

    /// Register a geolocation provider under its own name
    pub fn register_location(&self, spec: ProviderSpec<GeoLocation>) {
        insert(&self.location, spec);
    }

    /// Build the public address chain for `names`, preserving their order
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<ProviderSpec>)`: One spec per name
    /// - `Err(Error)`: If any name is not registered
    pub fn public_ip_chain(&self, names: &[String]) -> Result<Vec<ProviderSpec<String>>> {
        chain(&self.public_ip, "public-ip", names)
    }

    /// Build the geolocation chain for `names`, preserving their order
    pub fn location_chain(&self, names: &[String]) -> Result<Vec<ProviderSpec<GeoLocation>>> {
        chain(&self.location, "location", names)
    }

    /// List registered public address providers (sorted)
    pub fn list_public_ip(&self) -> Vec<String> {
        list(&self.public_ip)
    }

    /// List registered geolocation providers (sorted)
    pub fn list_location(&self) -> Vec<String> {
        list(&self.location)
    }

    /// Check if a public address provider is registered
    pub fn has_public_ip(&self, name: &str) -> bool {
        self.public_ip
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Check if a geolocation provider is registered
    pub fn has_location(&self, name: &str) -> bool {
        self.location
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

fn insert<T>(specs: &Specs<T>, spec: ProviderSpec<T>) {
    let mut specs = specs.write().unwrap_or_else(PoisonError::into_inner);
    specs.insert(spec.name().to_string(), spec);
}

fn chain<T>(specs: &Specs<T>, kind: &str, names: &[String]) -> Result<Vec<ProviderSpec<T>>> {
    let specs = specs.read().unwrap_or_else(PoisonError::into_inner);

    names
        .iter()
        .map(|name| {
            specs.get(name).cloned().ok_or_else(|| {
                Error::config(format!("Unknown {} provider: {}", kind, name))
            })
        })
        .collect()
}

fn list<T>(specs: &Specs<T>) -> Vec<String> {
    let specs = specs.read().unwrap_or_else(PoisonError::into_inner);
    let mut names: Vec<String> = specs.keys().cloned().collect();
    names.sort();
    names
}
