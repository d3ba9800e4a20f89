//! Local interface resolution
//!
//! There is only one source for local interfaces, so this is a plain
//! read-through cache in front of the [`InterfaceLister`].

use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::config::ResolutionConfig;
use crate::error::Result;
use crate::kind::ResourceKind;
use crate::traits::{InterfaceLister, InterfaceMap};

/// Cached view of the host's interfaces
pub struct InterfaceResolver {
    lister: Arc<dyn InterfaceLister>,
    cache: TtlCache<InterfaceMap>,
}

impl InterfaceResolver {
    /// Create a resolver with a fresh, empty cache
    pub fn new(lister: Arc<dyn InterfaceLister>, config: &ResolutionConfig) -> Self {
        Self {
            lister,
            cache: TtlCache::new(config.cache_ttl(), config.cache_enabled),
        }
    }

    /// Current interfaces, from cache when live
    pub fn resolve(&self) -> Result<InterfaceMap> {
        let key = ResourceKind::Interfaces.cache_key(None);
        if let Some(interfaces) = self.cache.get(&key) {
            debug!("Cache hit for {}", key);
            return Ok(interfaces);
        }

        let interfaces = self.lister.list_interfaces().inspect_err(|e| {
            warn!("Interface enumeration failed: {}", e);
        })?;

        debug!("Enumerated {} interface(s)", interfaces.len());
        self.cache.set(key, interfaces.clone());
        Ok(interfaces)
    }

    /// Drop the cached snapshot
    pub fn clear_cache(&self) {
        self.cache.invalidate(None);
    }
}
