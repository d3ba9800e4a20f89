//! Concurrent aggregation of independent resolutions
//!
//! The [`Aggregator`] owns one resolver per kind, each with its own cache, and
//! answers "everything at once" requests by running the requested
//! resolutions concurrently.
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!   ResolveRequest ──▶ │  Aggregator  │ ──▶ CompositeResult
//!                      └──────────────┘
//!                             │ join_all
//!        ┌────────────────────┼─────────────────────┬──────────────────┐
//!        ▼                    ▼                     ▼                  ▼
//! ┌──────────────┐   ┌────────────────┐   ┌──────────────────┐  ┌─────────────┐
//! │ public-ip    │   │ location       │   │ interfaces       │  │ client      │
//! │ Fallback     │   │ Fallback       │   │ InterfaceResolver│  │ (local,     │
//! │ Resolver     │   │ Resolver       │   │                  │  │  uncached)  │
//! └──────────────┘   └────────────────┘   └──────────────────┘  └─────────────┘
//! ```
//!
//! ## Policies
//!
//! - [`AggregationPolicy::AllOrNothing`]: any failed kind fails the call
//! - [`AggregationPolicy::BestEffort`]: failures are reported per kind

pub mod result;

pub use result::{CompositeResult, ResolvedValue};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::{RequestMetadata, UNKNOWN_ADDRESS, extract_client_address};
use crate::config::NetposConfig;
use crate::error::{Error, Result};
use crate::ip::is_valid_ip;
use crate::kind::ResourceKind;
use crate::provider::GeoLocation;
use crate::registry::ProviderRegistry;
use crate::resolver::{FallbackResolver, InterfaceResolver};
use crate::traits::{Fetcher, InterfaceLister, InterfaceMap};

/// How failures of individual kinds affect the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Any failure fails the whole call; no partial result
    AllOrNothing,
    /// Every kind's value or error is kept
    #[default]
    BestEffort,
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationPolicy::AllOrNothing => f.write_str("all_or_nothing"),
            AggregationPolicy::BestEffort => f.write_str("best_effort"),
        }
    }
}

impl FromStr for AggregationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all_or_nothing" | "strict" => Ok(AggregationPolicy::AllOrNothing),
            "best_effort" | "partial" => Ok(AggregationPolicy::BestEffort),
            other => Err(Error::config(format!("Unknown aggregation policy: {}", other))),
        }
    }
}

/// What an aggregate call should resolve
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    /// Kinds to resolve; duplicates are ignored
    pub kinds: Vec<ResourceKind>,

    /// Address to geolocate; the machine itself when absent
    #[serde(default)]
    pub location_target: Option<String>,

    /// Request metadata for the client address
    #[serde(default)]
    pub client: Option<RequestMetadata>,
}

impl ResolveRequest {
    /// Request the given kinds
    pub fn new(kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Request every kind
    pub fn everything() -> Self {
        Self::new(ResourceKind::ALL)
    }

    /// Geolocate `target` instead of the machine itself
    pub fn with_location_target(mut self, target: impl Into<String>) -> Self {
        self.location_target = Some(target.into());
        self
    }

    /// Extract the client address from `client`
    pub fn with_client(mut self, client: RequestMetadata) -> Self {
        self.client = Some(client);
        self
    }

    fn unique_kinds(&self) -> Vec<ResourceKind> {
        let mut kinds = Vec::with_capacity(self.kinds.len());
        for kind in &self.kinds {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }
}

/// Owner of every resolver, and the entry point for aggregate resolution
///
/// ## Lifecycle
///
/// 1. Build with [`Aggregator::new()`] (or [`Aggregator::with_registry()`])
/// 2. Resolve individual kinds or call [`Aggregator::resolve_all()`]
/// 3. To change settings, call [`Aggregator::reconfigure()`] and swap the
///    returned instance in; in-flight calls keep using the old one
///
/// Nothing is global: two aggregators never share caches.
///
/// Single-kind calls ([`Aggregator::public_ip()`], [`Aggregator::location()`],
/// [`Aggregator::interfaces()`]) return bare values. Timestamps belong to
/// [`CompositeResult`], stamped when `resolve_all` or `status` assembles it.
pub struct Aggregator {
    /// Settings every resolver was built from
    config: NetposConfig,

    /// Public address chain
    public_ip: FallbackResolver<String>,

    /// Geolocation chain
    location: FallbackResolver<GeoLocation>,

    /// Local interfaces
    interfaces: InterfaceResolver,

    /// Capabilities kept for reconfiguration
    fetcher: Arc<dyn Fetcher>,
    lister: Arc<dyn InterfaceLister>,
    registry: Arc<ProviderRegistry>,
}

impl Aggregator {
    /// Create an aggregator over the built-in providers
    ///
    /// # Parameters
    ///
    /// - `config`: Validated before anything is built
    /// - `fetcher`: HTTP transport shared by every network chain
    /// - `lister`: Local interface enumeration
    pub fn new(
        config: NetposConfig,
        fetcher: Arc<dyn Fetcher>,
        lister: Arc<dyn InterfaceLister>,
    ) -> Result<Self> {
        Self::with_registry(
            config,
            fetcher,
            lister,
            Arc::new(ProviderRegistry::with_builtin()),
        )
    }

    /// Create an aggregator whose chains are looked up in `registry`
    pub fn with_registry(
        config: NetposConfig,
        fetcher: Arc<dyn Fetcher>,
        lister: Arc<dyn InterfaceLister>,
        registry: Arc<ProviderRegistry>,
    ) -> Result<Self> {
        config.validate()?;

        let public_ip = FallbackResolver::new(
            ResourceKind::PublicIp,
            registry.public_ip_chain(&config.public_ip.providers)?,
            Arc::clone(&fetcher),
            config.public_ip.clone(),
        );

        let location = FallbackResolver::new(
            ResourceKind::Location,
            registry.location_chain(&config.location.providers)?,
            Arc::clone(&fetcher),
            config.location.clone(),
        )
        .with_param_check(is_valid_ip);

        let interfaces = InterfaceResolver::new(Arc::clone(&lister), &config.interfaces);

        debug!(
            "Aggregator built: public-ip {:?}, location {:?}",
            public_ip.provider_names(),
            location.provider_names()
        );

        Ok(Self {
            config,
            public_ip,
            location,
            interfaces,
            fetcher,
            lister,
            registry,
        })
    }

    /// Build a fresh aggregator with new settings and empty caches
    ///
    /// `self` is left untouched.
    pub fn reconfigure(&self, config: NetposConfig) -> Result<Self> {
        info!("Rebuilding resolvers with new configuration");
        Self::with_registry(
            config,
            Arc::clone(&self.fetcher),
            Arc::clone(&self.lister),
            Arc::clone(&self.registry),
        )
    }

    /// Settings this aggregator was built from
    pub fn config(&self) -> &NetposConfig {
        &self.config
    }

    /// The machine's public address
    pub async fn public_ip(&self) -> Result<String> {
        self.public_ip.resolve(None).await
    }

    /// Geolocation of `target`, or of the machine itself when `None`
    ///
    /// An invalid `target` fails before any provider is contacted.
    pub async fn location(&self, target: Option<&str>) -> Result<GeoLocation> {
        self.location.resolve(target).await
    }

    /// Local interfaces
    pub fn interfaces(&self) -> Result<InterfaceMap> {
        self.interfaces.resolve()
    }

    /// The caller's address; never fails
    pub fn client_address(&self, request: &RequestMetadata) -> String {
        extract_client_address(request)
    }

    /// Resolve several kinds concurrently
    ///
    /// Every requested kind is attempted whatever happens to the others.
    ///
    /// # Returns
    ///
    /// - `Ok(CompositeResult)`: Under best-effort always; under all-or-nothing
    ///   only when every kind resolved
    /// - `Err(Error::AggregateFailed)`: All-or-nothing and some kind failed
    ///   (the first failed kind in request order is reported)
    /// - `Err(Error::InvalidParameter)`: All-or-nothing and the location
    ///   target is not an address; nothing is attempted
    ///
    /// Under best-effort an invalid location target only fails the location
    /// kind, without contacting any provider.
    pub async fn resolve_all(
        &self,
        request: &ResolveRequest,
        policy: AggregationPolicy,
    ) -> Result<CompositeResult> {
        let kinds = request.unique_kinds();

        if policy == AggregationPolicy::AllOrNothing
            && kinds.contains(&ResourceKind::Location)
            && let Some(target) = request.location_target.as_deref()
            && !is_valid_ip(target)
        {
            return Err(Error::invalid_parameter(format!(
                "{:?} is not a valid IP address",
                target
            )));
        }

        let outcomes = self.collect(&kinds, request).await;

        if policy == AggregationPolicy::AllOrNothing {
            let mut values = BTreeMap::new();
            for (kind, outcome) in outcomes {
                match outcome {
                    Ok(value) => {
                        values.insert(kind, Some(value));
                    }
                    Err(e) => {
                        warn!("Aggregate resolution failed on {}: {}", kind, e);
                        return Err(Error::aggregate(kind, e));
                    }
                }
            }
            return Ok(CompositeResult::new(values, BTreeMap::new()));
        }

        Ok(best_effort(outcomes))
    }

    /// Best-effort resolution of every kind that needs no caller input
    ///
    /// Intended for health and status reporting.
    pub async fn status(&self) -> CompositeResult {
        let kinds = [
            ResourceKind::PublicIp,
            ResourceKind::Location,
            ResourceKind::Interfaces,
        ];
        let outcomes = self.collect(&kinds, &ResolveRequest::default()).await;
        best_effort(outcomes)
    }

    /// Drop every cached value
    pub fn clear_caches(&self) {
        self.public_ip.clear_cache();
        self.location.clear_cache();
        self.interfaces.clear_cache();
    }

    /// Run one resolution per kind concurrently, keeping request order
    async fn collect(
        &self,
        kinds: &[ResourceKind],
        request: &ResolveRequest,
    ) -> Vec<(ResourceKind, Result<ResolvedValue>)> {
        join_all(
            kinds
                .iter()
                .map(|&kind| async move { (kind, self.resolve_kind(kind, request).await) }),
        )
        .await
    }

    async fn resolve_kind(&self, kind: ResourceKind, request: &ResolveRequest) -> Result<ResolvedValue> {
        match kind {
            ResourceKind::PublicIp => self.public_ip().await.map(ResolvedValue::PublicIp),
            ResourceKind::Location => self
                .location(request.location_target.as_deref())
                .await
                .map(ResolvedValue::Location),
            ResourceKind::Interfaces => self.interfaces().map(ResolvedValue::Interfaces),
            ResourceKind::ClientAddress => {
                let address = request
                    .client
                    .as_ref()
                    .map(|client| self.client_address(client))
                    .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string());
                Ok(ResolvedValue::ClientAddress(address))
            }
        }
    }
}

fn best_effort(outcomes: Vec<(ResourceKind, Result<ResolvedValue>)>) -> CompositeResult {
    let mut values = BTreeMap::new();
    let mut errors = BTreeMap::new();

    for (kind, outcome) in outcomes {
        match outcome {
            Ok(value) => {
                values.insert(kind, Some(value));
            }
            Err(e) => {
                debug!("{} unresolved: {}", kind, e);
                values.insert(kind, None);
                errors.insert(kind, e.to_string());
            }
        }
    }

    CompositeResult::new(values, errors)
}
