// # netpos-core
//
// Core library for resilient network-position resolution.
//
// ## Architecture Overview
//
// This library answers four questions about where a process sits on the network:
// - **Public address**: through an ordered chain of HTTP providers
// - **Client address**: from the connection and proxy headers of a request
// - **Location**: geolocation of an address, through a provider chain
// - **Interfaces**: the host's network interfaces, through the OS
//
// The moving parts:
// - **Fetcher / InterfaceLister**: Capability traits implemented by sibling crates
// - **FallbackResolver**: Sequential provider fallback with per-attempt timeouts
// - **TtlCache**: Per-resolver read-through cache
// - **ProviderRegistry**: Name → provider lookup so chains come from configuration
// - **Aggregator**: Concurrent "everything at once" resolution
//
// ## Design Principles
//
// 1. **Capabilities are injected**: no HTTP client or OS call lives in this crate
// 2. **Failures are values**: provider failures are logged and absorbed by the chain
// 3. **No globals**: every cache belongs to one resolver in one aggregator

pub mod aggregator;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod ip;
pub mod kind;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod retry;
pub mod traits;

// Re-export core types for convenience
pub use aggregator::{AggregationPolicy, Aggregator, CompositeResult, ResolveRequest, ResolvedValue};
pub use cache::TtlCache;
pub use client::{RequestMetadata, extract_client_address, normalize_address};
pub use config::{NetposConfig, ResolutionConfig};
pub use error::{Error, Result};
pub use kind::ResourceKind;
pub use provider::{EndpointTemplate, GeoLocation, ProviderSpec};
pub use registry::ProviderRegistry;
pub use retry::RetryPolicy;
pub use traits::{Fetcher, InterfaceLister, InterfaceMap};
