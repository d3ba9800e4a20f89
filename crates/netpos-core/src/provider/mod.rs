//! Provider descriptions and the built-in catalogs
//!
//! - [`ProviderSpec`]: How to query one service and trust its answer
//! - [`public_ip`]: Public address services
//! - [`location`]: Geolocation services

pub mod location;
pub mod public_ip;
pub mod spec;

pub use location::GeoLocation;
pub use spec::{EndpointTemplate, ProviderSpec};
