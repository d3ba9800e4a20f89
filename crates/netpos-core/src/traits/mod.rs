//! Capability traits consumed by the resolution layer
//!
//! - [`Fetcher`]: HTTP transport for provider requests
//! - [`InterfaceLister`]: Local interface enumeration

pub mod fetcher;
pub mod interfaces;

pub use fetcher::Fetcher;
pub use interfaces::{AddressFamily, InterfaceAddress, InterfaceLister, InterfaceMap, UNKNOWN_MAC};
