// # Interface Lister Trait
//
// Defines the local interface-enumeration capability.
//
// ## Implementations
//
// - getifaddrs-based (Unix): `netpos-iface` crate
//
// Enumeration is read-only, synchronous and never touches the network.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Address family of an interface address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    #[serde(rename = "IPv4")]
    V4,
    #[serde(rename = "IPv6")]
    V6,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// One address bound to a local interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceAddress {
    /// The address itself
    pub address: String,
    /// Netmask in the family's textual form
    pub netmask: String,
    /// IPv4 or IPv6
    pub family: AddressFamily,
    /// Hardware address (`00:00:00:00:00:00` when unknown)
    pub mac: String,
    /// Loopback or otherwise not reachable from outside the host
    pub internal: bool,
    /// `address/prefix`, when the netmask is a contiguous prefix
    pub cidr: Option<String>,
}

/// Interface name to its addresses, ordered by name
pub type InterfaceMap = BTreeMap<String, Vec<InterfaceAddress>>;

/// Hardware address reported when none is known
pub const UNKNOWN_MAC: &str = "00:00:00:00:00:00";

/// Trait for local interface enumeration
pub trait InterfaceLister: Send + Sync {
    /// List every interface with at least one IPv4 or IPv6 address
    fn list_interfaces(&self) -> Result<InterfaceMap, crate::Error>;
}
