// # System Interface Lister
//
// This crate enumerates the host's network interfaces.
//
// ## Implementation
//
// On Unix, `getifaddrs(3)` is walked once per call through `nix::ifaddrs`:
// - IPv4 / IPv6 entries become `InterfaceAddress` values
// - Link-layer entries (Linux) provide each interface's hardware address
// - `IFF_LOOPBACK` marks an address as internal
//
// Interfaces without any IPv4 or IPv6 address are omitted.
//
// ## Platform Support
//
// Unix only. On other platforms every call returns `Error::Interfaces`.

use netpos_core::traits::{InterfaceLister, InterfaceMap};
use netpos_core::Result;

use std::net::IpAddr;

/// InterfaceLister backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl SystemInterfaces {
    pub fn new() -> Self {
        Self
    }
}

impl InterfaceLister for SystemInterfaces {
    fn list_interfaces(&self) -> Result<InterfaceMap> {
        let interfaces = sys::list()?;
        tracing::trace!("getifaddrs reported {} interface(s)", interfaces.len());
        Ok(interfaces)
    }
}

/// Prefix length of a contiguous netmask
///
/// Returns `None` for masks with holes (`255.0.255.0`).
pub fn prefix_len(netmask: IpAddr) -> Option<u32> {
    let (bits, ones) = match netmask {
        IpAddr::V4(mask) => {
            let bits = u32::from(mask);
            (bits.leading_ones(), bits.count_ones())
        }
        IpAddr::V6(mask) => {
            let bits = u128::from(mask);
            (bits.leading_ones(), bits.count_ones())
        }
    };
    (bits == ones).then_some(ones)
}

/// Colon-separated lowercase hex
pub fn format_mac(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(unix)]
mod sys {
    use super::prefix_len;
    #[cfg(any(target_os = "linux", target_os = "android"))]
    use super::format_mac;
    use netpos_core::traits::{AddressFamily, InterfaceAddress, InterfaceMap, UNKNOWN_MAC};
    use netpos_core::{Error, Result};

    use nix::ifaddrs::getifaddrs;
    use nix::net::if_::InterfaceFlags;
    use nix::sys::socket::SockaddrStorage;

    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddrV4, SocketAddrV6};

    struct RawAddress {
        name: String,
        address: IpAddr,
        netmask: IpAddr,
        internal: bool,
    }

    pub(super) fn list() -> Result<InterfaceMap> {
        let entries = getifaddrs()
            .map_err(|errno| Error::interfaces(format!("getifaddrs failed: {}", errno)))?;

        let mut macs: HashMap<String, String> = HashMap::new();
        let mut addresses = Vec::new();

        for entry in entries {
            let Some(ref storage) = entry.address else {
                continue;
            };

            if let Some(mac) = mac_of(storage) {
                macs.insert(entry.interface_name.clone(), mac);
                continue;
            }

            let Some(address) = ip_of(storage) else {
                continue;
            };
            let netmask = entry
                .netmask
                .as_ref()
                .and_then(ip_of)
                .unwrap_or(match address {
                    IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
                });

            addresses.push(RawAddress {
                name: entry.interface_name,
                address,
                netmask,
                internal: entry.flags.contains(InterfaceFlags::IFF_LOOPBACK),
            });
        }

        let mut map = InterfaceMap::new();
        for raw in addresses {
            let mac = macs
                .get(&raw.name)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_MAC.to_string());
            let family = match raw.address {
                IpAddr::V4(_) => AddressFamily::V4,
                IpAddr::V6(_) => AddressFamily::V6,
            };

            map.entry(raw.name).or_default().push(InterfaceAddress {
                address: raw.address.to_string(),
                netmask: raw.netmask.to_string(),
                family,
                mac,
                internal: raw.internal,
                cidr: prefix_len(raw.netmask).map(|prefix| format!("{}/{}", raw.address, prefix)),
            });
        }

        Ok(map)
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn mac_of(storage: &SockaddrStorage) -> Option<String> {
        storage
            .as_link_addr()
            .and_then(|link| link.addr())
            .map(|bytes| format_mac(&bytes))
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn mac_of(_storage: &SockaddrStorage) -> Option<String> {
        None
    }

    fn ip_of(storage: &SockaddrStorage) -> Option<IpAddr> {
        if let Some(sin) = storage.as_sockaddr_in() {
            return Some(IpAddr::V4(*SocketAddrV4::from(*sin).ip()));
        }
        storage
            .as_sockaddr_in6()
            .map(|sin6| IpAddr::V6(*SocketAddrV6::from(*sin6).ip()))
    }

}

#[cfg(not(unix))]
mod sys {
    use netpos_core::traits::InterfaceMap;
    use netpos_core::{Error, Result};

    pub(super) fn list() -> Result<InterfaceMap> {
        Err(Error::interfaces(
            "Interface enumeration is only supported on Unix",
        ))
    }
}
