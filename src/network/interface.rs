//! Local interface enumeration
//!
//! Produces the IPv4 addresses a scan probes. Listing the interfaces is the
//! only fatal step; an interface whose addresses cannot be read is skipped.

use crate::error::{Result, ScanError};
use std::io;
use std::net::{IpAddr, Ipv4Addr};

/// A local network interface, as listed by an [`InterfaceSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    pub name: String,
    pub index: u32,
    /// Addresses captured when the interface was listed
    pub addresses: Vec<IpAddr>,
}

impl NetworkInterface {
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
            addresses: Vec::new(),
        }
    }

    pub fn with_addresses(mut self, addresses: Vec<IpAddr>) -> Self {
        self.addresses = addresses;
        self
    }
}

/// Where interfaces and their bound addresses come from
pub trait InterfaceSource: Send + Sync {
    /// List every local interface.
    fn interfaces(&self) -> io::Result<Vec<NetworkInterface>>;

    /// Bound addresses of one interface, in any address family.
    fn addresses(&self, interface: &NetworkInterface) -> io::Result<Vec<IpAddr>> {
        Ok(interface.addresses.clone())
    }
}

/// Interfaces of the running host
///
/// One listing call reads every interface together with its addresses, so a
/// failed listing is reported instead of looking like a host without interfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

#[cfg(unix)]
impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> io::Result<Vec<NetworkInterface>> {
        use nix::ifaddrs::getifaddrs;
        use nix::net::if_::if_nametoindex;
        use std::net::{SocketAddrV4, SocketAddrV6};

        let entries = getifaddrs().map_err(io::Error::from)?.map(|ifaddr| {
            let ip = ifaddr.address.as_ref().and_then(|address| {
                if let Some(sin) = address.as_sockaddr_in() {
                    Some(IpAddr::V4(*SocketAddrV4::from(*sin).ip()))
                } else {
                    address
                        .as_sockaddr_in6()
                        .map(|sin6| IpAddr::V6(*SocketAddrV6::from(*sin6).ip()))
                }
            });
            (ifaddr.interface_name, ip)
        });

        Ok(group_by_interface(entries, |name| {
            if_nametoindex(name).unwrap_or(0)
        }))
    }
}

#[cfg(not(unix))]
impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> io::Result<Vec<NetworkInterface>> {
        let interfaces: Vec<NetworkInterface> = pnet::datalink::interfaces()
            .into_iter()
            .map(|iface| {
                let addresses = iface.ips.iter().map(|net| net.ip()).collect();
                NetworkInterface::new(iface.name, iface.index).with_addresses(addresses)
            })
            .collect();

        // Every host has at least a loopback interface.
        if interfaces.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "no network interfaces could be listed",
            ));
        }
        Ok(interfaces)
    }
}

/// Fold `getifaddrs`-style entries, one per (interface, address), into
/// interfaces in first-seen order. Entries without an address still name
/// their interface.
pub(crate) fn group_by_interface<I, F>(entries: I, index_of: F) -> Vec<NetworkInterface>
where
    I: IntoIterator<Item = (String, Option<IpAddr>)>,
    F: Fn(&str) -> u32,
{
    let mut interfaces: Vec<NetworkInterface> = Vec::new();
    for (name, ip) in entries {
        let position = match interfaces.iter().position(|iface| iface.name == name) {
            Some(position) => position,
            None => {
                let index = index_of(&name);
                interfaces.push(NetworkInterface::new(name, index));
                interfaces.len() - 1
            }
        };
        if let Some(ip) = ip {
            interfaces[position].addresses.push(ip);
        }
    }
    interfaces
}

/// Lists the IPv4 addresses bound to local interfaces
#[derive(Debug, Clone, Default)]
pub struct AddressEnumerator<S = SystemInterfaces> {
    source: S,
}

impl AddressEnumerator<SystemInterfaces> {
    pub fn new() -> Self {
        Self {
            source: SystemInterfaces,
        }
    }
}

impl<S: InterfaceSource> AddressEnumerator<S> {
    pub fn with_source(source: S) -> Self {
        Self { source }
    }

    /// List usable IPv4 addresses in interface order.
    ///
    /// Loopback addresses are kept. An address bound to two interfaces is
    /// returned twice; within one interface each address appears once.
    pub fn list_ipv4_addresses(&self) -> Result<Vec<Ipv4Addr>> {
        let interfaces = self
            .source
            .interfaces()
            .map_err(ScanError::EnumerationError)?;

        let mut addresses = Vec::new();
        for interface in &interfaces {
            let bound = match self.source.addresses(interface) {
                Ok(bound) => bound,
                Err(source) => {
                    let err = ScanError::AddressRetrievalError {
                        interface: interface.name.clone(),
                        source,
                    };
                    log::debug!("Skipping interface: {}", err);
                    continue;
                }
            };

            let mut per_interface: Vec<Ipv4Addr> = Vec::with_capacity(bound.len());
            for ip in bound.into_iter().filter_map(as_ipv4) {
                if !per_interface.contains(&ip) {
                    per_interface.push(ip);
                }
            }
            addresses.extend(per_interface);
        }

        Ok(addresses)
    }
}

/// IPv4 view of an address. IPv4-mapped IPv6 (`::ffff:a.b.c.d`) counts as IPv4.
pub fn as_ipv4(ip: IpAddr) -> Option<Ipv4Addr> {
    match ip {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(v6) => v6.to_ipv4_mapped(),
    }
}
