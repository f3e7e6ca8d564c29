//! Network module: interface enumeration and TCP connect probing

pub mod interface;
pub mod socket;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

pub use interface::{AddressEnumerator, InterfaceSource, NetworkInterface, SystemInterfaces};
pub use socket::{Prober, TcpConnectProbe};

/// One scheduled probe: an address and a port. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeTask {
    pub address: Ipv4Addr,
    pub port: u16,
}

impl ProbeTask {
    pub fn new(address: Ipv4Addr, port: u16) -> Self {
        Self { address, port }
    }

    pub fn endpoint(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.address, self.port)
    }
}

impl fmt::Display for ProbeTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

/// Result of exactly one probe execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub endpoint: SocketAddrV4,
    pub reachable: bool,
}

impl ProbeOutcome {
    pub fn new(endpoint: SocketAddrV4, reachable: bool) -> Self {
        Self { endpoint, reachable }
    }

    /// The endpoint in `ip:port` form
    pub fn endpoint_string(&self) -> String {
        self.endpoint.to_string()
    }
}
