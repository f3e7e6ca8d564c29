//! openports - concurrent TCP reachability scanner
//!
//! Finds which `ip:port` endpoints on the host's own IPv4 interfaces accept
//! TCP connections, over the full port range or a curated list, with a hard
//! cap on probes in flight.

pub mod config;
pub mod error;
pub mod network;
pub mod output;
pub mod scanner;
pub mod top_ports;
pub mod utils;

// Re-export commonly used types
pub use config::{PortMode, ScanConfig};
pub use error::{Result, ScanError};
pub use network::{AddressEnumerator, ProbeOutcome, ProbeTask, Prober, TcpConnectProbe};
pub use scanner::{scan, ScanEngine, ScanResult, ScanStats};
pub use top_ports::{get_common_service_ports, PortSet};
pub use tokio_util::sync::CancellationToken;
