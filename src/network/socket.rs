//! TCP connect probing

use async_trait::async_trait;
use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::TcpStream;

/// A single reachability check against one endpoint.
///
/// Implementations make exactly one attempt and never retry. Every failure mode
/// (refused, timed out, unreachable) is reported as `false`.
#[async_trait]
pub trait Prober: Send + Sync + 'static {
    async fn probe(&self, endpoint: SocketAddrV4) -> bool;
}

/// TCP connect scanner bounded by a per-attempt timeout
#[derive(Debug, Clone)]
pub struct TcpConnectProbe {
    timeout: Duration,
}

impl TcpConnectProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Prober for TcpConnectProbe {
    async fn probe(&self, endpoint: SocketAddrV4) -> bool {
        let addr = SocketAddr::V4(endpoint);

        match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                // Close right away, a full scan holds thousands of these.
                drop(stream);
                true
            }
            Ok(Err(_)) => false, // Refused or unreachable
            Err(_) => false,     // Timeout
        }
    }
}
