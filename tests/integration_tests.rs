//! Integration tests for the openports scanner
//!
//! Scans are pointed at a loopback-only interface source so results do not
//! depend on what else listens on the test host.

use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use openports::{
    config::{PortMode, ScanConfig},
    network::{AddressEnumerator, InterfaceSource, NetworkInterface, Prober},
    scanner::ScanEngine,
    top_ports::PortSet,
    CancellationToken, ScanError,
};
use tokio::net::TcpListener;
use tokio::time::timeout;

/// A host with only `lo` and `127.0.0.1` on it
struct LoopbackOnly;

impl InterfaceSource for LoopbackOnly {
    fn interfaces(&self) -> io::Result<Vec<NetworkInterface>> {
        Ok(vec![NetworkInterface::new("lo", 1)])
    }

    fn addresses(&self, _interface: &NetworkInterface) -> io::Result<Vec<IpAddr>> {
        Ok(vec![
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6("::1".parse().unwrap()),
        ])
    }
}

struct BrokenListing;

impl InterfaceSource for BrokenListing {
    fn interfaces(&self) -> io::Result<Vec<NetworkInterface>> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "no netlink access"))
    }

    fn addresses(&self, _interface: &NetworkInterface) -> io::Result<Vec<IpAddr>> {
        unreachable!("addresses must not be read when listing fails")
    }
}

/// Port that nothing listens on: bind an ephemeral port, then release it.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn closed_ports(n: usize) -> Vec<u16> {
    let mut listeners = Vec::new();
    for _ in 0..n {
        listeners.push(TcpListener::bind("127.0.0.1:0").await.unwrap());
    }
    listeners
        .iter()
        .map(|l| l.local_addr().unwrap().port())
        .collect()
}

fn loopback() -> AddressEnumerator<LoopbackOnly> {
    AddressEnumerator::with_source(LoopbackOnly)
}

#[tokio::test]
async fn test_listener_in_common_ports_is_found() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap().port();
    let mut ports = closed_ports(3).await;
    ports.push(open);

    let config = ScanConfig::new().with_common_ports(ports);
    let engine = ScanEngine::new(config).unwrap();
    let result = engine.scan_with(&loopback()).await.unwrap();

    assert_eq!(result.endpoints, vec![format!("127.0.0.1:{}", open)]);
    assert_eq!(result.stats.probes_dispatched, 4);
    assert_eq!(result.stats.reachable, 1);
}

#[tokio::test]
async fn test_listener_outside_common_ports_is_not_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap().port();

    let config = ScanConfig::new().with_common_ports(closed_ports(3).await);
    let engine = ScanEngine::new(config).unwrap();
    let result = engine.scan_with(&loopback()).await.unwrap();

    assert!(result.is_empty());
    assert!(!result.contains(&format!("127.0.0.1:{}", open)));
}

#[tokio::test]
async fn test_repeat_scans_agree_as_sets() {
    let mut listeners = Vec::new();
    for _ in 0..3 {
        listeners.push(TcpListener::bind("127.0.0.1:0").await.unwrap());
    }
    let mut ports: Vec<u16> = listeners
        .iter()
        .map(|l| l.local_addr().unwrap().port())
        .collect();
    ports.extend(closed_ports(5).await);

    let config = ScanConfig::new().with_common_ports(ports);
    let engine = ScanEngine::new(config).unwrap();

    let first: HashSet<String> = engine
        .scan_with(&loopback())
        .await
        .unwrap()
        .into_endpoints()
        .into_iter()
        .collect();
    let second: HashSet<String> = engine
        .scan_with(&loopback())
        .await
        .unwrap()
        .into_endpoints()
        .into_iter()
        .collect();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_single_slot_runs_serially_without_deadlock() {
    let config = ScanConfig::new()
        .with_max_in_flight(1)
        .with_common_ports(closed_ports(3).await);
    let engine = ScanEngine::new(config).unwrap();

    let result = timeout(Duration::from_secs(10), engine.scan_with(&loopback()))
        .await
        .expect("scan with one slot must finish")
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.stats.probes_completed, 3);
    assert_eq!(engine.available_slots(), 1);
}

#[tokio::test]
async fn test_enumeration_failure_returns_error_and_no_endpoints() {
    let engine = ScanEngine::new(ScanConfig::new()).unwrap();

    let result = engine
        .scan_with(&AddressEnumerator::with_source(BrokenListing))
        .await;

    match result {
        Err(ScanError::EnumerationError(cause)) => {
            assert_eq!(cause.kind(), io::ErrorKind::PermissionDenied);
        }
        other => panic!("expected enumeration error, got {:?}", other),
    }
}

/// Peak concurrency observed by a [`GaugeProbe`]
#[derive(Default)]
struct Gauge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Sleeps while holding a slot; ports divisible by 10 are "open".
struct GaugeProbe {
    gauge: Arc<Gauge>,
    delay: Duration,
}

impl GaugeProbe {
    fn new(delay: Duration) -> (Self, Arc<Gauge>) {
        let gauge = Arc::new(Gauge::default());
        let probe = Self {
            gauge: Arc::clone(&gauge),
            delay,
        };
        (probe, gauge)
    }
}

#[async_trait]
impl Prober for GaugeProbe {
    async fn probe(&self, endpoint: SocketAddrV4) -> bool {
        let now = self.gauge.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.gauge.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.gauge.in_flight.fetch_sub(1, Ordering::SeqCst);
        endpoint.port() % 10 == 0
    }
}

#[tokio::test]
async fn test_in_flight_never_exceeds_cap() {
    for cap in [1usize, 4, 32] {
        let (probe, gauge) = GaugeProbe::new(Duration::from_millis(2));
        let config = ScanConfig::new().with_max_in_flight(cap);
        let engine = ScanEngine::with_prober(config, probe).unwrap();

        let ports = PortSet::List((1..=200).collect());
        let addresses = [Ipv4Addr::LOCALHOST, Ipv4Addr::new(10, 1, 2, 3)];
        let result = engine.run(&addresses, &ports).await.unwrap();

        let peak = gauge.peak.load(Ordering::SeqCst);
        assert!(peak <= cap, "peak {} exceeded cap {}", peak, cap);
        assert!(peak >= 1);
        assert_eq!(result.len(), 40);
        assert_eq!(result.stats.probes_completed, 400);
        assert_eq!(gauge.in_flight.load(Ordering::SeqCst), 0);
    }
}

/// Panics on one port to prove a faulting probe does not leak its slot.
struct FaultyProbe;

#[async_trait]
impl Prober for FaultyProbe {
    async fn probe(&self, endpoint: SocketAddrV4) -> bool {
        if endpoint.port() == 2 {
            panic!("probe exploded");
        }
        endpoint.port() == 3
    }
}

#[tokio::test]
async fn test_faulting_probe_releases_its_slot() {
    let config = ScanConfig::new().with_max_in_flight(1);
    let engine = ScanEngine::with_prober(config, FaultyProbe).unwrap();
    let ports = PortSet::List(vec![1, 2, 3, 2, 4]);

    let result = timeout(
        Duration::from_secs(10),
        engine.run(&[Ipv4Addr::LOCALHOST], &ports),
    )
    .await
    .expect("a panicking probe must not shrink the pool")
    .unwrap();

    assert_eq!(result.endpoints, vec!["127.0.0.1:3"]);
    assert_eq!(result.stats.faults, 2);
    assert_eq!(result.stats.probes_completed, 5);
    assert_eq!(engine.available_slots(), 1);
}

#[tokio::test]
async fn test_cancellation_mid_scan_returns_cancelled() {
    let (probe, gauge) = GaugeProbe::new(Duration::from_millis(50));
    let token = CancellationToken::new();
    let config = ScanConfig::new()
        .with_port_mode(PortMode::Full)
        .with_max_in_flight(8);
    let engine = ScanEngine::with_prober(config, probe)
        .unwrap()
        .with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let result = timeout(Duration::from_secs(10), engine.scan_with(&loopback()))
        .await
        .expect("cancelled scan must still cross the barrier");
    canceller.await.unwrap();

    assert!(matches!(result, Err(ScanError::Cancelled)));
    assert!(gauge.peak.load(Ordering::SeqCst) <= 8);
    assert_eq!(engine.available_slots(), 8);
}

#[tokio::test]
async fn test_library_scan_rejects_invalid_config() {
    let config = ScanConfig::new().with_timeout(0);
    let result = openports::scan(config).await;
    assert!(matches!(result, Err(ScanError::ConfigError(_))));
}

#[tokio::test]
async fn test_closed_port_helper_is_really_closed() {
    let port = closed_port().await;
    let engine = ScanEngine::new(ScanConfig::new()).unwrap();
    let result = engine
        .run(&[Ipv4Addr::LOCALHOST], &PortSet::List(vec![port]))
        .await
        .unwrap();
    assert!(result.is_empty());
}
