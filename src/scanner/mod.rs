//! Scanner module containing the scheduling engine and result collection

pub mod engine;

use crate::error::{Result, ScanError};
use crate::network::ProbeOutcome;
use serde::{Deserialize, Serialize};
use std::net::SocketAddrV4;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use engine::{scan, ScanEngine};

/// Complete scan result
///
/// `endpoints` is an unordered set: probes complete in whatever order the
/// network answers them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    /// Reachable endpoints as `ip:port`
    pub endpoints: Vec<String>,

    /// Total scan duration
    pub duration: Duration,

    /// Scan statistics
    pub stats: ScanStats,
}

impl ScanResult {
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn contains(&self, endpoint: &str) -> bool {
        self.endpoints.iter().any(|e| e == endpoint)
    }

    /// Endpoints sorted by address then port, for display
    pub fn sorted_endpoints(&self) -> Vec<String> {
        let mut parsed: Vec<(Option<SocketAddrV4>, &String)> = self
            .endpoints
            .iter()
            .map(|e| (e.parse().ok(), e))
            .collect();
        parsed.sort();
        parsed.into_iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn into_endpoints(self) -> Vec<String> {
        self.endpoints
    }

    /// Get scan rate in probes per second
    pub fn scan_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.stats.probes_completed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Scan statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Probes that were admitted and spawned
    pub probes_dispatched: u64,

    /// Probes whose task finished, including faulted ones
    pub probes_completed: u64,

    /// Probes that connected
    pub reachable: u64,

    /// Probe tasks that panicked
    pub faults: u64,
}

/// Write side of the result collection, one clone per probe task
#[derive(Debug, Clone)]
pub(crate) struct ResultRecorder {
    tx: mpsc::UnboundedSender<SocketAddrV4>,
}

impl ResultRecorder {
    /// Record the endpoint if and only if the probe reached it.
    pub(crate) fn record_if_reachable(&self, outcome: ProbeOutcome) {
        if outcome.reachable {
            // Only fails once the aggregator is gone, when nobody reads results.
            let _ = self.tx.send(outcome.endpoint);
        }
    }
}

/// Single consumer that owns the result list
///
/// Probe tasks never touch the list directly; they send through a
/// [`ResultRecorder`] and one background task appends.
#[derive(Debug)]
pub(crate) struct ResultAggregator {
    handle: JoinHandle<Vec<String>>,
}

impl ResultAggregator {
    /// Start the consumer task. Must be called inside a tokio runtime.
    pub(crate) fn spawn() -> (ResultRecorder, Self) {
        let (tx, mut rx) = mpsc::unbounded_channel::<SocketAddrV4>();

        let handle = tokio::spawn(async move {
            let mut endpoints = Vec::new();
            while let Some(endpoint) = rx.recv().await {
                log::debug!("Reachable: {}", endpoint);
                endpoints.push(endpoint.to_string());
            }
            endpoints
        });

        (ResultRecorder { tx }, Self { handle })
    }

    /// Wait for every recorder to be dropped and return the collection.
    ///
    /// A consumer that panicked or was aborted loses the collection, so the
    /// scan fails with [`ScanError::CollectionError`].
    pub(crate) async fn finalize(self) -> Result<Vec<String>> {
        self.handle.await.map_err(ScanError::CollectionError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn outcome(port: u16, reachable: bool) -> ProbeOutcome {
        ProbeOutcome::new(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port), reachable)
    }

    #[tokio::test]
    async fn aggregator_keeps_only_reachable_outcomes() {
        let (recorder, aggregator) = ResultAggregator::spawn();

        recorder.record_if_reachable(outcome(22, false));
        recorder.record_if_reachable(outcome(8089, true));
        recorder.record_if_reachable(outcome(443, false));
        drop(recorder);

        assert_eq!(aggregator.finalize().await.unwrap(), vec!["127.0.0.1:8089"]);
    }

    #[tokio::test]
    async fn concurrent_recorders_all_land() {
        let (recorder, aggregator) = ResultAggregator::spawn();

        let mut handles = Vec::new();
        for port in 1..=200u16 {
            let recorder = recorder.clone();
            handles.push(tokio::spawn(async move {
                recorder.record_if_reachable(outcome(port, port % 2 == 0));
            }));
        }
        drop(recorder);
        for handle in handles {
            handle.await.unwrap();
        }

        let endpoints = aggregator.finalize().await.unwrap();
        assert_eq!(endpoints.len(), 100);
    }

    #[tokio::test]
    async fn aborted_aggregator_fails_instead_of_returning_empty() {
        let (recorder, aggregator) = ResultAggregator::spawn();
        recorder.record_if_reachable(outcome(8089, true));
        aggregator.handle.abort();

        let result = aggregator.finalize().await;
        assert!(matches!(result, Err(ScanError::CollectionError(_))));
        drop(recorder);
    }

    #[test]
    fn sorted_endpoints_orders_numerically() {
        let result = ScanResult {
            endpoints: vec![
                "127.0.0.1:8089".to_string(),
                "10.0.0.2:22".to_string(),
                "127.0.0.1:443".to_string(),
            ],
            ..Default::default()
        };

        assert_eq!(
            result.sorted_endpoints(),
            vec!["10.0.0.2:22", "127.0.0.1:443", "127.0.0.1:8089"]
        );
        assert!(result.contains("127.0.0.1:443"));
        assert!(!result.contains("127.0.0.1:80"));
    }
}
