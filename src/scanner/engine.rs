//! Bounded-concurrency scan engine
//!
//! Every `(address, port)` pair becomes one probe task. A task must hold one of
//! `max_in_flight` semaphore permits while it runs, so dispatch blocks when the
//! pool is saturated. The engine returns only after every spawned task has
//! been joined.

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::network::{
    AddressEnumerator, InterfaceSource, ProbeOutcome, ProbeTask, Prober, TcpConnectProbe,
};
use crate::scanner::{ResultAggregator, ScanResult, ScanStats};
use crate::top_ports::PortSet;
use crate::utils::Logger;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Scan the host's local IPv4 addresses and return the reachable `ip:port` endpoints.
///
/// The list is unordered. Fails with [`ScanError::EnumerationError`] when the
/// interfaces cannot be listed, or [`ScanError::ConfigError`] for an invalid config.
pub async fn scan(config: ScanConfig) -> Result<Vec<String>> {
    let engine = ScanEngine::new(config)?;
    let result = engine.scan().await?;
    Ok(result.into_endpoints())
}

/// Main scanning engine
///
/// Owns its admission semaphore, so two engines never share a concurrency
/// budget. Runs on the same engine do share it.
pub struct ScanEngine<P = TcpConnectProbe> {
    config: ScanConfig,
    prober: Arc<P>,
    semaphore: Arc<Semaphore>,
    cancel: Option<CancellationToken>,
}

impl ScanEngine<TcpConnectProbe> {
    /// Create an engine that probes with real TCP connects
    pub fn new(config: ScanConfig) -> Result<Self> {
        let prober = TcpConnectProbe::new(config.timeout_duration());
        Self::with_prober(config, prober)
    }
}

impl<P: Prober> ScanEngine<P> {
    /// Create an engine with a custom probe implementation
    pub fn with_prober(config: ScanConfig, prober: P) -> Result<Self> {
        config.validate()?;

        let semaphore = Arc::new(Semaphore::new(config.max_in_flight));
        Ok(Self {
            config,
            prober: Arc::new(prober),
            semaphore,
            cancel: None,
        })
    }

    /// Stop the scan early when `token` fires. A cancelled scan returns
    /// [`ScanError::Cancelled`], never a partial list.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Admission slots not currently held by a probe
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Enumerate local addresses and scan them
    pub async fn scan(&self) -> Result<ScanResult> {
        self.scan_with(&AddressEnumerator::new()).await
    }

    /// Scan the addresses produced by `enumerator`
    pub async fn scan_with<S: InterfaceSource>(
        &self,
        enumerator: &AddressEnumerator<S>,
    ) -> Result<ScanResult> {
        let addresses = enumerator.list_ipv4_addresses()?;
        let ports = PortSet::from_config(&self.config);
        self.run(&addresses, &ports).await
    }

    /// Probe every pair of `addresses` x `ports`, addresses outer, ports inner.
    pub async fn run(&self, addresses: &[Ipv4Addr], ports: &PortSet) -> Result<ScanResult> {
        let start_time = Instant::now();
        Logger::log_scan_start(addresses.len(), ports.len(), &self.config);

        let cancel = self.cancel.clone().unwrap_or_default();
        let (recorder, aggregator) = ResultAggregator::spawn();
        let mut tasks = JoinSet::new();
        let mut stats = ScanStats::default();
        let mut cancelled = false;
        let mut interrupted = false;

        'dispatch: for &address in addresses {
            for port in ports {
                let task = ProbeTask::new(address, port);

                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break 'dispatch;
                    }
                    permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        // The semaphore is never closed while the engine lives.
                        Err(_) => {
                            cancelled = true;
                            break 'dispatch;
                        }
                    },
                };

                let prober = Arc::clone(&self.prober);
                let recorder = recorder.clone();
                let cancel = cancel.clone();
                tasks.spawn(async move {
                    // Dropped on completion or unwind, so a faulting probe
                    // still gives its slot back.
                    let _permit = permit;
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        reachable = prober.probe(task.endpoint()) => Some(reachable),
                    };
                    match outcome {
                        Some(reachable) => {
                            recorder.record_if_reachable(ProbeOutcome::new(task.endpoint(), reachable));
                            true
                        }
                        // Cut short by cancellation
                        None => false,
                    }
                });
                stats.probes_dispatched += 1;

                while let Some(joined) = tasks.try_join_next() {
                    interrupted |= !record_join(&mut stats, joined);
                }
            }
        }

        // Fan-in barrier
        drop(recorder);
        while let Some(joined) = tasks.join_next().await {
            interrupted |= !record_join(&mut stats, joined);
        }
        let endpoints = aggregator.finalize().await?;

        // A token fired after the last probe settled leaves the result complete.
        if cancelled || interrupted {
            log::warn!(
                "Scan cancelled after {} of {} probes",
                stats.probes_completed,
                addresses.len() * ports.len()
            );
            return Err(ScanError::Cancelled);
        }

        stats.reachable = endpoints.len() as u64;
        let result = ScanResult {
            endpoints,
            duration: start_time.elapsed(),
            stats,
        };
        Logger::log_scan_complete(&result);

        Ok(result)
    }
}

/// Count a joined probe task. Returns false if cancellation cut it short.
fn record_join(stats: &mut ScanStats, joined: std::result::Result<bool, JoinError>) -> bool {
    stats.probes_completed += 1;
    match joined {
        Ok(settled) => settled,
        Err(e) => {
            stats.faults += 1;
            log::warn!("Probe task failed: {}", e);
            true
        }
    }
}
