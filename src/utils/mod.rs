//! Utility modules for the scanner

pub mod config;

use crate::config::ScanConfig;
use crate::scanner::ScanResult;

/// Logging utilities
pub struct Logger;

impl Logger {
    /// Initialize logger with specified level. `RUST_LOG` still applies per module.
    pub fn init(level: log::LevelFilter) {
        env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .format_timestamp_secs()
            .init();
    }

    /// Map a `-v` count to a level filter
    pub fn level_from_verbosity(verbosity: u8) -> log::LevelFilter {
        match verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    /// Log scan start
    pub fn log_scan_start(addresses: usize, ports: usize, config: &ScanConfig) {
        log::info!(
            "Starting scan of {} address(es) x {} port(s), {} in flight, {}ms timeout",
            addresses,
            ports,
            config.max_in_flight,
            config.timeout
        );
    }

    /// Log scan completion
    pub fn log_scan_complete(result: &ScanResult) {
        log::info!(
            "Scan completed in {:.2}s - {} open endpoint(s), {} probes ({:.0}/s)",
            result.duration.as_secs_f64(),
            result.len(),
            result.stats.probes_completed,
            result.scan_rate()
        );
    }
}

/// File descriptor limit helpers
pub struct FdLimit;

impl FdLimit {
    /// Current soft limit on open files, if the platform reports one
    #[cfg(unix)]
    pub fn current() -> Option<u64> {
        rlimit::Resource::NOFILE.get().ok().map(|(soft, _)| soft)
    }

    #[cfg(not(unix))]
    pub fn current() -> Option<u64> {
        None
    }

    /// Try to raise the soft and hard limit to `limit`. Returns the limit in effect afterwards.
    #[cfg(unix)]
    pub fn raise(limit: u64) -> Option<u64> {
        if let Err(e) = rlimit::Resource::NOFILE.set(limit, limit) {
            log::warn!("Failed to set file descriptor limit to {}: {}", limit, e);
        }
        Self::current()
    }

    #[cfg(not(unix))]
    pub fn raise(_limit: u64) -> Option<u64> {
        None
    }
}
