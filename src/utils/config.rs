//! Configuration checks against the running system

use crate::config::{PortMode, ScanConfig};
use crate::utils::FdLimit;

/// Descriptors kept free for stdio, log files and the runtime itself
pub const FD_HEADROOM: u64 = 64;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Warnings about the configuration on this host. None of them stop a scan.
    pub fn system_warnings(config: &ScanConfig) -> Vec<String> {
        Self::warnings_for_limit(config, FdLimit::current())
    }

    /// Warnings for a given soft descriptor limit
    pub fn warnings_for_limit(config: &ScanConfig, fd_limit: Option<u64>) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(limit) = fd_limit {
            let usable = limit.saturating_sub(FD_HEADROOM);
            if config.max_in_flight as u64 > usable {
                warnings.push(format!(
                    "max_in_flight {} exceeds the file descriptor limit {} (minus {} headroom); \
                     probes beyond it will fail as unreachable. Lower --max-in-flight or raise --ulimit",
                    config.max_in_flight, limit, FD_HEADROOM
                ));
            }
        }

        if config.port_mode == PortMode::Full && config.timeout > 5000 {
            warnings.push(format!(
                "A {}ms timeout on a full-range scan can take a very long time",
                config.timeout
            ));
        }

        if config.port_mode == PortMode::Common && config.common_ports.is_empty() {
            warnings.push("No common ports configured; the scan will probe nothing".to_string());
        }

        warnings
    }
}
