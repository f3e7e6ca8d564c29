//! Configuration module for the openports scanner

use crate::error::{Result, ScanError};
use crate::top_ports::get_common_service_ports;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default per-probe connect timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 200;

/// Default number of probes allowed in flight at once
pub const DEFAULT_MAX_IN_FLIGHT: usize = 1000;

/// Name of the per-user configuration file
pub const CONFIG_FILE_NAME: &str = ".openports.toml";

/// Which ports are probed on every address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortMode {
    /// Every port from 1 to 65535
    Full,
    /// The configured `common_ports` list, as given
    #[default]
    Common,
}

impl FromStr for PortMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(PortMode::Full),
            "common" => Ok(PortMode::Common),
            other => Err(ScanError::ConfigError(format!(
                "Unknown port mode '{}' (expected 'full' or 'common')",
                other
            ))),
        }
    }
}

impl fmt::Display for PortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortMode::Full => write!(f, "full"),
            PortMode::Common => write!(f, "common"),
        }
    }
}

/// Main configuration structure for scanning operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Timeout for each connection attempt in milliseconds
    pub timeout: u64,

    /// Maximum number of probes holding an admission slot at once
    pub max_in_flight: usize,

    /// Full range or curated list
    pub port_mode: PortMode,

    /// Ports probed in `common` mode, in probe order
    pub common_ports: Vec<u16>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_MS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            port_mode: PortMode::Common,
            common_ports: get_common_service_ports(),
        }
    }
}

impl ScanConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-probe timeout in milliseconds
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the in-flight cap
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Set the port mode
    pub fn with_port_mode(mut self, port_mode: PortMode) -> Self {
        self.port_mode = port_mode;
        self
    }

    /// Set the common port list
    pub fn with_common_ports(mut self, ports: Vec<u16>) -> Self {
        self.common_ports = ports;
        self
    }

    /// Get timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Number of ports probed on each address
    pub fn ports_per_address(&self) -> usize {
        match self.port_mode {
            PortMode::Full => usize::from(u16::MAX),
            PortMode::Common => self.common_ports.len(),
        }
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ScanError::ConfigError(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from `~/.openports.toml`, falling back to defaults
    pub fn load_default_config() -> Self {
        let Some(home_dir) = dirs::home_dir() else {
            return Self::default();
        };
        let config_path = home_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Self::default();
        }

        match Self::from_toml_file(&config_path) {
            Ok(config) => {
                log::info!("Loaded config from {}", config_path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring {}: {}", config_path.display(), e);
                Self::default()
            }
        }
    }

    /// Apply `OPENPORTS_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup. Unparsable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(timeout) = lookup("OPENPORTS_TIMEOUT") {
            match timeout.trim().parse() {
                Ok(timeout) => self.timeout = timeout,
                Err(_) => log::warn!("Ignoring OPENPORTS_TIMEOUT={}", timeout),
            }
        }

        if let Some(max_in_flight) = lookup("OPENPORTS_MAX_IN_FLIGHT") {
            match max_in_flight.trim().parse() {
                Ok(max_in_flight) => self.max_in_flight = max_in_flight,
                Err(_) => log::warn!("Ignoring OPENPORTS_MAX_IN_FLIGHT={}", max_in_flight),
            }
        }

        if let Some(mode) = lookup("OPENPORTS_PORT_MODE") {
            match mode.trim().parse() {
                Ok(mode) => self.port_mode = mode,
                Err(_) => log::warn!("Ignoring OPENPORTS_PORT_MODE={}", mode),
            }
        }

        if let Some(ports) = lookup("OPENPORTS_PORTS") {
            match parse_port_list(&ports) {
                Ok(ports) => self.common_ports = ports,
                Err(e) => log::warn!("Ignoring OPENPORTS_PORTS: {}", e),
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(ScanError::ConfigError(
                "max_in_flight must be greater than 0".to_string(),
            ));
        }

        if self.max_in_flight > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(ScanError::ConfigError(format!(
                "max_in_flight {} is above the supported maximum {}",
                self.max_in_flight,
                tokio::sync::Semaphore::MAX_PERMITS
            )));
        }

        if self.timeout == 0 {
            return Err(ScanError::ConfigError(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if self.port_mode == PortMode::Common && self.common_ports.contains(&0) {
            return Err(ScanError::ConfigError(
                "Port 0 cannot be probed (valid range is 1-65535)".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse a comma separated port list such as `22,80,443`.
///
/// Order and duplicates are preserved.
pub fn parse_port_list(input: &str) -> Result<Vec<u16>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u16>()
                .map_err(|_| ScanError::ConfigError(format!("Invalid port '{}'", part)))
        })
        .collect()
}
