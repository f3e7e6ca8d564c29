//! Error handling for the openports scanner
//!
//! Only interface listing can abort a scan. Per-interface address failures are
//! skipped, and an unreachable endpoint is a normal probe outcome, not an error.

use std::io;
use thiserror::Error;

/// Main error type for scanning operations
#[derive(Debug, Error)]
pub enum ScanError {
    /// Listing the host's network interfaces failed. Nothing is scanned.
    #[error("Interface enumeration failed: {0}")]
    EnumerationError(#[source] io::Error),

    /// Reading the bound addresses of a single interface failed.
    #[error("Address retrieval failed for interface {interface}: {source}")]
    AddressRetrievalError {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Scan cancelled")]
    Cancelled,

    /// The task collecting reachable endpoints stopped before the scan finished.
    #[error("Result collection failed: {0}")]
    CollectionError(#[source] tokio::task::JoinError),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Output error: {0}")]
    OutputError(String),
}

impl ScanError {
    /// Whether the error ends the scan it occurred in.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ScanError::AddressRetrievalError { .. })
    }
}

/// Result type alias for scan operations
pub type Result<T> = std::result::Result<T, ScanError>;
