//! Output formatting and management

use crate::error::{Result, ScanError};
use crate::scanner::{ScanResult, ScanStats};
use colored::*;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::str::FromStr;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    /// One `ip:port` per line
    Greppable,
}

impl FromStr for OutputFormat {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "greppable" | "grep" => Ok(OutputFormat::Greppable),
            _ => Err(ScanError::OutputError(format!("Unknown output format: {}", s))),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub file: Option<String>,
    pub colored: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            file: None,
            colored: true,
        }
    }
}

#[derive(Serialize)]
struct JsonScanResult<'a> {
    endpoints: Vec<String>,
    duration_ms: u128,
    stats: &'a ScanStats,
}

/// Main output manager
pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Write scan results to the configured file, or stdout.
    ///
    /// File and stdout failures surface as [`ScanError::IoError`].
    pub fn write_results(&self, results: &ScanResult) -> Result<()> {
        let output = self.render(results)?;

        match &self.config.file {
            Some(filename) => {
                let mut file = File::create(filename)?;
                file.write_all(output.as_bytes())?;
            }
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle.write_all(output.as_bytes())?;
                handle.flush()?;
            }
        }

        Ok(())
    }

    /// Render scan results in the configured format
    pub fn render(&self, results: &ScanResult) -> Result<String> {
        match self.config.format {
            OutputFormat::Text => Ok(self.format_text(results)),
            OutputFormat::Json => self.format_json(results),
            OutputFormat::Greppable => Ok(self.format_greppable(results)),
        }
    }

    fn format_text(&self, results: &ScanResult) -> String {
        let mut output = String::new();

        if results.is_empty() {
            output.push_str(&self.colorize("No reachable endpoints found\n", "yellow"));
        } else {
            output.push_str(&self.colorize("OPEN ENDPOINTS:\n", "green"));
            for endpoint in results.sorted_endpoints() {
                output.push_str(&format!("  {}\n", endpoint));
            }
        }

        output.push_str(&format!(
            "\n{} endpoint(s) open, {} probe(s) in {:.2}s\n",
            results.len(),
            results.stats.probes_completed,
            results.duration.as_secs_f64()
        ));
        if results.stats.faults > 0 {
            output.push_str(&self.colorize(
                &format!("{} probe(s) faulted\n", results.stats.faults),
                "red",
            ));
        }

        output
    }

    fn format_json(&self, results: &ScanResult) -> Result<String> {
        let json_result = JsonScanResult {
            endpoints: results.sorted_endpoints(),
            duration_ms: results.duration.as_millis(),
            stats: &results.stats,
        };
        let mut json = serde_json::to_string_pretty(&json_result)
            .map_err(|e| ScanError::OutputError(format!("Failed to encode JSON: {}", e)))?;
        json.push('\n');
        Ok(json)
    }

    fn format_greppable(&self, results: &ScanResult) -> String {
        results
            .sorted_endpoints()
            .into_iter()
            .map(|endpoint| endpoint + "\n")
            .collect()
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.config.colored {
            return text.to_string();
        }
        match color {
            "green" => text.green().bold().to_string(),
            "yellow" => text.yellow().to_string(),
            "red" => text.red().to_string(),
            _ => text.to_string(),
        }
    }
}
