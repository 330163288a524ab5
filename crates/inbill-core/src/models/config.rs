//! Application configuration for the processing pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::clients::RetryPolicy;
use crate::error::ConfigError;

/// Main configuration for the inbill pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InbillConfig {
    /// Filesystem locations.
    pub paths: PathsConfig,

    /// Batch window and polling behavior.
    pub processing: ProcessingConfig,

    /// Retry policy for collaborator calls.
    pub retry: RetryConfig,
}

impl Default for InbillConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            processing: ProcessingConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Filesystem locations used by the pipeline and its local clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Rule file with partner and exclusion rules.
    pub rules_file: PathBuf,

    /// Directory where inbound `.eml` files are dropped.
    pub inbox_dir: PathBuf,

    /// Root of the sync folder that receives renamed invoices.
    pub storage_root: PathBuf,

    /// CSV ledger file.
    pub ledger_file: PathBuf,

    /// Processed-message state file for idempotency across runs.
    pub state_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            rules_file: PathBuf::from("rules.json"),
            inbox_dir: PathBuf::from("inbox"),
            storage_root: PathBuf::from("sync"),
            ledger_file: PathBuf::from("ledger.csv"),
            state_file: PathBuf::from("state/processed.json"),
        }
    }
}

/// Batch window and polling behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Window for the first iteration of a watch run, in hours.
    pub initial_window_hours: u32,

    /// Window for subsequent watch iterations, in hours.
    pub poll_window_hours: u32,

    /// Minutes between watch iterations.
    pub watch_interval_minutes: u32,

    /// Largest PDF attachment accepted, in megabytes.
    pub max_pdf_size_mb: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            initial_window_hours: 24,
            poll_window_hours: 1,
            watch_interval_minutes: 10,
            max_pdf_size_mb: 50,
        }
    }
}

/// Bounded retry with fixed backoff, applied at collaborator call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,

    /// Fixed pause between attempts, in seconds.
    pub backoff_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_seconds: 30,
        }
    }
}

impl InbillConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Retry policy built from the configured bounds.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            backoff: Duration::from_secs(self.retry.backoff_seconds),
        }
    }

    /// Attachment size cap in bytes.
    pub fn max_pdf_size_bytes(&self) -> usize {
        self.processing.max_pdf_size_mb as usize * 1024 * 1024
    }

    /// Check the values before they are used or written back.
    ///
    /// Every path must be non-empty, the retry count and the window and
    /// interval settings at least 1. `max_pdf_size_mb` may be 0, which
    /// disables the size check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let paths = [
            ("paths.rules_file", &self.paths.rules_file),
            ("paths.inbox_dir", &self.paths.inbox_dir),
            ("paths.storage_root", &self.paths.storage_root),
            ("paths.ledger_file", &self.paths.ledger_file),
            ("paths.state_file", &self.paths.state_file),
        ];
        for (setting, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidSetting {
                    setting: setting.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }

        let minimums = [
            ("retry.max_attempts", self.retry.max_attempts),
            ("processing.initial_window_hours", self.processing.initial_window_hours),
            ("processing.poll_window_hours", self.processing.poll_window_hours),
            ("processing.watch_interval_minutes", self.processing.watch_interval_minutes),
        ];
        for (setting, value) in minimums {
            if value == 0 {
                return Err(ConfigError::InvalidSetting {
                    setting: setting.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }
}
