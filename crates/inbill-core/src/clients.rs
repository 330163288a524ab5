//! Collaborator traits and the shared retry policy.
//!
//! The pipeline talks to the outside world (inbox, file storage, ledger)
//! through these narrow traits. Concrete clients live in the CLI crate so
//! the core stays synchronous and testable with in-memory fakes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::error::CollaboratorError;
use crate::models::invoice::LedgerRow;
use crate::models::message::CandidateMessage;

/// Source of candidate messages and their attachment bytes.
pub trait InboxClient {
    /// Messages received within the last `since_hours` hours, oldest first.
    fn list_recent_messages(
        &mut self,
        since_hours: u64,
    ) -> Result<Vec<CandidateMessage>, CollaboratorError>;

    /// Raw bytes of one attachment.
    fn download_attachment(
        &mut self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Vec<u8>, CollaboratorError>;
}

/// Destination file store. The implementation owns the collision rule:
/// an existing file is never overwritten, the new copy gets a `_1`, `_2`,
/// ... suffix instead.
pub trait StorageSyncClient {
    /// Write `bytes` under `dest_dir/file_name`, creating directories as
    /// needed, and return the path actually written.
    fn copy_file(
        &mut self,
        bytes: &[u8],
        dest_dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf, CollaboratorError>;
}

/// Append-only bookkeeping ledger.
pub trait LedgerClient {
    fn append_row(&mut self, row: &LedgerRow) -> Result<(), CollaboratorError>;

    /// An existing entry matching the invoice number or the destination
    /// filename, used as the duplicate guard before appending.
    fn find_existing(
        &mut self,
        invoice_number: &str,
        file_name: &str,
    ) -> Result<Option<String>, CollaboratorError>;
}

/// Fixed-backoff retry for collaborator calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Run `attempt` up to `max_attempts` times, sleeping `backoff` between
    /// failures. The terminal error carries the operation name and the last
    /// failure reason.
    pub fn run<T>(
        &self,
        operation: &str,
        mut attempt: impl FnMut() -> Result<T, CollaboratorError>,
    ) -> Result<T, CollaboratorError> {
        let attempts = self.max_attempts.max(1);
        let mut last_reason = String::new();

        for current in 1..=attempts {
            match attempt() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("{} attempt {}/{} failed: {}", operation, current, attempts, e);
                    last_reason = e.to_string();
                    if current < attempts && !self.backoff.is_zero() {
                        std::thread::sleep(self.backoff);
                    }
                }
            }
        }

        Err(CollaboratorError::RetriesExhausted {
            operation: operation.to_string(),
            attempts,
            reason: last_reason,
        })
    }
}
