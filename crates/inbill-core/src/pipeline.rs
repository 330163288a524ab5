//! The end-to-end message pipeline.
//!
//! One window run lists recent messages and walks each through
//! classification, PDF text extraction, field extraction, storage copy, and
//! ledger append. Collaborator calls go through the retry policy; a message
//! that still fails is left unmarked so the next run picks it up again,
//! while every other outcome is recorded in the processed set exactly once.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::clients::{InboxClient, LedgerClient, RetryPolicy, StorageSyncClient};
use crate::error::Result;
use crate::extract::extract;
use crate::ledger::build_row;
use crate::models::config::InbillConfig;
use crate::models::invoice::ExtractedInvoice;
use crate::models::message::{AttachmentMeta, CandidateMessage};
use crate::models::rules::{PartnerRule, RuleSet};
use crate::naming::compute_destination;
use crate::pdf;

/// Where one message ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Stored and booked with all required fields extracted.
    Processed,
    /// Stored and booked, but amount or due date fell back.
    DegradedProcessed,
    /// Dropped by an exclusion rule.
    Excluded,
    /// No rule matched, or the match carried nothing processable.
    Unmatched,
    /// A collaborator failed after retries; retried on the next run.
    Failed,
}

/// Result of booking one extracted invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Booking {
    /// File copied and row appended; holds the stored path.
    Booked(PathBuf),
    /// The ledger already carries this invoice; nothing was written.
    Duplicate(String),
}

/// Message ids handled in earlier runs, persisted as JSON between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessedSet {
    ids: BTreeSet<String>,
}

impl ProcessedSet {
    /// Load the set; a missing or unreadable file yields an empty set.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("State file {} is corrupt ({}), starting fresh", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Counters for one window run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunSummary {
    /// Messages the inbox returned for the window.
    pub scanned: usize,
    /// Fully processed: stored and booked with clean fields.
    pub processed: usize,
    /// Stored and booked with fallback fields.
    pub degraded: usize,
    /// Dropped by exclusion rules.
    pub excluded: usize,
    /// No matching rule or no processable attachment.
    pub unmatched: usize,
    /// Collaborator failures after retries.
    pub failed: usize,
    /// Already handled in an earlier run.
    pub skipped: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: MessageOutcome) {
        match outcome {
            MessageOutcome::Processed => self.processed += 1,
            MessageOutcome::DegradedProcessed => self.degraded += 1,
            MessageOutcome::Excluded => self.excluded += 1,
            MessageOutcome::Unmatched => self.unmatched += 1,
            MessageOutcome::Failed => self.failed += 1,
        }
    }

    /// Messages that produced a ledger row.
    pub fn booked(&self) -> usize {
        self.processed + self.degraded
    }
}

/// Knobs the pipeline needs from the application configuration.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Root of the year-partitioned storage tree.
    pub storage_root: PathBuf,
    /// Attachment size limit in bytes; zero disables the check.
    pub max_pdf_size: usize,
    pub retry: RetryPolicy,
}

impl PipelineOptions {
    pub fn from_config(config: &InbillConfig) -> Self {
        Self {
            storage_root: config.paths.storage_root.clone(),
            max_pdf_size: config.max_pdf_size_bytes(),
            retry: config.retry_policy(),
        }
    }
}

/// Drives messages from the inbox into storage and the ledger.
pub struct Pipeline<'a> {
    rules: &'a RuleSet,
    options: PipelineOptions,
    inbox: &'a mut dyn InboxClient,
    storage: &'a mut dyn StorageSyncClient,
    ledger: &'a mut dyn LedgerClient,
    processed: &'a mut ProcessedSet,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        rules: &'a RuleSet,
        options: PipelineOptions,
        inbox: &'a mut dyn InboxClient,
        storage: &'a mut dyn StorageSyncClient,
        ledger: &'a mut dyn LedgerClient,
        processed: &'a mut ProcessedSet,
    ) -> Self {
        Self {
            rules,
            options,
            inbox,
            storage,
            ledger,
            processed,
        }
    }

    /// Process every message received within the last `since_hours` hours.
    ///
    /// Messages seen in earlier runs are skipped. A failed message stays out
    /// of the processed set so the next window retries it.
    pub fn run_window(&mut self, since_hours: u64) -> Result<RunSummary> {
        let retry = self.options.retry;
        let messages =
            retry.run("list messages", || self.inbox.list_recent_messages(since_hours))?;

        let mut summary = RunSummary {
            scanned: messages.len(),
            ..RunSummary::default()
        };
        info!("Scanning {} messages in the {}h window", messages.len(), since_hours);

        for message in &messages {
            if self.processed.contains(&message.id) {
                debug!("Message '{}' already processed, skipping", message.id);
                summary.skipped += 1;
                continue;
            }

            let outcome = self.process_message(message);
            if outcome != MessageOutcome::Failed {
                self.processed.insert(&message.id);
            }
            summary.record(outcome);
        }

        info!(
            "Window done: {} booked, {} excluded, {} unmatched, {} failed, {} skipped",
            summary.booked(),
            summary.excluded,
            summary.unmatched,
            summary.failed,
            summary.skipped
        );
        Ok(summary)
    }

    /// Run one message through the whole pipeline.
    pub fn process_message(&mut self, message: &CandidateMessage) -> MessageOutcome {
        let classification = classify(message, self.rules);

        if classification.excluded {
            info!(
                "Excluded '{}' from {}: {}",
                message.subject,
                message.sender,
                classification.exclusion_reason.as_deref().unwrap_or("no reason")
            );
            return MessageOutcome::Excluded;
        }

        let Some(rule_name) = classification.rule.as_deref() else {
            debug!("No rule matched '{}' from {}", message.subject, message.sender);
            return MessageOutcome::Unmatched;
        };
        let Some(rule) = self.rules.get(rule_name) else {
            return MessageOutcome::Unmatched;
        };
        info!(
            "Matched rule '{}' for '{}' (confidence {:.2})",
            rule.name, message.subject, classification.confidence
        );

        let attachments = matching_attachments(message, rule);
        if attachments.is_empty() {
            warn!(
                "Message '{}' matched '{}' but has no processable PDF attachment",
                message.subject, rule.name
            );
            return MessageOutcome::Unmatched;
        }

        let mut degraded = false;
        let mut failed = false;
        for attachment in attachments {
            match self.handle_attachment(message, rule, attachment) {
                Ok(invoice) => {
                    if invoice.is_degraded() {
                        warn!(
                            "Booked '{}' with fallback fields: {}",
                            invoice.source_file,
                            invoice.low_confidence.join(", ")
                        );
                        degraded = true;
                    }
                }
                Err(e) => {
                    warn!(
                        "Attachment '{}' on message '{}' failed: {}",
                        attachment.file_name, message.id, e
                    );
                    failed = true;
                }
            }
        }

        // A failed attachment keeps the message out of the processed set; on
        // the retry run the attachments that did book land on the duplicate
        // guard instead of booking twice.
        if failed {
            MessageOutcome::Failed
        } else if degraded {
            MessageOutcome::DegradedProcessed
        } else {
            MessageOutcome::Processed
        }
    }

    fn handle_attachment(
        &mut self,
        message: &CandidateMessage,
        rule: &PartnerRule,
        attachment: &AttachmentMeta,
    ) -> Result<ExtractedInvoice> {
        let retry = self.options.retry;
        let bytes = retry.run("download attachment", || {
            self.inbox.download_attachment(&message.id, &attachment.id)
        })?;

        let text = pdf::extract_text(&bytes, self.options.max_pdf_size)?;
        let invoice = extract(rule, &text, &attachment.file_name, Local::now().date_naive())?;

        self.book(rule, &invoice, &bytes, false)?;
        Ok(invoice)
    }

    /// Copy the file and append the ledger row, with the duplicate guard in
    /// front. Shared by the inbox flow and the manual command.
    pub fn book(
        &mut self,
        rule: &PartnerRule,
        invoice: &ExtractedInvoice,
        bytes: &[u8],
        verified: bool,
    ) -> Result<Booking> {
        let (file_name, dest_dir) = compute_destination(rule, invoice, &self.options.storage_root);
        let retry = self.options.retry;

        let existing = retry.run("duplicate check", || {
            self.ledger.find_existing(&invoice.invoice_number, &file_name)
        })?;
        if let Some(existing) = existing {
            info!(
                "Invoice {} already booked ({}), skipping copy and append",
                invoice.invoice_number, existing
            );
            return Ok(Booking::Duplicate(existing));
        }

        let stored = retry.run("copy to storage", || {
            self.storage.copy_file(bytes, &dest_dir, &file_name)
        })?;

        let row = build_row(rule, invoice, &stored.display().to_string(), verified);
        retry.run("ledger append", || self.ledger.append_row(&row))?;

        info!("Booked {} -> {}", invoice.invoice_number, stored.display());
        Ok(Booking::Booked(stored))
    }
}

/// Every PDF attachment passing the rule's filename prefix filter. A message
/// can carry more than one invoice; each match is booked on its own.
fn matching_attachments<'m>(
    message: &'m CandidateMessage,
    rule: &PartnerRule,
) -> Vec<&'m AttachmentMeta> {
    message
        .pdf_attachments()
        .filter(|a| match &rule.attachment_prefix {
            Some(prefix) => a.file_name.to_lowercase().starts_with(&prefix.to_lowercase()),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::models::invoice::LedgerRow;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::time::Duration;

    struct FakeInbox {
        messages: Vec<CandidateMessage>,
        attachments: HashMap<String, Vec<u8>>,
        failing_downloads: u32,
    }

    impl InboxClient for FakeInbox {
        fn list_recent_messages(
            &mut self,
            _since_hours: u64,
        ) -> std::result::Result<Vec<CandidateMessage>, CollaboratorError> {
            Ok(self.messages.clone())
        }

        fn download_attachment(
            &mut self,
            _message_id: &str,
            attachment_id: &str,
        ) -> std::result::Result<Vec<u8>, CollaboratorError> {
            if self.failing_downloads > 0 {
                self.failing_downloads -= 1;
                return Err(CollaboratorError::Inbox("connection reset".to_string()));
            }
            self.attachments
                .get(attachment_id)
                .cloned()
                .ok_or_else(|| CollaboratorError::Inbox("attachment not found".to_string()))
        }
    }

    #[derive(Default)]
    struct FakeStorage {
        copies: Vec<(PathBuf, usize)>,
    }

    impl StorageSyncClient for FakeStorage {
        fn copy_file(
            &mut self,
            bytes: &[u8],
            dest_dir: &Path,
            file_name: &str,
        ) -> std::result::Result<PathBuf, CollaboratorError> {
            let path = dest_dir.join(file_name);
            self.copies.push((path.clone(), bytes.len()));
            Ok(path)
        }
    }

    #[derive(Default)]
    struct FakeLedger {
        rows: Vec<LedgerRow>,
        existing: HashMap<String, String>,
    }

    impl LedgerClient for FakeLedger {
        fn append_row(&mut self, row: &LedgerRow) -> std::result::Result<(), CollaboratorError> {
            self.rows.push(row.clone());
            Ok(())
        }

        fn find_existing(
            &mut self,
            invoice_number: &str,
            file_name: &str,
        ) -> std::result::Result<Option<String>, CollaboratorError> {
            if let Some(seeded) = self
                .existing
                .get(invoice_number)
                .or_else(|| self.existing.get(file_name))
            {
                return Ok(Some(seeded.clone()));
            }
            // rows appended earlier count as existing, like the real CSV scan
            Ok(self
                .rows
                .iter()
                .position(|row| {
                    (!invoice_number.is_empty() && row.file_link.contains(invoice_number))
                        || (!file_name.is_empty() && row.file_link.ends_with(file_name))
                })
                .map(|index| format!("row {}", index + 2)))
        }
    }

    /// A one-page PDF whose text layer is a single line.
    fn tiny_pdf(line: &str) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn vodafone_rules() -> RuleSet {
        let json = r#"{
            "rules": [{
                "name": "vodafone",
                "description": "Vodafone mobil",
                "sender_patterns": ["vodafone.hu"],
                "amount_patterns": [
                    {"pattern": "Total:\\s*(\\d+)\\s*Ft", "currency": "HUF"}
                ],
                "due_date_patterns": [
                    {"pattern": "Due:\\s*(\\d{4})-(\\d{2})-(\\d{2})", "format": "YYYY-MM-DD"}
                ],
                "filename_prefix": "vodafone",
                "folder": "Vodafone"
            }],
            "exclusion_rules": [
                {"sender_pattern": "newsletter.vodafone.hu", "reason": "marketing"}
            ]
        }"#;
        RuleSet::from_json(json, "test").unwrap()
    }

    fn inbox_message(id: &str, sender: &str, file_name: &str) -> CandidateMessage {
        CandidateMessage {
            id: id.to_string(),
            sender: sender.to_string(),
            subject: "Havi számla".to_string(),
            attachments: vec![AttachmentMeta {
                id: format!("{id}-att"),
                file_name: file_name.to_string(),
                size: 4096,
            }],
            received_at: Utc::now(),
        }
    }

    fn options() -> PipelineOptions {
        PipelineOptions {
            storage_root: PathBuf::from("/sync"),
            max_pdf_size: 0,
            retry: RetryPolicy {
                max_attempts: 3,
                backoff: Duration::ZERO,
            },
        }
    }

    struct Harness {
        inbox: FakeInbox,
        storage: FakeStorage,
        ledger: FakeLedger,
        processed: ProcessedSet,
    }

    impl Harness {
        fn new(messages: Vec<CandidateMessage>, pdf_line: &str) -> Self {
            let mut attachments = HashMap::new();
            for message in &messages {
                for attachment in &message.attachments {
                    attachments.insert(attachment.id.clone(), tiny_pdf(pdf_line));
                }
            }
            Self {
                inbox: FakeInbox {
                    messages,
                    attachments,
                    failing_downloads: 0,
                },
                storage: FakeStorage::default(),
                ledger: FakeLedger::default(),
                processed: ProcessedSet::default(),
            }
        }

        fn run(&mut self, rules: &RuleSet) -> RunSummary {
            let mut pipeline = Pipeline::new(
                rules,
                options(),
                &mut self.inbox,
                &mut self.storage,
                &mut self.ledger,
                &mut self.processed,
            );
            pipeline.run_window(24).unwrap()
        }
    }

    #[test]
    fn test_message_processed_end_to_end() {
        let rules = vodafone_rules();
        let message = inbox_message("m1", "noreply@vodafone.hu", "KI2501065_szamla.pdf");
        let mut h = Harness::new(vec![message], "Total: 21489 Ft Due: 2025-09-15");

        let summary = h.run(&rules);

        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 0);
        assert!(h.processed.contains("m1"));

        assert_eq!(h.ledger.rows.len(), 1);
        let row = &h.ledger.rows[0];
        assert_eq!(row.due_date, "2025-09-15");
        assert_eq!(row.expense_huf, "21489");
        assert_eq!(row.description, "Vodafone mobil");

        assert_eq!(h.storage.copies.len(), 1);
        let (stored, _) = &h.storage.copies[0];
        assert!(stored.starts_with("/sync"));
        assert!(stored.to_string_lossy().contains("/Vodafone/"));
    }

    #[test]
    fn test_books_every_matching_attachment() {
        let rules = vodafone_rules();
        let mut message = inbox_message("m1", "noreply@vodafone.hu", "KI2501065_szamla.pdf");
        message.attachments.push(AttachmentMeta {
            id: "m1-att-2".to_string(),
            file_name: "KI2501066_szamla.pdf".to_string(),
            size: 4096,
        });
        let mut h = Harness::new(vec![message], "Total: 21489 Ft Due: 2025-09-15");

        let first = h.run(&rules);
        assert_eq!(first.processed, 1);
        assert_eq!(h.ledger.rows.len(), 2);
        assert_eq!(h.storage.copies.len(), 2);

        // both invoices are booked, so the next run has nothing left to do
        let second = h.run(&rules);
        assert_eq!(second.skipped, 1);
        assert_eq!(h.ledger.rows.len(), 2);
    }

    #[test]
    fn test_failed_attachment_retries_without_double_booking() {
        let rules = vodafone_rules();
        let mut message = inbox_message("m1", "noreply@vodafone.hu", "KI2501065_szamla.pdf");
        message.attachments.push(AttachmentMeta {
            id: "m1-att-2".to_string(),
            file_name: "KI2501066_szamla.pdf".to_string(),
            size: 4096,
        });
        let mut h = Harness::new(vec![message], "Total: 21489 Ft Due: 2025-09-15");
        // the first download burns every retry attempt, the second one works
        h.inbox.failing_downloads = 3;

        let first = h.run(&rules);
        assert_eq!(first.failed, 1);
        assert!(!h.processed.contains("m1"));
        assert_eq!(h.ledger.rows.len(), 1);

        let second = h.run(&rules);
        assert_eq!(second.processed, 1);
        assert_eq!(h.ledger.rows.len(), 2);
        assert_eq!(h.storage.copies.len(), 2);
    }

    #[test]
    fn test_excluded_message_skips_everything() {
        let rules = vodafone_rules();
        let message = inbox_message("m1", "promo@newsletter.vodafone.hu", "ajanlat.pdf");
        let mut h = Harness::new(vec![message], "Total: 1 Ft");

        let summary = h.run(&rules);

        assert_eq!(summary.excluded, 1);
        assert_eq!(h.ledger.rows.len(), 0);
        assert_eq!(h.storage.copies.len(), 0);
        // excluded messages are not revisited
        assert!(h.processed.contains("m1"));
    }

    #[test]
    fn test_unmatched_sender() {
        let rules = vodafone_rules();
        let message = inbox_message("m1", "billing@unknown.example", "szamla.pdf");
        let mut h = Harness::new(vec![message], "Total: 1 Ft");

        let summary = h.run(&rules);

        assert_eq!(summary.unmatched, 1);
        assert_eq!(h.ledger.rows.len(), 0);
        assert!(h.processed.contains("m1"));
    }

    #[test]
    fn test_matched_without_pdf_counts_unmatched() {
        let rules = vodafone_rules();
        let mut message = inbox_message("m1", "noreply@vodafone.hu", "kep.jpg");
        message.attachments[0].file_name = "kep.jpg".to_string();
        let mut h = Harness::new(vec![message], "ignored");

        let summary = h.run(&rules);

        assert_eq!(summary.unmatched, 1);
        assert_eq!(h.storage.copies.len(), 0);
        assert!(h.processed.contains("m1"));
    }

    #[test]
    fn test_degraded_when_amount_missing() {
        let rules = vodafone_rules();
        let message = inbox_message("m1", "noreply@vodafone.hu", "KI2501065_szamla.pdf");
        let mut h = Harness::new(vec![message], "Due: 2025-09-15 but no total here");

        let summary = h.run(&rules);

        assert_eq!(summary.degraded, 1);
        assert_eq!(summary.processed, 0);
        // row still appended, with empty amount cells
        assert_eq!(h.ledger.rows.len(), 1);
        assert_eq!(h.ledger.rows[0].expense_huf, "");
        assert!(h.processed.contains("m1"));
    }

    #[test]
    fn test_duplicate_guard_skips_copy_and_append() {
        let rules = vodafone_rules();
        let message = inbox_message("m1", "noreply@vodafone.hu", "KI2501065_szamla.pdf");
        let mut h = Harness::new(vec![message], "Total: 21489 Ft Due: 2025-09-15");
        h.ledger
            .existing
            .insert("KI2501065".to_string(), "row 42".to_string());

        let summary = h.run(&rules);

        assert_eq!(summary.processed, 1);
        assert_eq!(h.ledger.rows.len(), 0);
        assert_eq!(h.storage.copies.len(), 0);
    }

    #[test]
    fn test_download_failure_leaves_message_for_next_run() {
        let rules = vodafone_rules();
        let message = inbox_message("m1", "noreply@vodafone.hu", "KI2501065_szamla.pdf");
        let mut h = Harness::new(vec![message], "Total: 21489 Ft Due: 2025-09-15");
        h.inbox.failing_downloads = 3;

        let summary = h.run(&rules);
        assert_eq!(summary.failed, 1);
        assert!(!h.processed.contains("m1"));
        assert_eq!(h.ledger.rows.len(), 0);

        // next window: downloads recover, the message is picked up again
        let summary = h.run(&rules);
        assert_eq!(summary.processed, 1);
        assert!(h.processed.contains("m1"));
        assert_eq!(h.ledger.rows.len(), 1);
    }

    #[test]
    fn test_second_run_skips_processed_messages() {
        let rules = vodafone_rules();
        let message = inbox_message("m1", "noreply@vodafone.hu", "KI2501065_szamla.pdf");
        let mut h = Harness::new(vec![message], "Total: 21489 Ft Due: 2025-09-15");

        let first = h.run(&rules);
        assert_eq!(first.processed, 1);

        let second = h.run(&rules);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.processed, 0);
        assert_eq!(h.ledger.rows.len(), 1);
    }

    #[test]
    fn test_transient_download_failure_recovers_within_retries() {
        let rules = vodafone_rules();
        let message = inbox_message("m1", "noreply@vodafone.hu", "KI2501065_szamla.pdf");
        let mut h = Harness::new(vec![message], "Total: 21489 Ft Due: 2025-09-15");
        h.inbox.failing_downloads = 2;

        let summary = h.run(&rules);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn test_processed_set_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("processed.json");

        let mut set = ProcessedSet::default();
        set.insert("m1");
        set.insert("m2");
        set.save(&path).unwrap();

        let loaded = ProcessedSet::load(&path);
        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains("m1"));
        assert!(loaded.contains("m2"));
        assert!(!loaded.contains("m3"));
    }

    #[test]
    fn test_processed_set_missing_file_is_empty() {
        let set = ProcessedSet::load(Path::new("/nonexistent/state.json"));
        assert!(set.is_empty());
    }
}
