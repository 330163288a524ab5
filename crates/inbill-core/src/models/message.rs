//! Inbox message models handed to the classifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptor of a single attachment on a message.
///
/// Attachment bytes are fetched separately through the inbox client; the
/// descriptor carries only what classification and filtering need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentMeta {
    /// Client-assigned identifier used to download the bytes.
    pub id: String,

    /// Original filename as attached.
    pub file_name: String,

    /// Size in bytes.
    pub size: u64,
}

impl AttachmentMeta {
    /// Whether this attachment looks like a PDF document.
    pub fn is_pdf(&self) -> bool {
        self.file_name
            .rsplit('.')
            .next()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }
}

/// A message pulled from the inbox, transient per processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMessage {
    /// Stable message identifier from the inbox client.
    pub id: String,

    /// Sender header, either a bare address or `Name <address>`.
    pub sender: String,

    /// Subject line.
    pub subject: String,

    /// Attachments in the order they appear on the message.
    pub attachments: Vec<AttachmentMeta>,

    /// When the message was received.
    pub received_at: DateTime<Utc>,
}

impl CandidateMessage {
    /// The bare sender address, lowercased, with any display name stripped.
    pub fn sender_address(&self) -> String {
        let raw = self.sender.trim();
        let addr = match (raw.rfind('<'), raw.rfind('>')) {
            (Some(start), Some(end)) if start < end => &raw[start + 1..end],
            _ => raw,
        };
        addr.trim().to_lowercase()
    }

    /// PDF attachments only, in message order.
    pub fn pdf_attachments(&self) -> impl Iterator<Item = &AttachmentMeta> {
        self.attachments.iter().filter(|a| a.is_pdf())
    }

    /// Build a synthetic message for manual single-file classification.
    ///
    /// Sender stays empty, so only subject and attachment-prefix matchers can
    /// hit. The subject carries the filename plus a leading slice of the
    /// document text, covering rules that match on body phrases.
    pub fn synthetic(file_name: &str, text_head: &str, received_at: DateTime<Utc>) -> Self {
        let subject = if text_head.is_empty() {
            file_name.to_string()
        } else {
            format!("{file_name} {text_head}")
        };
        Self {
            id: format!("manual:{}", file_name),
            sender: String::new(),
            subject,
            attachments: vec![AttachmentMeta {
                id: "manual".to_string(),
                file_name: file_name.to_string(),
                size: 0,
            }],
            received_at,
        }
    }
}
