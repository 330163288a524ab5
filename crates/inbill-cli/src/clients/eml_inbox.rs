//! Inbox client backed by a directory of `.eml` files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mailparse::{MailHeaderMap, ParsedMail, parse_mail};
use tracing::{debug, warn};
use walkdir::WalkDir;

use inbill_core::clients::InboxClient;
use inbill_core::error::CollaboratorError;
use inbill_core::models::message::{AttachmentMeta, CandidateMessage};

/// Reads messages from a drop directory of `.eml` files.
///
/// Listing a window parses every message file received within it and caches
/// the decoded PDF attachment bytes, keyed by the attachment ids handed out
/// on the message. The cache is rebuilt on each listing, so it never holds
/// more than one window's worth of attachments.
pub struct EmlInbox {
    inbox_dir: PathBuf,
    attachments: HashMap<String, Vec<u8>>,
}

impl EmlInbox {
    pub fn new(inbox_dir: PathBuf) -> Self {
        Self {
            inbox_dir,
            attachments: HashMap::new(),
        }
    }

    fn eml_files(&self) -> Result<Vec<PathBuf>, CollaboratorError> {
        if !self.inbox_dir.is_dir() {
            return Err(CollaboratorError::Inbox(format!(
                "inbox directory not found: {}",
                self.inbox_dir.display()
            )));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&self.inbox_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|s| s.to_str())
                    .map(|s| s.eq_ignore_ascii_case("eml"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Parse one message file into a candidate, caching its PDF attachments.
    fn message_from_file(&mut self, path: &Path) -> Result<CandidateMessage, CollaboratorError> {
        let bytes = fs::read(path).map_err(|e| {
            CollaboratorError::Inbox(format!("read {}: {}", path.display(), e))
        })?;
        let mail = parse_mail(&bytes).map_err(|e| {
            CollaboratorError::Inbox(format!("parse {}: {}", path.display(), e))
        })?;

        let sender = mail.headers.get_first_value("From").unwrap_or_default();
        let subject = mail.headers.get_first_value("Subject").unwrap_or_default();
        let received_at = mail
            .headers
            .get_first_value("Date")
            .and_then(|d| mailparse::dateparse(&d).ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| file_modified_at(path))
            .unwrap_or_else(Utc::now);

        let id = mail
            .headers
            .get_first_value("Message-ID")
            .map(|v| v.trim().trim_matches(['<', '>']).to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| {
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            });

        let mut parts = Vec::new();
        collect_pdf_parts(&mail, &mut parts);

        let mut attachments = Vec::with_capacity(parts.len());
        for (index, (file_name, data)) in parts.into_iter().enumerate() {
            let attachment_id = format!("{}/{}", id, index);
            attachments.push(AttachmentMeta {
                id: attachment_id.clone(),
                file_name,
                size: data.len() as u64,
            });
            self.attachments.insert(attachment_id, data);
        }

        Ok(CandidateMessage {
            id,
            sender,
            subject,
            attachments,
            received_at,
        })
    }
}

impl InboxClient for EmlInbox {
    fn list_recent_messages(
        &mut self,
        since_hours: u64,
    ) -> Result<Vec<CandidateMessage>, CollaboratorError> {
        let files = self.eml_files()?;
        // An oversized window saturates to "everything" instead of overflowing.
        let cutoff = chrono::Duration::try_hours(since_hours.min(i64::MAX as u64) as i64)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.attachments.clear();

        let mut messages = Vec::new();
        for path in &files {
            // One broken message file must not block the rest of the window.
            match self.message_from_file(path) {
                Ok(message) if message.received_at >= cutoff => messages.push(message),
                Ok(message) => {
                    debug!(
                        "Message '{}' received {} is outside the {}h window",
                        message.id, message.received_at, since_hours
                    );
                }
                Err(e) => warn!("Skipping unreadable message file: {}", e),
            }
        }

        messages.sort_by_key(|m| m.received_at);
        debug!(
            "{} of {} message files fall in the {}h window",
            messages.len(),
            files.len(),
            since_hours
        );
        Ok(messages)
    }

    fn download_attachment(
        &mut self,
        _message_id: &str,
        attachment_id: &str,
    ) -> Result<Vec<u8>, CollaboratorError> {
        self.attachments.get(attachment_id).cloned().ok_or_else(|| {
            CollaboratorError::Inbox(format!("unknown attachment id: {}", attachment_id))
        })
    }
}

fn file_modified_at(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Walk the MIME tree collecting PDF attachments as (filename, bytes).
fn collect_pdf_parts(mail: &ParsedMail, out: &mut Vec<(String, Vec<u8>)>) {
    let file_name = part_file_name(mail);
    let mime = mail.ctype.mimetype.to_ascii_lowercase();
    let is_pdf = mime == "application/pdf"
        || file_name
            .as_deref()
            .map(|n| n.to_lowercase().ends_with(".pdf"))
            .unwrap_or(false);

    if is_pdf {
        match mail.get_body_raw() {
            Ok(data) => {
                let name = file_name.unwrap_or_else(|| "attachment.pdf".to_string());
                out.push((name, data));
            }
            Err(e) => warn!("Failed to decode attachment body: {}", e),
        }
        return;
    }

    for part in &mail.subparts {
        collect_pdf_parts(part, out);
    }
}

/// Filename from the disposition, falling back to the content-type name.
fn part_file_name(mail: &ParsedMail) -> Option<String> {
    let disposition = mail.get_content_disposition();
    disposition
        .params
        .get("filename")
        .or_else(|| mail.ctype.params.get("name"))
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}
