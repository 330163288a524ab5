//! Ledger client appending to a CSV file.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::debug;

use inbill_core::clients::LedgerClient;
use inbill_core::error::CollaboratorError;
use inbill_core::models::invoice::{LEDGER_HEADERS, LedgerRow};

/// Appends booking rows to a CSV ledger file.
///
/// The header row is written once, when the file is created or still empty.
/// The duplicate check scans the file-link column for the invoice number or
/// the exact destination filename.
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn is_new_or_empty(&self) -> Result<bool, CollaboratorError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(self.error("stat", e)),
        }
    }

    fn error(&self, action: &str, e: impl std::fmt::Display) -> CollaboratorError {
        CollaboratorError::Ledger(format!("{} {}: {}", action, self.path.display(), e))
    }
}

impl LedgerClient for CsvLedger {
    fn append_row(&mut self, row: &LedgerRow) -> Result<(), CollaboratorError> {
        let write_headers = self.is_new_or_empty()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.error("create parent of", e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.error("open", e))?;
        let mut writer = csv::Writer::from_writer(file);

        if write_headers {
            writer
                .write_record(LEDGER_HEADERS)
                .map_err(|e| self.error("write headers to", e))?;
        }
        writer
            .write_record(row.cells())
            .map_err(|e| self.error("append to", e))?;
        writer.flush().map_err(|e| self.error("flush", e))?;

        debug!("Appended ledger row for {}", row.file_link);
        Ok(())
    }

    fn find_existing(
        &mut self,
        invoice_number: &str,
        file_name: &str,
    ) -> Result<Option<String>, CollaboratorError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.error("open", e))?;

        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| self.error("read", e))?;
            let link = record.get(7).unwrap_or("");
            let number_hit = !invoice_number.is_empty() && link.contains(invoice_number);
            let name_hit = Path::new(link)
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n == file_name);
            if number_hit || name_hit {
                // header occupies line 1
                return Ok(Some(format!("row {}: {}", index + 2, link)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_row(link: &str) -> LedgerRow {
        LedgerRow {
            due_date: "2025-09-15".to_string(),
            payment_type: "Vállalati számla".to_string(),
            income_huf: String::new(),
            expense_huf: "21489".to_string(),
            income_eur: String::new(),
            expense_eur: String::new(),
            description: "Vodafone mobil".to_string(),
            file_link: link.to_string(),
            note: String::new(),
        }
    }

    #[test]
    fn test_headers_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        let mut ledger = CsvLedger::new(path.clone());

        ledger.append_row(&sample_row("/sync/a.pdf")).unwrap();
        ledger.append_row(&sample_row("/sync/b.pdf")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Dátum,"));
        assert!(lines[1].contains("/sync/a.pdf"));
        assert!(lines[2].contains("/sync/b.pdf"));
    }

    #[test]
    fn test_find_existing_by_invoice_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        let mut ledger = CsvLedger::new(path);

        ledger
            .append_row(&sample_row("/sync/2025/Vodafone/20250901_vodafone_KI2501065.pdf"))
            .unwrap();

        let hit = ledger.find_existing("KI2501065", "other.pdf").unwrap();
        assert!(hit.is_some());
        assert!(hit.unwrap().contains("row 2"));

        let miss = ledger.find_existing("KI9999999", "other.pdf").unwrap();
        assert_eq!(miss, None);
    }

    #[test]
    fn test_find_existing_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        let mut ledger = CsvLedger::new(path);

        ledger
            .append_row(&sample_row("/sync/2025/Vodafone/20250901_vodafone_szamla.pdf"))
            .unwrap();

        let hit = ledger
            .find_existing("", "20250901_vodafone_szamla.pdf")
            .unwrap();
        assert!(hit.is_some());
    }

    #[test]
    fn test_missing_file_has_no_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = CsvLedger::new(dir.path().join("ledger.csv"));
        assert_eq!(ledger.find_existing("KI2501065", "a.pdf").unwrap(), None);
    }

    #[test]
    fn test_appends_into_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books").join("ledger.csv");
        let mut ledger = CsvLedger::new(path.clone());

        ledger.append_row(&sample_row("/sync/a.pdf")).unwrap();
        assert!(path.exists());
    }
}
