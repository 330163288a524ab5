//! Fixed regex patterns for best-effort invoice number and date extraction.
//!
//! These cover conventions that show up across partners regardless of the
//! per-rule configured patterns: invoice-number tokens embedded in filenames
//! and labeled fields in the document text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Invoice-number shapes found in filenames, most specific first:
    /// `SCHNH-2025-3839`, `KI2501065`, `SZLA-01730`, then bare 7+ digit runs.
    pub static ref FILENAME_INVOICE_NUMBERS: Vec<Regex> = vec![
        Regex::new(r"([A-Z]+-\d+-\d+)").unwrap(),
        Regex::new(r"([A-Z]+\d+)").unwrap(),
        Regex::new(r"([A-Z]+-\d+)").unwrap(),
        Regex::new(r"(\d{7,})").unwrap(),
    ];

    /// Labeled invoice numbers in document text, Hungarian label first.
    pub static ref TEXT_INVOICE_NUMBERS: Vec<Regex> = vec![
        Regex::new(r"(?i)Számlaszám[:\s]+([A-Z0-9-]+)").unwrap(),
        Regex::new(r"(?i)Invoice\s+number[:\s]+([A-Z0-9-]+)").unwrap(),
        Regex::new(r"(?i)Invoice\s+#[:\s]*([A-Z0-9-]+)").unwrap(),
    ];

    /// An 8-digit date token inside a filename; validated as a real
    /// calendar date before use.
    pub static ref FILENAME_DATE: Regex = Regex::new(r"(\d{8})").unwrap();

    /// Labeled issue dates in document text, tried in this order.
    pub static ref TEXT_ISSUE_DATES: Vec<Regex> = vec![
        Regex::new(r"(?i)Kiállítás.*?(\d{4})[.\-](\d{1,2})[.\-](\d{1,2})").unwrap(),
        Regex::new(r"(?i)Kelt.*?(\d{4})[.\-](\d{1,2})[.\-](\d{1,2})").unwrap(),
        Regex::new(r"(?i)Invoice\s+date.*?(\d{4})[.\-](\d{1,2})[.\-](\d{1,2})").unwrap(),
        Regex::new(r"(?i)Date.*?(\d{4})[.\-](\d{1,2})[.\-](\d{1,2})").unwrap(),
    ];
}
