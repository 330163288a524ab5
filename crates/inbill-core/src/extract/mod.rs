//! Field extraction: ordered regex patterns per rule pull amount, due date,
//! invoice number, and invoice date out of PDF text.
//!
//! Extraction never fails on an uncooperative document. Missing fields fall
//! back (amount stays `None`, dates fall back to the processing date, the
//! invoice number to a sanitized filename stem) and the fallback is recorded
//! in the `low_confidence` list. The only hard error is a malformed rule.

pub mod amounts;
pub mod dates;
pub mod patterns;

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

pub use amounts::ExtractedAmount;

use crate::error::ExtractionError;
use crate::models::invoice::{Amount, ExtractedInvoice};
use crate::models::rules::{Currency, DateFormatTag, PartnerRule};

/// Run the rule's extraction patterns over extracted document text.
///
/// `fallback_date` is the processing date; `source_file` is the original
/// attachment filename, mined for date and invoice-number tokens. Errors only
/// when the rule itself carries malformed patterns, and that is fatal to this
/// rule alone.
pub fn extract(
    rule: &PartnerRule,
    document_text: &str,
    source_file: &str,
    fallback_date: NaiveDate,
) -> Result<ExtractedInvoice, ExtractionError> {
    rule.validate_patterns()?;

    let mut low_confidence = Vec::new();

    let amount = find_primary_amount(rule, document_text);
    if amount.is_none() {
        if !rule.amount_patterns.is_empty() {
            warn!("No amount pattern matched for rule '{}'", rule.name);
        }
        low_confidence.push("amount".to_string());
    }

    let amount_eur = find_eur_amount(rule, document_text);
    if amount_eur.is_none() && !rule.eur_amount_patterns.is_empty() {
        low_confidence.push("amount_eur".to_string());
    }

    let due_date = match find_due_date(rule, document_text) {
        Some(date) => date,
        None => {
            if !rule.due_date_patterns.is_empty() {
                warn!("No due-date pattern matched for rule '{}'", rule.name);
            }
            low_confidence.push("due_date".to_string());
            fallback_date
        }
    };

    let invoice_date = match find_invoice_date(source_file, document_text) {
        Some(date) => date,
        None => {
            low_confidence.push("invoice_date".to_string());
            fallback_date
        }
    };

    let invoice_number = match find_invoice_number(source_file, document_text) {
        Some(number) => number,
        None => {
            low_confidence.push("invoice_number".to_string());
            sanitized_stem(source_file)
        }
    };

    debug!(
        "Extracted invoice for '{}': amount={:?} due={} number={}",
        rule.name, amount, due_date, invoice_number
    );

    Ok(ExtractedInvoice {
        partner: rule.name.clone(),
        amount,
        amount_eur,
        due_date,
        invoice_date,
        invoice_number,
        source_file: source_file.to_string(),
        low_confidence,
    })
}

/// Compile a configured pattern with the flags extraction runs under.
///
/// Patterns were compile-checked during rule validation, so a failure here is
/// unreachable and treated as a non-match.
fn build(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .ok()
}

fn find_primary_amount(rule: &PartnerRule, text: &str) -> Option<Amount> {
    for spec in &rule.amount_patterns {
        let currency = Currency::parse(&spec.currency)?;
        let Some(re) = build(&spec.pattern) else {
            continue;
        };
        let Some(caps) = re.captures(text) else {
            continue;
        };
        match ExtractedAmount::from_captures(&caps).to_decimal() {
            Some(value) => {
                debug!("Amount {} {} via pattern '{}'", value, currency.as_str(), spec.pattern);
                return Some(Amount::new(value, currency));
            }
            None => {
                warn!(
                    "Pattern '{}' matched but captures did not parse as a number",
                    spec.pattern
                );
            }
        }
    }
    None
}

fn find_eur_amount(rule: &PartnerRule, text: &str) -> Option<rust_decimal::Decimal> {
    for pattern in &rule.eur_amount_patterns {
        let Some(re) = build(pattern) else {
            continue;
        };
        let Some(caps) = re.captures(text) else {
            continue;
        };
        if let Some(value) = ExtractedAmount::from_captures(&caps).to_decimal() {
            debug!("EUR amount {} via pattern '{}'", value, pattern);
            return Some(value);
        }
    }
    None
}

fn find_due_date(rule: &PartnerRule, text: &str) -> Option<NaiveDate> {
    for spec in &rule.due_date_patterns {
        let tag = DateFormatTag::parse(&spec.format)?;
        let Some(re) = build(&spec.pattern) else {
            continue;
        };
        let Some(caps) = re.captures(text) else {
            continue;
        };
        match dates::date_from_captures(tag, &caps) {
            Some(date) => {
                debug!("Due date {} via pattern '{}'", date, spec.pattern);
                return Some(date);
            }
            None => {
                warn!(
                    "Pattern '{}' matched but captures are not a valid {} date",
                    spec.pattern,
                    tag.as_str()
                );
            }
        }
    }
    None
}

/// Filename `YYYYMMDD` token first, then labeled dates in the text.
fn find_invoice_date(source_file: &str, text: &str) -> Option<NaiveDate> {
    dates::date_from_filename(source_file).or_else(|| dates::issue_date_from_text(text))
}

/// Filename tokens first (case-sensitive, most specific shape first), then
/// labeled numbers in the text.
fn find_invoice_number(source_file: &str, text: &str) -> Option<String> {
    for pattern in patterns::FILENAME_INVOICE_NUMBERS.iter() {
        if let Some(caps) = pattern.captures(source_file) {
            return Some(caps[1].to_string());
        }
    }
    for pattern in patterns::TEXT_INVOICE_NUMBERS.iter() {
        if let Some(caps) = pattern.captures(text) {
            return Some(caps[1].trim().to_string());
        }
    }
    None
}

/// Filename without extension, spaces replaced so the token is path-safe.
fn sanitized_stem(source_file: &str) -> String {
    let stem = std::path::Path::new(source_file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_file.to_string());
    stem.replace(' ', "_")
}
