//! Builds the fixed 9-column ledger row from an extracted invoice.
//!
//! Every invoice in this flow is an expense, so the income cells stay empty
//! and the HUF and EUR columns are physically disjoint. HUF amounts are
//! written as whole forints with the fraction truncated; EUR amounts keep
//! their decimals. USD invoices land in the primary (HUF-axis) column with
//! two decimals since the sheet has no third currency pair.

use crate::models::invoice::{ExtractedInvoice, LedgerRow};
use crate::models::rules::{Currency, PartnerRule};

/// Render one ledger row.
///
/// `file_link` is the destination path the stored copy ended up at.
/// `verified` marks rows confirmed by an operator in the manual flow.
pub fn build_row(
    rule: &PartnerRule,
    invoice: &ExtractedInvoice,
    file_link: &str,
    verified: bool,
) -> LedgerRow {
    let mut expense_huf = String::new();
    let mut expense_eur = String::new();

    if let Some(amount) = &invoice.amount {
        match amount.currency {
            Currency::Huf => expense_huf = amount.value.trunc().to_string(),
            Currency::Eur => expense_eur = amount.value.to_string(),
            Currency::Usd => expense_huf = format!("{:.2}", amount.value),
        }
    }
    if expense_eur.is_empty() {
        if let Some(eur) = &invoice.amount_eur {
            expense_eur = eur.to_string();
        }
    }

    LedgerRow {
        due_date: invoice.due_date.format("%Y-%m-%d").to_string(),
        payment_type: rule.payment_type.clone(),
        income_huf: String::new(),
        expense_huf,
        income_eur: String::new(),
        expense_eur,
        description: rule.ledger_description.clone(),
        file_link: file_link.to_string(),
        note: if verified {
            "Verified (Manual)".to_string()
        } else {
            String::new()
        },
    }
}
