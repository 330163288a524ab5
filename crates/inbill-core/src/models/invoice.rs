//! Extracted invoice record and the fixed ledger row schema.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::rules::Currency;

/// A currency-tagged amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: Decimal,
    pub currency: Currency,
}

impl Amount {
    pub fn new(value: Decimal, currency: Currency) -> Self {
        Self { value, currency }
    }
}

/// The normalized record built once per matched message.
///
/// Fields that fell back to defaults are listed in `low_confidence` so the
/// pipeline can report the message as degraded instead of silently clean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedInvoice {
    /// Name of the matched partner rule.
    pub partner: String,

    /// Primary extracted amount, if any pattern matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,

    /// Secondary EUR amount for dual-currency invoices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_eur: Option<Decimal>,

    /// Payment due date; the fallback date when no pattern matched.
    pub due_date: NaiveDate,

    /// Invoice issue date; the fallback date when unextractable.
    pub invoice_date: NaiveDate,

    /// Invoice number; a sanitized filename token when unextractable.
    pub invoice_number: String,

    /// Original attachment filename.
    pub source_file: String,

    /// Fields that carry fallback values instead of extracted ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub low_confidence: Vec<String>,
}

impl ExtractedInvoice {
    /// Whether a required field (amount or due date) fell back.
    pub fn is_degraded(&self) -> bool {
        self.low_confidence
            .iter()
            .any(|f| f == "amount" || f == "due_date")
    }
}

/// Column headers of the ledger, matching the bookkeeping sheet layout.
pub const LEDGER_HEADERS: [&str; 9] = [
    "Dátum",
    "Fizetve",
    "Bevétel HUF",
    "Kiadás HUF",
    "Bevétel EUR",
    "Kiadás EUR",
    "Megjegyzés",
    "Link a számlára",
    "Column2",
];

/// One appended ledger row. Cells are pre-rendered strings; income cells
/// stay empty because every invoice in this flow is an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    /// Due date in ISO `YYYY-MM-DD` form.
    pub due_date: String,

    /// Payment-type label from the rule.
    pub payment_type: String,

    /// Income HUF, always empty.
    pub income_huf: String,

    /// Expense HUF as a plain integer, no thousands separators.
    pub expense_huf: String,

    /// Income EUR, always empty.
    pub income_eur: String,

    /// Expense EUR with decimals preserved, or empty.
    pub expense_eur: String,

    /// Description from the rule, never derived from the document.
    pub description: String,

    /// Link or path to the stored file.
    pub file_link: String,

    /// Reserved column; carries the manual-verification marker when set.
    pub note: String,
}

impl LedgerRow {
    /// The row as ordered cells for appending.
    pub fn cells(&self) -> [&str; 9] {
        [
            &self.due_date,
            &self.payment_type,
            &self.income_huf,
            &self.expense_huf,
            &self.income_eur,
            &self.expense_eur,
            &self.description,
            &self.file_link,
            &self.note,
        ]
    }
}

/// Editable field set proposed to the operator during manual processing.
///
/// Pure data: building it has no side effects, so the confirm/override flow
/// can be tested without a terminal.
#[derive(Debug, Clone)]
pub struct FieldProposal {
    pub partner: String,
    pub amount: Option<Amount>,
    pub amount_eur: Option<Decimal>,
    pub due_date: NaiveDate,
    pub invoice_date: NaiveDate,
    pub invoice_number: String,
    /// Fields the operator should double-check.
    pub low_confidence: Vec<String>,
}

/// Operator overrides collected at the I/O boundary. `None` accepts the
/// proposed value.
#[derive(Debug, Clone, Default)]
pub struct FieldOverrides {
    pub amount: Option<Decimal>,
    pub amount_eur: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub invoice_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
}

/// Build the editable field set from an extracted record.
pub fn propose_fields(invoice: &ExtractedInvoice) -> FieldProposal {
    FieldProposal {
        partner: invoice.partner.clone(),
        amount: invoice.amount,
        amount_eur: invoice.amount_eur,
        due_date: invoice.due_date,
        invoice_date: invoice.invoice_date,
        invoice_number: invoice.invoice_number.clone(),
        low_confidence: invoice.low_confidence.clone(),
    }
}

impl FieldProposal {
    /// Apply operator overrides, producing the final record.
    ///
    /// An overridden field counts as operator-verified and leaves the
    /// low-confidence list.
    pub fn apply(&self, overrides: &FieldOverrides, source_file: &str) -> ExtractedInvoice {
        let mut low_confidence = self.low_confidence.clone();
        let mut confirm = |field: &str| {
            low_confidence.retain(|f| f != field);
        };

        let amount = match overrides.amount {
            Some(value) => {
                confirm("amount");
                Some(Amount::new(value, Currency::Huf))
            }
            None => self.amount,
        };
        let amount_eur = match overrides.amount_eur {
            Some(value) => {
                confirm("amount_eur");
                Some(value)
            }
            None => self.amount_eur,
        };
        let due_date = match overrides.due_date {
            Some(date) => {
                confirm("due_date");
                date
            }
            None => self.due_date,
        };
        let invoice_date = match overrides.invoice_date {
            Some(date) => {
                confirm("invoice_date");
                date
            }
            None => self.invoice_date,
        };
        let invoice_number = match &overrides.invoice_number {
            Some(number) => {
                confirm("invoice_number");
                number.clone()
            }
            None => self.invoice_number.clone(),
        };

        ExtractedInvoice {
            partner: self.partner.clone(),
            amount,
            amount_eur,
            due_date,
            invoice_date,
            invoice_number,
            source_file: source_file.to_string(),
            low_confidence,
        }
    }
}
