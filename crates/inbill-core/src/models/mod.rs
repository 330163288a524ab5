//! Data models: rules, messages, extracted invoices, configuration.

pub mod config;
pub mod invoice;
pub mod message;
pub mod rules;

pub use config::InbillConfig;
pub use invoice::{
    propose_fields, Amount, ExtractedInvoice, FieldOverrides, FieldProposal, LedgerRow,
    LEDGER_HEADERS,
};
pub use message::{AttachmentMeta, CandidateMessage};
pub use rules::{
    AmountPattern, Currency, DateFormatTag, DueDatePattern, ExclusionRule, PartnerRule, RuleSet,
};
