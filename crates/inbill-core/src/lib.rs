//! Core library for rule-driven invoice inbox processing.
//!
//! This crate provides:
//! - Partner and exclusion rules loaded from a JSON rule file
//! - Message classification with confidence scoring
//! - Regex field extraction (amounts, due dates, invoice numbers/dates)
//!   with Hungarian, ISO, and US normalization
//! - Destination naming, ledger row building, and the processing pipeline
//!
//! The outside world (inbox, file storage, ledger) sits behind the traits in
//! [`clients`]; concrete implementations live in the CLI crate.

pub mod classify;
pub mod clients;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod models;
pub mod naming;
pub mod pdf;
pub mod pipeline;

pub use classify::{classify, ClassificationResult, MatchField};
pub use clients::{InboxClient, LedgerClient, RetryPolicy, StorageSyncClient};
pub use error::{InbillError, Result};
pub use extract::{extract, ExtractedAmount};
pub use ledger::build_row;
pub use models::config::InbillConfig;
pub use models::invoice::{
    propose_fields, Amount, ExtractedInvoice, FieldOverrides, FieldProposal, LedgerRow,
    LEDGER_HEADERS,
};
pub use models::message::{AttachmentMeta, CandidateMessage};
pub use models::rules::{Currency, DateFormatTag, ExclusionRule, PartnerRule, RuleSet};
pub use naming::compute_destination;
pub use pipeline::{
    Booking, MessageOutcome, Pipeline, PipelineOptions, ProcessedSet, RunSummary,
};
