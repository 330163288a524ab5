//! Error types for the inbill-core library.

use thiserror::Error;

/// Main error type for the inbill library.
#[derive(Error, Debug)]
pub enum InbillError {
    /// Rule or application configuration error. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Field extraction failed because the rule itself is malformed.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// A collaborator call (inbox, storage, ledger) failed.
    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading rule or application configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration resource could not be read.
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    /// The configuration resource is not valid JSON.
    #[error("malformed JSON in {path}: {reason}")]
    Json { path: String, reason: String },

    /// A rule is missing a required field.
    #[error("rule '{rule}' is missing {field}")]
    MissingField { rule: String, field: String },

    /// Two rules share the same name.
    #[error("duplicate rule name '{0}'")]
    DuplicateRule(String),

    /// An application setting is empty or outside its working range.
    #[error("invalid setting {setting}: {reason}")]
    InvalidSetting { setting: String, reason: String },
}

/// Errors related to PDF text extraction.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF data.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from the PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF exceeds the configured size limit.
    #[error("PDF exceeds size limit: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
}

/// Errors raised when a rule's extraction patterns are malformed.
///
/// These are fatal to the rule that carries them, never to the message: other
/// rules continue to be evaluated.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A pattern references a currency outside the supported set.
    #[error("rule '{rule}' references unsupported currency '{currency}'")]
    UnsupportedCurrency { rule: String, currency: String },

    /// A due-date pattern carries an unknown format tag.
    #[error("rule '{rule}' references unknown date format tag '{tag}'")]
    UnknownDateFormat { rule: String, tag: String },

    /// A rule configures a regex that does not compile.
    #[error("rule '{rule}' has an invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        rule: String,
        pattern: String,
        reason: String,
    },
}

/// Errors from inbox, storage, or ledger collaborators.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    /// Inbox client failure.
    #[error("inbox: {0}")]
    Inbox(String),

    /// Storage sync client failure.
    #[error("storage: {0}")]
    Storage(String),

    /// Ledger client failure.
    #[error("ledger: {0}")]
    Ledger(String),

    /// All retry attempts were exhausted.
    #[error("{operation} failed after {attempts} attempts: {reason}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        reason: String,
    },
}

/// Result type for the inbill library.
pub type Result<T> = std::result::Result<T, InbillError>;
