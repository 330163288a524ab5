//! Local client implementations behind the core collaborator traits.
//!
//! The inbox is a directory of `.eml` files, storage is a synced folder on
//! the local filesystem, and the ledger is a CSV file. Each client maps its
//! failures onto `CollaboratorError` so the pipeline's retry policy applies
//! uniformly.

pub mod csv_ledger;
pub mod eml_inbox;
pub mod local_storage;

pub use csv_ledger::CsvLedger;
pub use eml_inbox::EmlInbox;
pub use local_storage::LocalStorage;
