pub mod migrate;
pub mod record;
pub mod store;

pub use migrate::migrate_if_needed;
pub use record::{MutableField, Status, SubmissionRecord};
pub use store::{LedgerError, LedgerStore, LEDGER_COLUMNS};
