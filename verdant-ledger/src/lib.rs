pub mod entry;
pub mod ledger;

pub use entry::{EntryKind, LedgerEntry};
pub use ledger::{LedgerError, LedgerStore, MoneyLedger};
