//! Ledger operations
//!
//! `LedgerService` owns the funding pipeline and the read paths. Writes to
//! one account are serialized twice over: an in-process per-account lock
//! keeps local writers out of each other's way, and the store's version
//! check catches writers on other processes.

mod locks;
mod service;

pub use locks::AccountLocks;
pub use service::{FundOutcome, LedgerLimits, LedgerService, TransactionPage};
