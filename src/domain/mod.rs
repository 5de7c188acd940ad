//! Domain types
//!
//! Core types of the ledger: monetary amounts, funding sources, accounts
//! and transactions. Business rules are validated at construction time so
//! invalid values cannot exist in the system.

mod account;
mod amount;
mod context;
mod funding;
mod page;
mod transaction;

pub use account::{generate_account_number, Account, AccountStatus, AccountType, NewAccount};
pub use amount::{format_minor_units, AmountError, AmountInput, MinorUnits};
pub use context::OperationContext;
pub use funding::{card_network, CardNetwork, FundingError, FundingKind, FundingSource};
pub use page::PageParams;
pub use transaction::{
    NewTransaction, Transaction, TransactionKind, TransactionStatus, TransactionView,
};
