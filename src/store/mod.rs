//! Ledger storage
//!
//! `LedgerStore` is the persistence seam: an append-only transaction log
//! plus the cached per-account balance projection. Implementations must
//! make `commit_transaction` atomic (the appended row and the balance
//! update become visible together or not at all) and must reject commits
//! carrying a stale account version so concurrent writers cannot lose
//! updates.
//!
//! Two backends: `PostgresLedgerStore` for production and
//! `InMemoryLedgerStore` for tests and development.

mod memory;
mod postgres;

pub use memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;

use async_trait::async_trait;

use crate::domain::{Account, MinorUnits, NewAccount, NewTransaction, PageParams, Transaction};

/// Storage operation error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The account's version moved between load and commit; the caller's
    /// read-modify-write unit must be retried from the load.
    #[error("version conflict on account {account_id}: expected {expected}, found {actual}")]
    VersionConflict {
        account_id: i64,
        expected: i64,
        actual: i64,
    },

    #[error("account {0} not found")]
    AccountMissing(i64),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create an account with a fresh unique account number and zero
    /// balance. Entry point for the external registration flow.
    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError>;

    async fn account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError>;

    async fn accounts_by_owner(&self, owner_id: i64) -> Result<Vec<Account>, StoreError>;

    async fn account_ids(&self) -> Result<Vec<i64>, StoreError>;

    /// Atomically append `tx` and apply its signed amount to the account
    /// balance, bumping the version. Returns the committed record (with
    /// its store-assigned id) and the new balance. Fails with
    /// `VersionConflict` when `expected_version` is stale; in that case
    /// nothing is written.
    async fn commit_transaction(
        &self,
        account_id: i64,
        expected_version: i64,
        tx: NewTransaction,
    ) -> Result<(Transaction, MinorUnits), StoreError>;

    /// One page of the account's transactions, ordered by
    /// `(coalesce(processed_at, created_at) desc, created_at desc, id desc)`.
    async fn transactions_page(
        &self,
        account_id: i64,
        page: PageParams,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn transaction_count(&self, account_id: i64) -> Result<u64, StoreError>;

    /// Signed integer-cent sum over the account's completed transactions.
    /// This is the reconciliation ground truth for the balance.
    async fn completed_sum(&self, account_id: i64) -> Result<MinorUnits, StoreError>;

    /// Overwrite the cached balance with a recomputed value (reconciliation
    /// correction mode only; the request path never calls this).
    async fn overwrite_balance(
        &self,
        account_id: i64,
        balance: MinorUnits,
    ) -> Result<(), StoreError>;
}
