//! In-memory ledger store.
//!
//! Intended for tests and development. The commit path performs the
//! version check, the append and the balance update under one write
//! guard, which gives the same atomicity the Postgres backend gets from
//! a database transaction.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{
    generate_account_number, Account, MinorUnits, NewAccount, NewTransaction, PageParams,
    Transaction,
};

use super::{LedgerStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<i64, Account>,
    transactions: Vec<Transaction>,
    next_account_id: i64,
    next_transaction_id: i64,
}

#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Inner>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut inner = self.write()?;

        let mut account_number = generate_account_number();
        while inner
            .accounts
            .values()
            .any(|a| a.account_number == account_number)
        {
            account_number = generate_account_number();
        }

        inner.next_account_id += 1;
        let account = Account {
            id: inner.next_account_id,
            owner_id: new.owner_id,
            account_number,
            account_type: new.account_type,
            balance_minor_units: 0,
            status: new.status,
            version: 0,
            created_at: Utc::now(),
        };
        inner.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    async fn accounts_by_owner(&self, owner_id: i64) -> Result<Vec<Account>, StoreError> {
        let inner = self.read()?;
        let mut accounts: Vec<Account> = inner
            .accounts
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn account_ids(&self) -> Result<Vec<i64>, StoreError> {
        let inner = self.read()?;
        let mut ids: Vec<i64> = inner.accounts.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn commit_transaction(
        &self,
        account_id: i64,
        expected_version: i64,
        tx: NewTransaction,
    ) -> Result<(Transaction, MinorUnits), StoreError> {
        let mut inner = self.write()?;

        inner.next_transaction_id += 1;
        let id = inner.next_transaction_id;

        let account = inner
            .accounts
            .get_mut(&account_id)
            .ok_or(StoreError::AccountMissing(account_id))?;
        if account.version != expected_version {
            return Err(StoreError::VersionConflict {
                account_id,
                expected: expected_version,
                actual: account.version,
            });
        }

        let record = Transaction {
            id,
            account_id,
            kind: tx.kind,
            amount_minor_units: tx.amount_minor_units,
            description: tx.description,
            status: tx.status,
            created_at: tx.created_at,
            processed_at: tx.processed_at,
        };

        account.balance_minor_units += record.signed_amount();
        account.version += 1;
        let balance = account.balance_minor_units;

        inner.transactions.push(record.clone());
        Ok((record, balance))
    }

    async fn transactions_page(
        &self,
        account_id: i64,
        page: PageParams,
    ) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.read()?;
        let mut rows: Vec<Transaction> = inner
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect();
        rows.sort_by(Transaction::display_order);

        let offset = page.offset() as usize;
        let limit = page.limit() as usize;
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn transaction_count(&self, account_id: i64) -> Result<u64, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .count() as u64)
    }

    async fn completed_sum(&self, account_id: i64) -> Result<MinorUnits, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .map(Transaction::signed_amount)
            .sum())
    }

    async fn overwrite_balance(
        &self,
        account_id: i64,
        balance: MinorUnits,
    ) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let account = inner
            .accounts
            .get_mut(&account_id)
            .ok_or(StoreError::AccountMissing(account_id))?;
        account.balance_minor_units = balance;
        account.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountType, TransactionKind, TransactionStatus};
    use chrono::TimeZone;

    fn deposit(cents: MinorUnits) -> NewTransaction {
        NewTransaction::completed_deposit(cents, "test".to_string(), Utc::now())
    }

    async fn seeded_store() -> (InMemoryLedgerStore, Account) {
        let store = InMemoryLedgerStore::new();
        let account = store
            .create_account(NewAccount::active(1, AccountType::Checking))
            .await
            .unwrap();
        (store, account)
    }

    #[tokio::test]
    async fn test_commit_appends_and_updates_balance_together() {
        let (store, account) = seeded_store().await;

        let (tx, balance) = store
            .commit_transaction(account.id, 0, deposit(123))
            .await
            .unwrap();
        assert_eq!(tx.id, 1);
        assert_eq!(balance, 123);

        let reloaded = store.account_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.balance_minor_units, 123);
        assert_eq!(reloaded.version, 1);
        assert_eq!(store.transaction_count(account.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stale_version_rejected_without_side_effects() {
        let (store, account) = seeded_store().await;
        store
            .commit_transaction(account.id, 0, deposit(100))
            .await
            .unwrap();

        let err = store
            .commit_transaction(account.id, 0, deposit(100))
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let reloaded = store.account_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.balance_minor_units, 100);
        assert_eq!(store.transaction_count(account.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_account() {
        let store = InMemoryLedgerStore::new();
        let err = store
            .commit_transaction(99, 0, deposit(100))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AccountMissing(99)));
    }

    #[tokio::test]
    async fn test_ordering_and_pagination() {
        let (store, account) = seeded_store().await;
        let at = |secs| Utc.timestamp_opt(secs, 0).unwrap();

        // Three rows sharing one processed_at, one older, one null-processed.
        for (created, processed) in [
            (100, Some(500)),
            (200, Some(500)),
            (300, Some(500)),
            (50, Some(60)),
            (400, None),
        ] {
            let tx = NewTransaction {
                kind: TransactionKind::Deposit,
                amount_minor_units: 100,
                description: String::new(),
                status: TransactionStatus::Completed,
                created_at: at(created),
                processed_at: processed.map(at),
            };
            let reloaded = store.account_by_id(account.id).await.unwrap().unwrap();
            store
                .commit_transaction(account.id, reloaded.version, tx)
                .await
                .unwrap();
        }

        let rows = store
            .transactions_page(account.id, PageParams::new(0, 50))
            .await
            .unwrap();
        let order: Vec<i64> = rows.iter().map(|t| t.id).collect();
        // processed=500 rows first (created desc), then null-processed
        // (effective 400), then the old one.
        assert_eq!(order, vec![3, 2, 1, 5, 4]);

        let page2 = store
            .transactions_page(account.id, PageParams::new(1, 2))
            .await
            .unwrap();
        let order: Vec<i64> = page2.iter().map(|t| t.id).collect();
        assert_eq!(order, vec![1, 5]);
    }

    #[tokio::test]
    async fn test_completed_sum_ignores_pending_and_signs_withdrawals() {
        let (store, account) = seeded_store().await;
        let now = Utc::now();

        let entries = [
            (TransactionKind::Deposit, 500, TransactionStatus::Completed),
            (TransactionKind::Withdrawal, 200, TransactionStatus::Completed),
            (TransactionKind::Deposit, 999, TransactionStatus::Pending),
            (TransactionKind::Deposit, 999, TransactionStatus::Failed),
        ];
        for (kind, cents, status) in entries {
            let reloaded = store.account_by_id(account.id).await.unwrap().unwrap();
            store
                .commit_transaction(
                    account.id,
                    reloaded.version,
                    NewTransaction {
                        kind,
                        amount_minor_units: cents,
                        description: String::new(),
                        status,
                        created_at: now,
                        processed_at: Some(now),
                    },
                )
                .await
                .unwrap();
        }

        assert_eq!(store.completed_sum(account.id).await.unwrap(), 300);
        let reloaded = store.account_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.balance_minor_units, 300);
    }

    #[tokio::test]
    async fn test_unique_account_numbers() {
        let store = InMemoryLedgerStore::new();
        let a = store
            .create_account(NewAccount::active(1, AccountType::Checking))
            .await
            .unwrap();
        let b = store
            .create_account(NewAccount::active(1, AccountType::Savings))
            .await
            .unwrap();
        assert_ne!(a.account_number, b.account_number);
        assert_eq!(a.balance_minor_units, 0);
    }
}
