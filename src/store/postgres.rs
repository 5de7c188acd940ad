//! Postgres ledger store.
//!
//! Runtime sqlx queries, no compile-time database. The commit path runs
//! the balance update and the transaction insert inside one database
//! transaction; the optimistic guard is `WHERE id = $.. AND version = $..`
//! on the balance update, so a stale commit rolls back with no row
//! written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{
    generate_account_number, Account, AccountStatus, AccountType, MinorUnits, NewAccount,
    NewTransaction, PageParams, Transaction, TransactionKind, TransactionStatus,
};

use super::{LedgerStore, StoreError};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id BIGSERIAL PRIMARY KEY,
        owner_id BIGINT NOT NULL,
        account_number TEXT NOT NULL UNIQUE,
        account_type TEXT NOT NULL,
        balance_minor_units BIGINT NOT NULL DEFAULT 0,
        status TEXT NOT NULL,
        version BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id BIGSERIAL PRIMARY KEY,
        account_id BIGINT NOT NULL REFERENCES accounts(id),
        kind TEXT NOT NULL,
        amount_minor_units BIGINT NOT NULL CHECK (amount_minor_units > 0),
        description TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        processed_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_transactions_account_order
    ON transactions (account_id, (COALESCE(processed_at, created_at)) DESC, created_at DESC, id DESC)
    "#,
];

type AccountRow = (
    i64,
    i64,
    String,
    String,
    i64,
    String,
    i64,
    DateTime<Utc>,
);

type TransactionRow = (
    i64,
    i64,
    String,
    i64,
    String,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the ledger tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!("ledger schema verified");
        Ok(())
    }
}

fn account_type_str(t: AccountType) -> &'static str {
    match t {
        AccountType::Checking => "checking",
        AccountType::Savings => "savings",
    }
}

fn parse_account_type(s: &str) -> Result<AccountType, StoreError> {
    match s {
        "checking" => Ok(AccountType::Checking),
        "savings" => Ok(AccountType::Savings),
        other => Err(StoreError::Backend(format!("unknown account type {other:?}"))),
    }
}

fn account_status_str(s: AccountStatus) -> &'static str {
    match s {
        AccountStatus::Pending => "pending",
        AccountStatus::Active => "active",
        AccountStatus::Closed => "closed",
    }
}

fn parse_account_status(s: &str) -> Result<AccountStatus, StoreError> {
    match s {
        "pending" => Ok(AccountStatus::Pending),
        "active" => Ok(AccountStatus::Active),
        "closed" => Ok(AccountStatus::Closed),
        other => Err(StoreError::Backend(format!("unknown account status {other:?}"))),
    }
}

fn kind_str(k: TransactionKind) -> &'static str {
    match k {
        TransactionKind::Deposit => "deposit",
        TransactionKind::Withdrawal => "withdrawal",
    }
}

fn parse_kind(s: &str) -> Result<TransactionKind, StoreError> {
    match s {
        "deposit" => Ok(TransactionKind::Deposit),
        "withdrawal" => Ok(TransactionKind::Withdrawal),
        other => Err(StoreError::Backend(format!("unknown transaction kind {other:?}"))),
    }
}

fn status_str(s: TransactionStatus) -> &'static str {
    match s {
        TransactionStatus::Pending => "pending",
        TransactionStatus::Completed => "completed",
        TransactionStatus::Failed => "failed",
    }
}

fn parse_status(s: &str) -> Result<TransactionStatus, StoreError> {
    match s {
        "pending" => Ok(TransactionStatus::Pending),
        "completed" => Ok(TransactionStatus::Completed),
        "failed" => Ok(TransactionStatus::Failed),
        other => Err(StoreError::Backend(format!(
            "unknown transaction status {other:?}"
        ))),
    }
}

fn account_from_row(row: AccountRow) -> Result<Account, StoreError> {
    let (id, owner_id, account_number, account_type, balance, status, version, created_at) = row;
    Ok(Account {
        id,
        owner_id,
        account_number,
        account_type: parse_account_type(&account_type)?,
        balance_minor_units: balance,
        status: parse_account_status(&status)?,
        version,
        created_at,
    })
}

fn transaction_from_row(row: TransactionRow) -> Result<Transaction, StoreError> {
    let (id, account_id, kind, amount, description, status, created_at, processed_at) = row;
    Ok(Transaction {
        id,
        account_id,
        kind: parse_kind(&kind)?,
        amount_minor_units: amount,
        description,
        status: parse_status(&status)?,
        created_at,
        processed_at,
    })
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        // The unique index arbitrates account-number collisions.
        for _ in 0..5 {
            let account_number = generate_account_number();
            let inserted: Option<AccountRow> = sqlx::query_as(
                r#"
                INSERT INTO accounts (owner_id, account_number, account_type, status)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (account_number) DO NOTHING
                RETURNING id, owner_id, account_number, account_type,
                          balance_minor_units, status, version, created_at
                "#,
            )
            .bind(new.owner_id)
            .bind(&account_number)
            .bind(account_type_str(new.account_type))
            .bind(account_status_str(new.status))
            .fetch_optional(&self.pool)
            .await?;

            if let Some(row) = inserted {
                return account_from_row(row);
            }
        }
        Err(StoreError::Backend(
            "could not allocate a unique account number".to_string(),
        ))
    }

    async fn account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, account_number, account_type,
                   balance_minor_units, status, version, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn accounts_by_owner(&self, owner_id: i64) -> Result<Vec<Account>, StoreError> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, account_number, account_type,
                   balance_minor_units, status, version, created_at
            FROM accounts
            WHERE owner_id = $1
            ORDER BY id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(account_from_row).collect()
    }

    async fn account_ids(&self) -> Result<Vec<i64>, StoreError> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM accounts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn commit_transaction(
        &self,
        account_id: i64,
        expected_version: i64,
        tx: NewTransaction,
    ) -> Result<(Transaction, MinorUnits), StoreError> {
        let delta = match tx.status {
            TransactionStatus::Completed => tx.kind.sign() * tx.amount_minor_units,
            _ => 0,
        };

        let mut db_tx = self.pool.begin().await?;

        let updated: Option<(MinorUnits,)> = sqlx::query_as(
            r#"
            UPDATE accounts
            SET balance_minor_units = balance_minor_units + $1,
                version = version + 1
            WHERE id = $2 AND version = $3
            RETURNING balance_minor_units
            "#,
        )
        .bind(delta)
        .bind(account_id)
        .bind(expected_version)
        .fetch_optional(&mut *db_tx)
        .await?;

        let balance = match updated {
            Some((balance,)) => balance,
            None => {
                // Stale version or no such account; nothing was written.
                let actual: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM accounts WHERE id = $1")
                        .bind(account_id)
                        .fetch_optional(&mut *db_tx)
                        .await?;
                return Err(match actual {
                    Some(actual) => StoreError::VersionConflict {
                        account_id,
                        expected: expected_version,
                        actual,
                    },
                    None => StoreError::AccountMissing(account_id),
                });
            }
        };

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO transactions
                (account_id, kind, amount_minor_units, description, status, created_at, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(account_id)
        .bind(kind_str(tx.kind))
        .bind(tx.amount_minor_units)
        .bind(&tx.description)
        .bind(status_str(tx.status))
        .bind(tx.created_at)
        .bind(tx.processed_at)
        .fetch_one(&mut *db_tx)
        .await?;

        db_tx.commit().await?;

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
        Ok((record, balance))
    }

    async fn transactions_page(
        &self,
        account_id: i64,
        page: PageParams,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, account_id, kind, amount_minor_units,
                   description, status, created_at, processed_at
            FROM transactions
            WHERE account_id = $1
            ORDER BY COALESCE(processed_at, created_at) DESC, created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(account_id)
        .bind(i64::from(page.limit()))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(transaction_from_row).collect()
    }

    async fn transaction_count(&self, account_id: i64) -> Result<u64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE account_id = $1")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn completed_sum(&self, account_id: i64) -> Result<MinorUnits, StoreError> {
        let sum: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(
                CASE WHEN kind = 'deposit' THEN amount_minor_units
                     ELSE -amount_minor_units END
            ), 0)::BIGINT
            FROM transactions
            WHERE account_id = $1 AND status = 'completed'
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }

    async fn overwrite_balance(
        &self,
        account_id: i64,
        balance: MinorUnits,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_minor_units = $1, version = version + 1
            WHERE id = $2
            "#,
        )
        .bind(balance)
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AccountMissing(account_id));
        }
        Ok(())
    }
}
