//! Transaction record
//!
//! The transaction log is the source of truth: append-only, never edited
//! in place once completed, never deleted. Reads are ordered by the
//! deterministic key `(coalesce(processed_at, created_at), created_at, id)`
//! descending so pagination stays stable across equal timestamps.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::{format_minor_units, AccountType, MinorUnits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    /// Sign applied when the log is summed into a balance.
    pub fn sign(&self) -> i64 {
        match self {
            TransactionKind::Deposit => 1,
            TransactionKind::Withdrawal => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// A committed ledger entry. `id` is assigned by the store at append time.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub kind: TransactionKind,
    pub amount_minor_units: MinorUnits,
    pub description: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Signed contribution to the account balance; zero unless completed.
    pub fn signed_amount(&self) -> MinorUnits {
        match self.status {
            TransactionStatus::Completed => self.kind.sign() * self.amount_minor_units,
            _ => 0,
        }
    }

    /// Timestamp used as the primary ordering key.
    pub fn effective_at(&self) -> DateTime<Utc> {
        self.processed_at.unwrap_or(self.created_at)
    }

    /// Deterministic read ordering: most recently processed/created first,
    /// ties broken by `created_at` then `id`, all descending.
    pub fn display_order(a: &Transaction, b: &Transaction) -> Ordering {
        b.effective_at()
            .cmp(&a.effective_at())
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    }
}

/// A transaction as prepared by the ledger, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount_minor_units: MinorUnits,
    pub description: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl NewTransaction {
    /// A deposit settled at creation time.
    pub fn completed_deposit(
        amount_minor_units: MinorUnits,
        description: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: TransactionKind::Deposit,
            amount_minor_units,
            description,
            status: TransactionStatus::Completed,
            created_at: now,
            processed_at: Some(now),
        }
    }
}

/// Transaction enriched with the owning account's type for display.
/// The account type is a read-only join, never stored on the row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: i64,
    pub account_id: i64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub account_type: AccountType,
}

impl TransactionView {
    pub fn from_transaction(tx: Transaction, account_type: AccountType) -> Self {
        Self {
            id: tx.id,
            account_id: tx.account_id,
            kind: tx.kind,
            amount: format_minor_units(tx.amount_minor_units),
            description: tx.description,
            status: tx.status,
            created_at: tx.created_at,
            processed_at: tx.processed_at,
            account_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tx(id: i64, created: i64, processed: Option<i64>) -> Transaction {
        let at = |secs| Utc.timestamp_opt(secs, 0).unwrap();
        Transaction {
            id,
            account_id: 1,
            kind: TransactionKind::Deposit,
            amount_minor_units: 100,
            description: String::new(),
            status: TransactionStatus::Completed,
            created_at: at(created),
            processed_at: processed.map(at),
        }
    }

    #[test]
    fn test_null_processed_at_falls_back_to_created_at() {
        let a = tx(1, 100, None);
        let b = tx(2, 50, Some(200));
        // b processed later, sorts first
        assert_eq!(Transaction::display_order(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_equal_timestamps_break_ties_by_id_desc() {
        let a = tx(1, 100, Some(100));
        let b = tx(2, 100, Some(100));
        let mut v = vec![a, b];
        v.sort_by(Transaction::display_order);
        assert_eq!(v[0].id, 2);
        assert_eq!(v[1].id, 1);
    }

    #[test]
    fn test_signed_amount() {
        let mut t = tx(1, 100, Some(100));
        assert_eq!(t.signed_amount(), 100);
        t.kind = TransactionKind::Withdrawal;
        assert_eq!(t.signed_amount(), -100);
        t.status = TransactionStatus::Pending;
        assert_eq!(t.signed_amount(), 0);
    }

    #[test]
    fn test_view_wire_format() {
        let view = TransactionView::from_transaction(tx(5, 100, Some(100)), AccountType::Checking);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["type"], "deposit");
        assert_eq!(json["amount"], "1.00");
        assert_eq!(json["accountType"], "checking");
        assert_eq!(json["status"], "completed");
    }
}
