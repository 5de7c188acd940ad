//! Account record
//!
//! Accounts are created by the external registration flow; the ledger
//! only mutates `balance_minor_units`, and only through an atomic
//! append+update commit. The balance is a cached projection of the
//! transaction log and must stay re-derivable from it.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::MinorUnits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Checking,
    Savings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
    Closed,
}

/// A deposit account owned by one user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub owner_id: i64,
    pub account_number: String,
    pub account_type: AccountType,
    pub balance_minor_units: MinorUnits,
    pub status: AccountStatus,
    /// Optimistic-concurrency stamp, bumped on every balance write.
    #[serde(skip)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Input for account creation (registration flow / seeding / tests).
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub owner_id: i64,
    pub account_type: AccountType,
    pub status: AccountStatus,
}

impl NewAccount {
    pub fn active(owner_id: i64, account_type: AccountType) -> Self {
        Self {
            owner_id,
            account_type,
            status: AccountStatus::Active,
        }
    }
}

/// Generate a 10-digit account number, zero-padded. Uniqueness is the
/// store's responsibility.
pub fn generate_account_number() -> String {
    let n: u64 = rand::thread_rng().gen_range(0..10_000_000_000);
    format!("{n:010}")
}
