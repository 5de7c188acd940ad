//! Balance reconciliation.
//!
//! Recomputes each account balance from the transaction log and compares
//! it with the cached value on the account row. Runs offline against the
//! same store as the server; audit mode never writes, correction mode
//! overwrites drifted balances with the recomputed sum.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::MinorUnits;
use crate::error::{AppError, AppResult};
use crate::store::LedgerStore;

/// Comparison of a cached balance against the log-derived one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceAudit {
    pub account_id: i64,
    pub stored_minor_units: MinorUnits,
    pub computed_minor_units: MinorUnits,
}

impl BalanceAudit {
    pub fn is_consistent(&self) -> bool {
        self.stored_minor_units == self.computed_minor_units
    }

    /// Stored minus computed; zero when consistent.
    pub fn drift(&self) -> MinorUnits {
        self.stored_minor_units - self.computed_minor_units
    }
}

/// Outcome of a full reconciliation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub audited: usize,
    pub drifted: Vec<BalanceAudit>,
    pub corrected: usize,
}

pub struct ReconciliationService {
    store: Arc<dyn LedgerStore>,
}

impl ReconciliationService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Audit one account without writing anything.
    pub async fn audit_account(&self, account_id: i64) -> AppResult<BalanceAudit> {
        let account = self
            .store
            .account_by_id(account_id)
            .await?
            .ok_or(AppError::AccountNotFound(account_id))?;
        let computed = self.store.completed_sum(account_id).await?;
        Ok(BalanceAudit {
            account_id,
            stored_minor_units: account.balance_minor_units,
            computed_minor_units: computed,
        })
    }

    /// Audit every account; with `correct` set, overwrite each drifted
    /// balance with the recomputed value.
    pub async fn reconcile_all(&self, correct: bool) -> AppResult<ReconciliationReport> {
        let ids = self.store.account_ids().await?;
        let audited = ids.len();
        let mut drifted = Vec::new();
        let mut corrected = 0;

        for id in ids {
            let audit = self.audit_account(id).await?;
            if audit.is_consistent() {
                continue;
            }
            tracing::warn!(
                account_id = audit.account_id,
                stored = audit.stored_minor_units,
                computed = audit.computed_minor_units,
                "balance drift detected"
            );
            if correct {
                self.store
                    .overwrite_balance(audit.account_id, audit.computed_minor_units)
                    .await?;
                corrected += 1;
            }
            drifted.push(audit);
        }

        Ok(ReconciliationReport {
            audited,
            drifted,
            corrected,
        })
    }

    /// Reconcile a single account, optionally correcting it.
    pub async fn reconcile_account(
        &self,
        account_id: i64,
        correct: bool,
    ) -> AppResult<BalanceAudit> {
        let audit = self.audit_account(account_id).await?;
        if !audit.is_consistent() && correct {
            self.store
                .overwrite_balance(account_id, audit.computed_minor_units)
                .await?;
        }
        Ok(audit)
    }
}
