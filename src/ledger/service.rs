//! Funding pipeline and transaction reads.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::domain::{
    card_network, AmountInput, FundingKind, FundingSource, MinorUnits, NewTransaction,
    OperationContext, PageParams, Transaction, TransactionView,
};
use crate::error::{AppError, AppResult};
use crate::store::LedgerStore;

use super::AccountLocks;

const MAX_COMMIT_RETRIES: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 50;

/// Funding amount bounds in minor units.
#[derive(Debug, Clone, Copy)]
pub struct LedgerLimits {
    pub min_funding_minor_units: MinorUnits,
    pub max_funding_minor_units: MinorUnits,
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self {
            min_funding_minor_units: 1,
            max_funding_minor_units: 1_000_000,
        }
    }
}

/// Result of a successful funding operation.
#[derive(Debug, Clone)]
pub struct FundOutcome {
    pub transaction: Transaction,
    pub new_balance: MinorUnits,
    pub account_type: crate::domain::AccountType,
}

/// One page of enriched transactions plus paging metadata.
#[derive(Debug, Clone)]
pub struct TransactionPage {
    pub transactions: Vec<TransactionView>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
}

pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    locks: AccountLocks,
    limits: LedgerLimits,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>, limits: LedgerLimits) -> Self {
        Self {
            store,
            locks: AccountLocks::new(),
            limits,
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Fund an account from an external source.
    ///
    /// Validation runs before any state is touched, in a fixed order:
    /// amount normalization, amount bounds, funding source checksum, then
    /// account existence, ownership and status. The commit itself retries
    /// a bounded number of times on version conflicts from writers in
    /// other processes.
    pub async fn fund_account(
        &self,
        ctx: &OperationContext,
        account_id: i64,
        amount: AmountInput,
        source: FundingSource,
    ) -> AppResult<FundOutcome> {
        let cents = amount.normalize()?;
        if cents < self.limits.min_funding_minor_units
            || cents > self.limits.max_funding_minor_units
        {
            return Err(AppError::AmountOutOfBounds {
                minimum: self.limits.min_funding_minor_units,
                maximum: self.limits.max_funding_minor_units,
            });
        }

        source.validate()?;
        if let FundingSource::Card { account_number } = &source {
            tracing::debug!(network = %card_network(account_number), "card funding source");
        }

        let description = match source.kind() {
            FundingKind::Card => "Funding from card",
            FundingKind::Bank => "Funding from bank account",
        };

        let _guard = self.locks.acquire(account_id).await;

        for attempt in 0..MAX_COMMIT_RETRIES {
            let account = self
                .store
                .account_by_id(account_id)
                .await?
                .ok_or(AppError::AccountNotFound(account_id))?;

            if ctx.requester_id != Some(account.owner_id) {
                return Err(AppError::AccountNotOwned(account_id));
            }
            if !account.is_active() {
                return Err(AppError::AccountInactive(account_id));
            }

            let tx = NewTransaction::completed_deposit(cents, description.to_string(), Utc::now());
            match self
                .store
                .commit_transaction(account.id, account.version, tx)
                .await
            {
                Ok((transaction, new_balance)) => {
                    tracing::info!(
                        account_id,
                        transaction_id = transaction.id,
                        amount_minor_units = cents,
                        source = %source.kind(),
                        correlation_id = ?ctx.correlation_id,
                        "account funded"
                    );
                    return Ok(FundOutcome {
                        transaction,
                        new_balance,
                        account_type: account.account_type,
                    });
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        account_id,
                        attempt = attempt + 1,
                        "version conflict, retrying commit"
                    );
                    tokio::time::sleep(Duration::from_millis(
                        RETRY_BACKOFF_MS * u64::from(attempt + 1),
                    ))
                    .await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::ConcurrencyConflict(account_id))
    }

    /// All accounts owned by the requester.
    pub async fn get_accounts(
        &self,
        ctx: &OperationContext,
    ) -> AppResult<Vec<crate::domain::Account>> {
        let requester = ctx
            .requester_id
            .ok_or_else(|| AppError::Persistence("request without requester".to_string()))?;
        Ok(self.store.accounts_by_owner(requester).await?)
    }

    /// One ordered page of the account's transactions, enriched with the
    /// account type. Ownership is checked before anything is read.
    pub async fn get_transactions(
        &self,
        ctx: &OperationContext,
        account_id: i64,
        page: PageParams,
    ) -> AppResult<TransactionPage> {
        let account = self
            .store
            .account_by_id(account_id)
            .await?
            .ok_or(AppError::AccountNotFound(account_id))?;
        if ctx.requester_id != Some(account.owner_id) {
            return Err(AppError::AccountNotOwned(account_id));
        }

        let rows = self.store.transactions_page(account_id, page).await?;
        let total_count = self.store.transaction_count(account_id).await?;

        // Every row belongs to the one account already loaded, so the
        // enrichment is a single join done here rather than per row.
        let transactions = rows
            .into_iter()
            .map(|tx| TransactionView::from_transaction(tx, account.account_type))
            .collect();

        Ok(TransactionPage {
            transactions,
            page: page.page,
            page_size: page.limit(),
            total_count,
        })
    }
}
