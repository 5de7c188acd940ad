//! Route handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    format_minor_units, Account, AccountStatus, AccountType, AmountInput, FundingSource,
    OperationContext, PageParams, TransactionView,
};
use crate::error::AppResult;

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundRequest {
    pub amount: AmountInput,
    pub funding_source: FundingSource,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundResponse {
    pub transaction: TransactionView,
    pub new_balance: Decimal,
}

/// Account as rendered on the wire, with a decimal balance.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: i64,
    pub account_number: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            account_number: account.account_number,
            account_type: account.account_type,
            balance: format_minor_units(account.balance_minor_units),
            status: account.status,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionView>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
}

pub async fn fund_account(
    State(state): State<AppState>,
    Extension(ctx): Extension<OperationContext>,
    Path(account_id): Path<i64>,
    Json(request): Json<FundRequest>,
) -> AppResult<(StatusCode, Json<FundResponse>)> {
    let outcome = state
        .service
        .fund_account(&ctx, account_id, request.amount, request.funding_source)
        .await?;

    let response = FundResponse {
        new_balance: format_minor_units(outcome.new_balance),
        transaction: TransactionView::from_transaction(outcome.transaction, outcome.account_type),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(ctx): Extension<OperationContext>,
) -> AppResult<Json<Vec<AccountView>>> {
    let accounts = state.service.get_accounts(&ctx).await?;
    Ok(Json(accounts.into_iter().map(AccountView::from).collect()))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(ctx): Extension<OperationContext>,
    Path(account_id): Path<i64>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<TransactionListResponse>> {
    let page = state.service.get_transactions(&ctx, account_id, page).await?;
    Ok(Json(TransactionListResponse {
        transactions: page.transactions,
        page: page.page,
        page_size: page.page_size,
        total_count: page.total_count,
    }))
}
