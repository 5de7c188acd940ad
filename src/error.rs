//! Application error types
//!
//! Every fallible path funnels into `AppError`, which maps onto an HTTP
//! status and a stable machine-readable `error_code`. Validation errors
//! carry details; persistence errors are logged in full and reported to
//! the client as a generic failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::{AmountError, FundingError, MinorUnits};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("amount out of range")]
    AmountOutOfBounds {
        minimum: MinorUnits,
        maximum: MinorUnits,
    },

    #[error(transparent)]
    InvalidFundingSource(#[from] FundingError),

    #[error("account {0} not found")]
    AccountNotFound(i64),

    /// Reported to the client as not-found so account ids cannot be probed.
    #[error("account {0} is not owned by the requester")]
    AccountNotOwned(i64),

    #[error("account {0} is not active")]
    AccountInactive(i64),

    #[error("account {0} was modified concurrently")]
    ConcurrencyConflict(i64),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VersionConflict { account_id, .. } => {
                AppError::ConcurrencyConflict(account_id)
            }
            StoreError::AccountMissing(id) => AppError::AccountNotFound(id),
            StoreError::Backend(msg) => AppError::Persistence(msg),
        }
    }
}

impl AppError {
    fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidAmount(_) | AppError::AmountOutOfBounds { .. } => "INVALID_AMOUNT",
            AppError::InvalidFundingSource(_) => "INVALID_FUNDING_SOURCE",
            AppError::AccountNotFound(_) | AppError::AccountNotOwned(_) => "ACCOUNT_NOT_FOUND",
            AppError::AccountInactive(_) => "ACCOUNT_INACTIVE",
            AppError::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            AppError::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidAmount(_)
            | AppError::AmountOutOfBounds { .. }
            | AppError::InvalidFundingSource(_) => StatusCode::BAD_REQUEST,
            AppError::AccountNotFound(_) | AppError::AccountNotOwned(_) => StatusCode::NOT_FOUND,
            AppError::AccountInactive(_) | AppError::ConcurrencyConflict(_) => {
                StatusCode::CONFLICT
            }
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the client may safely retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ConcurrencyConflict(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        let message = match &self {
            // Same body for missing and foreign accounts.
            AppError::AccountNotOwned(id) | AppError::AccountNotFound(id) => {
                format!("account {id} not found")
            }
            AppError::Persistence(detail) => {
                tracing::error!(%detail, "persistence failure");
                "an internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "error": message,
            "error_code": error_code,
        });
        match &self {
            AppError::InvalidFundingSource(e) => {
                body["details"] = json!({ "kind": e.kind, "reason": e.reason });
            }
            AppError::AmountOutOfBounds { minimum, maximum } => {
                body["details"] = json!({
                    "minimumMinorUnits": minimum,
                    "maximumMinorUnits": maximum,
                });
            }
            _ => {}
        }
        if self.is_retryable() {
            body["retryable"] = json!(true);
        }

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
