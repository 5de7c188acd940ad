//! HTTP interface.
//!
//! Thin axum layer over `LedgerService`. Identity arrives from the
//! upstream gateway as an `X-User-Id` header; the identity middleware
//! turns it into an `OperationContext` and rejects requests without one.

mod middleware;
mod routes;

use std::sync::Arc;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};

use crate::ledger::LedgerService;

pub use middleware::{identity_middleware, logging_middleware};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LedgerService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/accounts", get(routes::list_accounts))
        .route("/accounts/:account_id/fund", post(routes::fund_account))
        .route(
            "/accounts/:account_id/transactions",
            get(routes::list_transactions),
        )
        // Layers apply in reverse order: logging wraps identity wraps handlers.
        .layer(from_fn(identity_middleware))
        .layer(from_fn(logging_middleware))
        .with_state(state)
}
