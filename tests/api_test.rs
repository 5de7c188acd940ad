//! API integration tests, driven through the router with oneshot requests.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use bank_ledger::api::{self, AppState};
use bank_ledger::domain::{AccountStatus, AccountType, NewAccount};
use bank_ledger::ledger::{LedgerLimits, LedgerService};
use bank_ledger::store::{InMemoryLedgerStore, LedgerStore};

const OWNER: i64 = 7;

async fn setup() -> (Arc<InMemoryLedgerStore>, Router, i64) {
    let store = Arc::new(InMemoryLedgerStore::new());
    let account = store
        .create_account(NewAccount::active(OWNER, AccountType::Checking))
        .await
        .unwrap();
    let state = AppState {
        service: Arc::new(LedgerService::new(
            Arc::clone(&store) as Arc<dyn LedgerStore>,
            LedgerLimits::default(),
        )),
    };
    (store, api::router(state), account.id)
}

fn fund_request(account_id: i64, user_id: Option<i64>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/accounts/{account_id}/fund"))
        .header("content-type", "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header("X-User-Id", user_id.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn card_body(amount: Value) -> Value {
    json!({
        "amount": amount,
        "fundingSource": { "type": "card", "accountNumber": "4111111111111111" }
    })
}

#[tokio::test]
async fn test_fund_happy_path() {
    let (_store, app, account_id) = setup().await;

    let response = app
        .oneshot(fund_request(account_id, Some(OWNER), card_body(json!("1.23"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["newBalance"], "1.23");
    assert_eq!(body["transaction"]["type"], "deposit");
    assert_eq!(body["transaction"]["amount"], "1.23");
    assert_eq!(body["transaction"]["status"], "completed");
    assert_eq!(body["transaction"]["accountType"], "checking");
}

#[tokio::test]
async fn test_fund_with_numeric_amount_and_bank_source() {
    let (_store, app, account_id) = setup().await;

    let body = json!({
        "amount": 4.56,
        "fundingSource": {
            "type": "bank",
            "accountNumber": "123456789",
            "routingNumber": "021000021"
        }
    });
    let response = app
        .oneshot(fund_request(account_id, Some(OWNER), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["newBalance"], "4.56");
}

#[tokio::test]
async fn test_missing_identity_rejected() {
    let (_store, app, account_id) = setup().await;

    let response = app
        .oneshot(fund_request(account_id, None, card_body(json!("1.00"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error_code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_invalid_amount_is_bad_request() {
    let (_store, app, account_id) = setup().await;

    let response = app
        .oneshot(fund_request(
            account_id,
            Some(OWNER),
            card_body(json!("01.00")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error_code"], "INVALID_AMOUNT");
}

#[tokio::test]
async fn test_invalid_funding_source_is_bad_request() {
    let (_store, app, account_id) = setup().await;

    let body = json!({
        "amount": "1.00",
        "fundingSource": { "type": "card", "accountNumber": "4111111111111112" }
    });
    let response = app
        .oneshot(fund_request(account_id, Some(OWNER), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error_code"], "INVALID_FUNDING_SOURCE");
    assert_eq!(body["details"]["kind"], "card");
}

#[tokio::test]
async fn test_unknown_and_foreign_accounts_look_identical() {
    let (_store, app, account_id) = setup().await;

    let missing = app
        .clone()
        .oneshot(fund_request(9999, Some(OWNER), card_body(json!("1.00"))))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let missing_body = body_json(missing).await;

    let foreign = app
        .oneshot(fund_request(
            account_id,
            Some(OWNER + 1),
            card_body(json!("1.00")),
        ))
        .await
        .unwrap();
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
    let foreign_body = body_json(foreign).await;

    assert_eq!(missing_body["error_code"], "ACCOUNT_NOT_FOUND");
    assert_eq!(foreign_body["error_code"], "ACCOUNT_NOT_FOUND");
}

#[tokio::test]
async fn test_inactive_account_is_conflict() {
    let (store, app, _) = setup().await;
    let closed = store
        .create_account(NewAccount {
            owner_id: OWNER,
            account_type: AccountType::Checking,
            status: AccountStatus::Closed,
        })
        .await
        .unwrap();

    let response = app
        .oneshot(fund_request(closed.id, Some(OWNER), card_body(json!("1.00"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["error_code"], "ACCOUNT_INACTIVE");
}

#[tokio::test]
async fn test_list_transactions_paginated() {
    let (_store, app, account_id) = setup().await;

    for amount in ["1.00", "2.00", "3.00"] {
        let response = app
            .clone()
            .oneshot(fund_request(
                account_id,
                Some(OWNER),
                card_body(json!(amount)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/accounts/{account_id}/transactions?page=0&pageSize=2"
                ))
                .header("X-User-Id", OWNER.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["totalCount"], 3);
    assert_eq!(body["page"], 0);
    assert_eq!(body["pageSize"], 2);
    let amounts: Vec<&str> = body["transactions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["amount"].as_str().unwrap())
        .collect();
    assert_eq!(amounts, vec!["3.00", "2.00"]);

    // Default paging when the query string is absent.
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/accounts/{account_id}/transactions"))
                .header("X-User-Id", OWNER.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["pageSize"], 50);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_list_accounts() {
    let (store, app, _) = setup().await;
    store
        .create_account(NewAccount::active(OWNER + 1, AccountType::Savings))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/accounts")
                .header("X-User-Id", OWNER.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let accounts = body.as_array().unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0]["balance"], "0.00");
    assert_eq!(accounts[0]["accountType"], "checking");
    assert_eq!(accounts[0]["status"], "active");
    assert!(accounts[0].get("version").is_none());
}
