//! Request middleware.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::domain::OperationContext;

const USER_ID_HEADER: &str = "x-user-id";
const CORRELATION_HEADER: &str = "x-correlation-id";

/// Build the `OperationContext` for the request from gateway headers.
///
/// The upstream gateway authenticates the caller and forwards the user id
/// in `X-User-Id`; a request without a parseable id is rejected before it
/// reaches any handler.
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    let requester_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());

    let Some(requester_id) = requester_id else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "missing or invalid user identity",
                "error_code": "UNAUTHENTICATED",
            })),
        )
            .into_response();
    };

    let correlation_id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .unwrap_or_else(Uuid::new_v4);

    let context = OperationContext::new()
        .with_requester(requester_id)
        .with_correlation_id(correlation_id);

    tracing::debug!(
        requester_id,
        %correlation_id,
        method = %request.method(),
        path = %request.uri().path(),
        "request"
    );

    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Log each request with its outcome and latency.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    response
}
