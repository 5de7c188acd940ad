//! bank_ledger - deposit ledger service
//!
//! HTTP backend for account funding and transaction history, backed by
//! an append-only transaction log.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bank_ledger::api::{self, AppState};
use bank_ledger::config::Config;
use bank_ledger::ledger::{LedgerLimits, LedgerService};
use bank_ledger::store::{InMemoryLedgerStore, LedgerStore, PostgresLedgerStore};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bank_ledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the application router
fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check (no identity required)
        .route("/health", axum::routing::get(health_check))
        .nest("/api/v1", api::router(state))
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    let addr: SocketAddr = config.bind_address().parse()?;

    tracing::info!("Starting bank_ledger server");

    let mut pool = None;
    let store: Arc<dyn LedgerStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pg_pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            let store = PostgresLedgerStore::new(pg_pool.clone());
            store.ensure_schema().await?;
            pool = Some(pg_pool);
            tracing::info!("Database connected successfully");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(InMemoryLedgerStore::new())
        }
    };

    let limits = LedgerLimits {
        min_funding_minor_units: 1,
        max_funding_minor_units: config.max_funding_minor_units,
    };
    let state = AppState {
        service: Arc::new(LedgerService::new(store, limits)),
    };

    let app = build_router(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connections closed");
    }

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
