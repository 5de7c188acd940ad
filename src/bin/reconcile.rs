//! Balance Reconciliation Tool
//!
//! Recomputes account balances from the transaction log and reports any
//! drift against the cached balances. Read-only unless --fix is given.
//!
//! Run with: cargo run --bin reconcile -- [--account <id>] [--fix]

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use bank_ledger::reconcile::ReconciliationService;
use bank_ledger::store::{LedgerStore, PostgresLedgerStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let fix = args.iter().any(|a| a == "--fix");
    let account: Option<i64> = args
        .iter()
        .position(|a| a == "--account")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok());

    let database_url = std::env::var("DATABASE_URL")?;

    println!("Reconciliation - mode: {}", if fix { "fix" } else { "audit" });
    println!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    let store: Arc<dyn LedgerStore> = Arc::new(PostgresLedgerStore::new(pool.clone()));
    let service = ReconciliationService::new(store);

    match account {
        Some(id) => {
            let audit = service
                .reconcile_account(id, fix)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            if audit.is_consistent() {
                println!("Account {id}: consistent (balance {})", audit.stored_minor_units);
            } else {
                println!(
                    "Account {id}: DRIFT stored={} computed={} drift={}{}",
                    audit.stored_minor_units,
                    audit.computed_minor_units,
                    audit.drift(),
                    if fix { " (corrected)" } else { "" },
                );
            }
        }
        None => {
            let report = service
                .reconcile_all(fix)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("Audited {} accounts", report.audited);
            for audit in &report.drifted {
                println!(
                    "Account {}: DRIFT stored={} computed={} drift={}",
                    audit.account_id,
                    audit.stored_minor_units,
                    audit.computed_minor_units,
                    audit.drift(),
                );
            }
            if report.drifted.is_empty() {
                println!("All balances consistent");
            } else {
                println!(
                    "{} drifted, {} corrected",
                    report.drifted.len(),
                    report.corrected
                );
            }
        }
    }

    pool.close().await;
    Ok(())
}
