//! SonicPay - Custodial Wallet Gateway
//!
//! This is the main entry point. Architecture:
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│ Gateway  │───▶│  Ledger  │───▶│ Postgres │
//! │  (YAML)  │    │ (axum)   │    │ (atomic) │    │ (NUMERIC)│
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//!
//! Ledger responsibilities:
//! - Wallet balances (available / reserved, never negative)
//! - Payment token reserve / claim settlement
//! - Peer transfers, all-or-nothing in one transaction
//! ```

use std::sync::Arc;

use anyhow::Context;

use sonicpay::config::AppConfig;
use sonicpay::db::Database;
use sonicpay::gateway;
use sonicpay::logging::init_logging;

/// Get environment from command line (--env/-e argument)
fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env);
    let _log_guard = init_logging(&config);

    if let Some(port) = get_port_override() {
        config.gateway.port = port;
    }

    tracing::info!(
        "Starting SonicPay gateway in {} mode on {}:{}",
        env,
        config.gateway.host,
        config.gateway.port
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let postgres_url = config
            .postgres_url
            .clone()
            .context("postgres_url missing from config; the ledger requires PostgreSQL")?;

        let db = Arc::new(
            Database::connect(&postgres_url)
                .await
                .context("PostgreSQL connection failed")?,
        );
        db.init_schema()
            .await
            .context("ledger schema initialization failed")?;

        gateway::run_server(config, db).await
    })
}
