//! SonicPay - Custodial Wallet Gateway
//!
//! Backend for a proximity-payment mobile app: every user owns a custodial
//! wallet, payments ride on PIN-protected payment tokens whose funds are
//! reserved up front, and settlement is atomic in PostgreSQL.
//!
//! # Modules
//!
//! - [`money`] - Amount validation and formatting
//! - [`ledger`] - Wallets, payment tokens, transfers (the balance core)
//! - [`db`] - PostgreSQL pool and schema
//! - [`user_auth`] - Session issuance (JWT) and the bearer middleware
//! - [`gateway`] - Axum HTTP surface, OpenAPI docs
//! - [`bank`] - Card issuance proxy
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing initialization

pub mod bank;
pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod user_auth;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use db::Database;
pub use ledger::{
    IssuedToken, LedgerError, LedgerStore, MemLedgerStore, PgLedgerStore, Token, TokenService,
    TokenState, TransferRecord, Wallet, WalletService,
};
