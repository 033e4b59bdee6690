//! Custodial Balance Ledger
//!
//! Holds every user's funds as a two-part wallet and settles value through
//! PIN-locked transfer tokens.
//!
//! # Architecture
//!
//! Two thin services sit on one storage seam:
//! - **WalletService**: balance reads, top-ups, direct transfers
//! - **TokenService**: token issuance (reserve) and redemption (claim)
//! - **LedgerStore**: the storage contract, implemented durably by
//!   [`PgLedgerStore`] and in memory for tests by [`MemLedgerStore`]
//!
//! # Token Lifecycle
//!
//! ```text
//! reserve: available -= amount, reserved += amount, token OUTSTANDING
//! claim:   issuer reserved -= amount, claimant available += amount,
//!          token REDEEMED (terminal, exactly once)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Non-negative parts**: `available` and `reserved` never go below zero
//! 2. **Reservation cover**: a user's `reserved` always equals the sum of
//!    their outstanding token amounts
//! 3. **Conservation**: only top-ups change the system-wide total; every
//!    other operation moves existing funds
//! 4. **All-or-nothing**: each operation commits fully or leaves no trace

pub mod error;
pub mod mem_store;
pub mod models;
pub mod pg_store;
pub mod store;
pub mod token_service;
pub mod wallet_service;


// Re-exports for convenience
pub use error::LedgerError;
pub use mem_store::MemLedgerStore;
pub use models::{Token, TokenState, TransferRecord, Wallet, new_token_id};
pub use pg_store::PgLedgerStore;
pub use store::LedgerStore;
pub use token_service::{IssuedToken, TokenService, hash_pin, verify_pin};
pub use wallet_service::WalletService;
