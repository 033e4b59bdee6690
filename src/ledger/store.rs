//! Ledger Store Contract
//!
//! Storage seam between the services and the durable ledger. Two
//! implementations exist: [`PgLedgerStore`](crate::ledger::pg_store::PgLedgerStore)
//! backs the running gateway, [`MemLedgerStore`](crate::ledger::mem_store::MemLedgerStore)
//! backs tests that need no database.
//!
//! Every method is one logical operation: implementations must make it
//! behave as if serialized against concurrent operations touching the same
//! wallet or token, and must leave no partial writes behind on failure.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerError;
use super::models::{Token, TransferRecord, Wallet};

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fetch a user's wallet, creating an empty one on first touch.
    ///
    /// Idempotent: repeated calls for the same user return the same wallet.
    async fn get_wallet(&self, user_id: i64) -> Result<Wallet, LedgerError>;

    /// Fetch a token by id, `NotFound` if absent.
    async fn get_token(&self, token_id: Uuid) -> Result<Token, LedgerError>;

    /// Atomically apply signed deltas to both parts of one wallet and
    /// return the updated snapshot.
    ///
    /// The wallet is created first if missing. Fails with
    /// `InsufficientFunds` (writing nothing) if either part would go
    /// negative.
    async fn apply_wallet_delta(
        &self,
        user_id: i64,
        available_delta: Decimal,
        reserved_delta: Decimal,
    ) -> Result<Wallet, LedgerError>;

    /// Insert a new outstanding token. `Conflict` if the id already exists.
    async fn create_token(&self, token: &Token) -> Result<(), LedgerError>;

    /// Flip a token to redeemed, exactly once (compare-and-set on
    /// `redeemed_at IS NULL`). Of any number of concurrent callers exactly
    /// one wins; the rest get `AlreadyRedeemed`.
    async fn mark_redeemed(&self, token_id: Uuid, redeemed_by: i64)
    -> Result<Token, LedgerError>;

    /// All tokens issued by a user, redeemed ones included, newest first.
    async fn list_tokens(&self, issuer_user_id: i64) -> Result<Vec<Token>, LedgerError>;

    /// Issue a token and move its amount from the issuer's available part
    /// to the reserved part, as one atomic unit. Returns the issuer's
    /// updated wallet. On any failure (funds check, id collision) nothing
    /// is written.
    async fn reserve_token(&self, token: &Token) -> Result<Wallet, LedgerError>;

    /// Settle a token as one atomic unit: mark it redeemed, release the
    /// issuer's reservation, credit the claimant's available part. The
    /// claimant wallet is created if missing. Returns the settled token.
    async fn redeem_token(
        &self,
        token_id: Uuid,
        claimant_user_id: i64,
    ) -> Result<Token, LedgerError>;

    /// Move funds directly between two wallets and append a history row,
    /// as one atomic unit. The recipient wallet must already exist.
    async fn transfer(
        &self,
        from_user: i64,
        to_user: i64,
        amount: Decimal,
    ) -> Result<TransferRecord, LedgerError>;

    /// Transfer history touching a user (either side), newest first.
    async fn list_transfers(&self, user_id: i64) -> Result<Vec<TransferRecord>, LedgerError>;
}
