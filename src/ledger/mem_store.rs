//! In-Memory Ledger Store
//!
//! Volatile [`LedgerStore`] used by unit and integration tests. One mutex
//! over the whole ledger makes every operation trivially serializable. Not
//! wired into the running gateway: balances must survive a process restart,
//! which only the PostgreSQL store provides.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::LedgerError;
use super::models::{Token, TransferRecord, Wallet};
use super::store::LedgerStore;

#[derive(Default)]
struct MemState {
    wallets: HashMap<i64, Wallet>,
    tokens: HashMap<Uuid, Token>,
    /// Issuance order; listing walks this backwards for newest-first.
    issuance_order: Vec<Uuid>,
    transfers: Vec<TransferRecord>,
    next_transfer_id: i64,
}

impl MemState {
    fn wallet_mut(&mut self, user_id: i64) -> &mut Wallet {
        self.wallets
            .entry(user_id)
            .or_insert_with(|| Wallet::empty(user_id))
    }
}

#[derive(Default)]
pub struct MemLedgerStore {
    inner: Mutex<MemState>,
}

impl MemLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemLedgerStore {
    async fn get_wallet(&self, user_id: i64) -> Result<Wallet, LedgerError> {
        let mut state = self.inner.lock().await;
        Ok(state.wallet_mut(user_id).clone())
    }

    async fn get_token(&self, token_id: Uuid) -> Result<Token, LedgerError> {
        let state = self.inner.lock().await;
        state
            .tokens
            .get(&token_id)
            .cloned()
            .ok_or(LedgerError::NotFound("Token"))
    }

    async fn apply_wallet_delta(
        &self,
        user_id: i64,
        available_delta: Decimal,
        reserved_delta: Decimal,
    ) -> Result<Wallet, LedgerError> {
        let mut state = self.inner.lock().await;
        let wallet = state.wallet_mut(user_id);

        let new_available = wallet.available + available_delta;
        let new_reserved = wallet.reserved + reserved_delta;
        if new_available < Decimal::ZERO || new_reserved < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds);
        }

        wallet.available = new_available;
        wallet.reserved = new_reserved;
        Ok(wallet.clone())
    }

    async fn create_token(&self, token: &Token) -> Result<(), LedgerError> {
        let mut state = self.inner.lock().await;
        if state.tokens.contains_key(&token.token_id) {
            return Err(LedgerError::Conflict);
        }
        state.tokens.insert(token.token_id, token.clone());
        state.issuance_order.push(token.token_id);
        Ok(())
    }

    async fn mark_redeemed(
        &self,
        token_id: Uuid,
        redeemed_by: i64,
    ) -> Result<Token, LedgerError> {
        let mut state = self.inner.lock().await;
        let token = state
            .tokens
            .get_mut(&token_id)
            .ok_or(LedgerError::NotFound("Token"))?;
        if token.redeemed_at.is_some() {
            return Err(LedgerError::AlreadyRedeemed);
        }
        token.redeemed_at = Some(Utc::now());
        token.redeemed_by = Some(redeemed_by);
        Ok(token.clone())
    }

    async fn list_tokens(&self, issuer_user_id: i64) -> Result<Vec<Token>, LedgerError> {
        let state = self.inner.lock().await;
        Ok(state
            .issuance_order
            .iter()
            .rev()
            .filter_map(|id| state.tokens.get(id))
            .filter(|t| t.issuer_user_id == issuer_user_id)
            .cloned()
            .collect())
    }

    async fn reserve_token(&self, token: &Token) -> Result<Wallet, LedgerError> {
        let mut state = self.inner.lock().await;

        // Collision check before any balance movement so a failure writes
        // nothing at all.
        if state.tokens.contains_key(&token.token_id) {
            return Err(LedgerError::Conflict);
        }

        let wallet = state.wallet_mut(token.issuer_user_id);
        if wallet.available < token.amount {
            return Err(LedgerError::InsufficientFunds);
        }
        wallet.available -= token.amount;
        wallet.reserved += token.amount;
        let snapshot = wallet.clone();

        state.tokens.insert(token.token_id, token.clone());
        state.issuance_order.push(token.token_id);
        Ok(snapshot)
    }

    async fn redeem_token(
        &self,
        token_id: Uuid,
        claimant_user_id: i64,
    ) -> Result<Token, LedgerError> {
        let mut state = self.inner.lock().await;

        // All checks before any write; there is no rollback here.
        let (issuer_id, amount) = match state.tokens.get(&token_id) {
            None => return Err(LedgerError::NotFound("Token")),
            Some(t) if t.redeemed_at.is_some() => return Err(LedgerError::AlreadyRedeemed),
            Some(t) => (t.issuer_user_id, t.amount),
        };
        if state.wallet_mut(issuer_id).reserved < amount {
            return Err(LedgerError::SystemError(format!(
                "reservation underflow for user {}",
                issuer_id
            )));
        }

        let token = state
            .tokens
            .get_mut(&token_id)
            .ok_or(LedgerError::NotFound("Token"))?;
        token.redeemed_at = Some(Utc::now());
        token.redeemed_by = Some(claimant_user_id);
        let settled = token.clone();

        state.wallet_mut(issuer_id).reserved -= amount;
        state.wallet_mut(claimant_user_id).available += amount;

        Ok(settled)
    }

    async fn transfer(
        &self,
        from_user: i64,
        to_user: i64,
        amount: Decimal,
    ) -> Result<TransferRecord, LedgerError> {
        let mut state = self.inner.lock().await;

        if !state.wallets.contains_key(&to_user) {
            return Err(LedgerError::NotFound("Recipient wallet"));
        }

        let sender = state.wallet_mut(from_user);
        if sender.available < amount {
            return Err(LedgerError::InsufficientFunds);
        }
        sender.available -= amount;
        let receiver = state.wallet_mut(to_user);
        receiver.available += amount;

        state.next_transfer_id += 1;
        let record = TransferRecord {
            transfer_id: state.next_transfer_id,
            from_user,
            to_user,
            amount,
            created_at: Utc::now(),
        };
        state.transfers.push(record.clone());
        Ok(record)
    }

    async fn list_transfers(&self, user_id: i64) -> Result<Vec<TransferRecord>, LedgerError> {
        let state = self.inner.lock().await;
        Ok(state
            .transfers
            .iter()
            .rev()
            .filter(|t| t.from_user == user_id || t.to_user == user_id)
            .cloned()
            .collect())
    }
}
