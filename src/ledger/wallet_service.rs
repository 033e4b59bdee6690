//! Wallet Service
//!
//! Balance reads, top-ups and direct wallet-to-wallet transfers. Amount
//! validation happens here; atomicity is the store's job.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::money;

use super::error::LedgerError;
use super::models::{TransferRecord, Wallet};
use super::store::LedgerStore;

pub struct WalletService {
    store: Arc<dyn LedgerStore>,
}

impl WalletService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Current balance snapshot. Pure read apart from the lazy wallet
    /// creation on first touch.
    pub async fn get_balance(&self, user_id: i64) -> Result<Wallet, LedgerError> {
        self.store.get_wallet(user_id).await
    }

    /// Credit the available part and return the updated snapshot.
    pub async fn top_up(&self, user_id: i64, amount: Decimal) -> Result<Wallet, LedgerError> {
        let amount = money::validate_amount(amount)?;

        let wallet = self
            .store
            .apply_wallet_delta(user_id, amount, Decimal::ZERO)
            .await?;

        tracing::info!(
            user_id,
            amount = %amount,
            available = %wallet.available,
            "wallet topped up"
        );
        Ok(wallet)
    }

    /// Move available funds directly to another user's wallet.
    pub async fn transfer(
        &self,
        from_user: i64,
        to_user: i64,
        amount: Decimal,
    ) -> Result<TransferRecord, LedgerError> {
        let amount = money::validate_amount(amount)?;
        if from_user == to_user {
            return Err(LedgerError::InvalidAmount(
                "cannot transfer to yourself".to_string(),
            ));
        }

        let record = self.store.transfer(from_user, to_user, amount).await?;

        tracing::info!(
            from_user,
            to_user,
            amount = %amount,
            transfer_id = record.transfer_id,
            "transfer settled"
        );
        Ok(record)
    }

    /// Transfer history touching this user, newest first.
    pub async fn list_transfers(&self, user_id: i64) -> Result<Vec<TransferRecord>, LedgerError> {
        self.store.list_transfers(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::mem_store::MemLedgerStore;

    fn service() -> WalletService {
        WalletService::new(Arc::new(MemLedgerStore::new()))
    }

    #[tokio::test]
    async fn top_up_rejects_non_positive_amounts() {
        let svc = service();

        let err = svc.top_up(1, Decimal::ZERO).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let err = svc.top_up(1, Decimal::from(-5)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        // Nothing was credited by the rejected requests
        let wallet = svc.get_balance(1).await.unwrap();
        assert_eq!(wallet.available, Decimal::ZERO);
    }

    #[tokio::test]
    async fn top_up_rejects_sub_minor_precision() {
        let svc = service();
        let err = svc.top_up(1, Decimal::new(10005, 4)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn top_up_accumulates() {
        let svc = service();
        svc.top_up(1, Decimal::from(100)).await.unwrap();
        let wallet = svc.top_up(1, Decimal::new(5050, 2)).await.unwrap();
        assert_eq!(wallet.available, Decimal::new(15050, 2));
        assert_eq!(wallet.reserved, Decimal::ZERO);
    }

    #[tokio::test]
    async fn transfer_rejects_self() {
        let svc = service();
        svc.top_up(1, Decimal::from(100)).await.unwrap();

        let err = svc.transfer(1, 1, Decimal::from(10)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn transfer_moves_available_and_records_history() {
        let svc = service();
        svc.top_up(1, Decimal::from(100)).await.unwrap();
        svc.top_up(2, Decimal::from(1)).await.unwrap();

        let record = svc.transfer(1, 2, Decimal::from(30)).await.unwrap();
        assert_eq!(record.from_user, 1);
        assert_eq!(record.to_user, 2);
        assert_eq!(record.amount, Decimal::from(30));

        assert_eq!(svc.get_balance(1).await.unwrap().available, Decimal::from(70));
        assert_eq!(svc.get_balance(2).await.unwrap().available, Decimal::from(31));

        let sender_history = svc.list_transfers(1).await.unwrap();
        let receiver_history = svc.list_transfers(2).await.unwrap();
        assert_eq!(sender_history.len(), 1);
        assert_eq!(receiver_history.len(), 1);
        assert_eq!(sender_history[0].transfer_id, record.transfer_id);
    }
}
