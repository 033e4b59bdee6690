//! Token Lifecycle Service
//!
//! Issuance (reserve) and redemption (claim) of PIN-locked transfer tokens.
//! The PIN is hashed with Argon2 before it ever reaches the store; the
//! cleartext is returned to the issuer exactly once and never persisted.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::money;

use super::error::LedgerError;
use super::models::Token;
use super::store::LedgerStore;

/// Result of a successful issuance. `pin` is the only place the cleartext
/// secret ever appears.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: Token,
    pub pin: String,
}

pub struct TokenService {
    store: Arc<dyn LedgerStore>,
}

/// Hash a PIN for storage (Argon2id, random salt, PHC string output).
pub fn hash_pin(pin: &str) -> Result<String, LedgerError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| LedgerError::SystemError(format!("PIN hashing failed: {}", e)))
}

/// Check a presented PIN against a stored hash. A malformed hash counts as
/// a mismatch rather than an error.
pub fn verify_pin(pin: &str, pin_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(pin_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Server-side PIN when the issuer did not choose one: four decimal digits,
/// leading zeros kept.
fn generate_pin() -> String {
    let mut rng = rand::thread_rng();
    format!("{:04}", rng.gen_range(0..10_000))
}

impl TokenService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Issue a token: move `amount` from the issuer's available funds into
    /// reserve and create the OUTSTANDING token backing it, atomically.
    ///
    /// An id collision (vanishingly rare with random 128-bit ids) is
    /// retried once with a fresh id; a second collision is treated as a
    /// fault, not bad input.
    pub async fn reserve(
        &self,
        issuer_user_id: i64,
        amount: Decimal,
        pin: Option<String>,
    ) -> Result<IssuedToken, LedgerError> {
        let amount = money::validate_amount(amount)?;
        let pin = pin.unwrap_or_else(generate_pin);
        let pin_hash = hash_pin(&pin)?;

        let token = Token::issue(issuer_user_id, amount, pin_hash.clone());
        let token = match self.store.reserve_token(&token).await {
            Ok(wallet) => {
                tracing::info!(
                    issuer_user_id,
                    token_id = %token.token_id,
                    amount = %amount,
                    available = %wallet.available,
                    reserved = %wallet.reserved,
                    "token reserved"
                );
                token
            }
            Err(LedgerError::Conflict) => {
                tracing::warn!(
                    token_id = %token.token_id,
                    "token id collision, retrying once with a fresh id"
                );
                let retry = Token::issue(issuer_user_id, amount, pin_hash);
                match self.store.reserve_token(&retry).await {
                    Ok(wallet) => {
                        tracing::info!(
                            issuer_user_id,
                            token_id = %retry.token_id,
                            amount = %amount,
                            available = %wallet.available,
                            reserved = %wallet.reserved,
                            "token reserved after id retry"
                        );
                        retry
                    }
                    Err(LedgerError::Conflict) => {
                        return Err(LedgerError::SystemError(
                            "token id collision repeated after retry".to_string(),
                        ));
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        Ok(IssuedToken { token, pin })
    }

    /// Redeem a token: verify the PIN, then settle atomically (release the
    /// issuer's reservation, credit the claimant, mark the token redeemed).
    ///
    /// A wrong PIN changes nothing and the caller may retry. Under
    /// concurrent claims the store's compare-and-set picks exactly one
    /// winner. Claiming your own token is allowed and simply returns the
    /// reserved funds to your available balance.
    pub async fn claim(
        &self,
        token_id: Uuid,
        pin: &str,
        claimant_user_id: i64,
    ) -> Result<Token, LedgerError> {
        let token = self.store.get_token(token_id).await?;
        if token.redeemed_at.is_some() {
            return Err(LedgerError::AlreadyRedeemed);
        }

        // PIN check against the immutable hash, before any state is touched.
        if !verify_pin(pin, &token.pin_hash) {
            tracing::warn!(token_id = %token_id, claimant_user_id, "claim rejected: wrong PIN");
            return Err(LedgerError::InvalidPin);
        }

        let settled = self.store.redeem_token(token_id, claimant_user_id).await?;
        tracing::info!(
            token_id = %token_id,
            issuer_user_id = settled.issuer_user_id,
            claimant_user_id,
            amount = %settled.amount,
            "token redeemed"
        );
        Ok(settled)
    }

    /// Every token this user ever issued, redeemed ones included, newest
    /// first.
    pub async fn list_tokens(&self, issuer_user_id: i64) -> Result<Vec<Token>, LedgerError> {
        self.store.list_tokens(issuer_user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::mem_store::MemLedgerStore;
    use crate::ledger::models::{TokenState, TransferRecord, Wallet};
    use crate::ledger::wallet_service::WalletService;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn services() -> (Arc<MemLedgerStore>, WalletService, TokenService) {
        let store = Arc::new(MemLedgerStore::new());
        (
            store.clone(),
            WalletService::new(store.clone()),
            TokenService::new(store),
        )
    }

    #[test]
    fn pin_hash_roundtrip() {
        let hash = hash_pin("1234").unwrap();
        assert_ne!(hash, "1234");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_pin("1234", &hash));
        assert!(!verify_pin("4321", &hash));
        assert!(!verify_pin("1234", "not-a-phc-string"));
    }

    #[test]
    fn generated_pin_is_four_digits() {
        for _ in 0..32 {
            let pin = generate_pin();
            assert_eq!(pin.len(), 4);
            assert!(pin.chars().all(|c| c.is_ascii_digit()), "pin: {}", pin);
        }
    }

    #[tokio::test]
    async fn reserve_moves_funds_and_returns_pin() {
        let (_, wallets, tokens) = services();
        wallets.top_up(1, Decimal::from(100)).await.unwrap();

        let issued = tokens
            .reserve(1, Decimal::from(40), Some("1234".to_string()))
            .await
            .unwrap();
        assert_eq!(issued.pin, "1234");
        assert_eq!(issued.token.amount, Decimal::from(40));
        assert_eq!(issued.token.state(), TokenState::Outstanding);

        let wallet = wallets.get_balance(1).await.unwrap();
        assert_eq!(wallet.available, Decimal::from(60));
        assert_eq!(wallet.reserved, Decimal::from(40));
    }

    #[tokio::test]
    async fn reserve_beyond_available_fails_clean() {
        let (_, wallets, tokens) = services();
        wallets.top_up(1, Decimal::from(100)).await.unwrap();

        let err = tokens
            .reserve(1, Decimal::from(150), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds));

        let wallet = wallets.get_balance(1).await.unwrap();
        assert_eq!(wallet.available, Decimal::from(100));
        assert_eq!(wallet.reserved, Decimal::ZERO);
        assert!(tokens.list_tokens(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn claim_settles_between_issuer_and_claimant() {
        let (_, wallets, tokens) = services();
        wallets.top_up(1, Decimal::from(100)).await.unwrap();

        let issued = tokens
            .reserve(1, Decimal::from(40), Some("1234".to_string()))
            .await
            .unwrap();
        let settled = tokens
            .claim(issued.token.token_id, "1234", 2)
            .await
            .unwrap();
        assert_eq!(settled.state(), TokenState::Redeemed);
        assert_eq!(settled.redeemed_by, Some(2));

        let issuer = wallets.get_balance(1).await.unwrap();
        assert_eq!(issuer.available, Decimal::from(60));
        assert_eq!(issuer.reserved, Decimal::ZERO);

        let claimant = wallets.get_balance(2).await.unwrap();
        assert_eq!(claimant.available, Decimal::from(40));
    }

    #[tokio::test]
    async fn wrong_pin_changes_nothing_and_allows_retry() {
        let (_, wallets, tokens) = services();
        wallets.top_up(1, Decimal::from(100)).await.unwrap();
        let issued = tokens
            .reserve(1, Decimal::from(40), Some("1234".to_string()))
            .await
            .unwrap();

        let err = tokens
            .claim(issued.token.token_id, "9999", 2)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPin));

        // Token still outstanding, balances untouched
        let issuer = wallets.get_balance(1).await.unwrap();
        assert_eq!(issuer.available, Decimal::from(60));
        assert_eq!(issuer.reserved, Decimal::from(40));
        assert_eq!(wallets.get_balance(2).await.unwrap().available, Decimal::ZERO);

        // Same claimant retries with the right PIN and wins
        let settled = tokens
            .claim(issued.token.token_id, "1234", 2)
            .await
            .unwrap();
        assert_eq!(settled.redeemed_by, Some(2));
    }

    #[tokio::test]
    async fn claim_unknown_token_is_not_found() {
        let (_, _, tokens) = services();
        let err = tokens
            .claim(crate::ledger::models::new_token_id(), "1234", 2)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound("Token")));
    }

    #[tokio::test]
    async fn self_claim_returns_reserved_funds() {
        let (_, wallets, tokens) = services();
        wallets.top_up(1, Decimal::from(100)).await.unwrap();
        let issued = tokens
            .reserve(1, Decimal::from(40), Some("1234".to_string()))
            .await
            .unwrap();

        let settled = tokens
            .claim(issued.token.token_id, "1234", 1)
            .await
            .unwrap();
        assert_eq!(settled.redeemed_by, Some(1));

        let wallet = wallets.get_balance(1).await.unwrap();
        assert_eq!(wallet.available, Decimal::from(100));
        assert_eq!(wallet.reserved, Decimal::ZERO);
    }

    /// Store wrapper that forces a configurable number of id collisions on
    /// issuance, for exercising the retry path.
    struct CollidingStore {
        inner: MemLedgerStore,
        collisions_left: AtomicUsize,
    }

    impl CollidingStore {
        fn new(collisions: usize) -> Self {
            Self {
                inner: MemLedgerStore::new(),
                collisions_left: AtomicUsize::new(collisions),
            }
        }
    }

    #[async_trait]
    impl LedgerStore for CollidingStore {
        async fn get_wallet(&self, user_id: i64) -> Result<Wallet, LedgerError> {
            self.inner.get_wallet(user_id).await
        }
        async fn get_token(&self, token_id: Uuid) -> Result<Token, LedgerError> {
            self.inner.get_token(token_id).await
        }
        async fn apply_wallet_delta(
            &self,
            user_id: i64,
            available_delta: Decimal,
            reserved_delta: Decimal,
        ) -> Result<Wallet, LedgerError> {
            self.inner
                .apply_wallet_delta(user_id, available_delta, reserved_delta)
                .await
        }
        async fn create_token(&self, token: &Token) -> Result<(), LedgerError> {
            self.inner.create_token(token).await
        }
        async fn mark_redeemed(
            &self,
            token_id: Uuid,
            redeemed_by: i64,
        ) -> Result<Token, LedgerError> {
            self.inner.mark_redeemed(token_id, redeemed_by).await
        }
        async fn list_tokens(&self, issuer_user_id: i64) -> Result<Vec<Token>, LedgerError> {
            self.inner.list_tokens(issuer_user_id).await
        }
        async fn reserve_token(&self, token: &Token) -> Result<Wallet, LedgerError> {
            if self
                .collisions_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(LedgerError::Conflict);
            }
            self.inner.reserve_token(token).await
        }
        async fn redeem_token(
            &self,
            token_id: Uuid,
            claimant_user_id: i64,
        ) -> Result<Token, LedgerError> {
            self.inner.redeem_token(token_id, claimant_user_id).await
        }
        async fn transfer(
            &self,
            from_user: i64,
            to_user: i64,
            amount: Decimal,
        ) -> Result<TransferRecord, LedgerError> {
            self.inner.transfer(from_user, to_user, amount).await
        }
        async fn list_transfers(&self, user_id: i64) -> Result<Vec<TransferRecord>, LedgerError> {
            self.inner.list_transfers(user_id).await
        }
    }

    #[tokio::test]
    async fn single_collision_is_retried_with_fresh_id() {
        let store = Arc::new(CollidingStore::new(1));
        let wallets = WalletService::new(store.clone());
        let tokens = TokenService::new(store);

        wallets.top_up(1, Decimal::from(100)).await.unwrap();
        let issued = tokens
            .reserve(1, Decimal::from(40), Some("1234".to_string()))
            .await
            .unwrap();

        // The retry succeeded and the reservation stands
        let wallet = wallets.get_balance(1).await.unwrap();
        assert_eq!(wallet.reserved, Decimal::from(40));
        assert_eq!(tokens.list_tokens(1).await.unwrap().len(), 1);
        assert_eq!(issued.token.state(), TokenState::Outstanding);
    }

    #[tokio::test]
    async fn repeated_collision_surfaces_as_fault() {
        let store = Arc::new(CollidingStore::new(2));
        let wallets = WalletService::new(store.clone());
        let tokens = TokenService::new(store);

        wallets.top_up(1, Decimal::from(100)).await.unwrap();
        let err = tokens
            .reserve(1, Decimal::from(40), Some("1234".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SystemError(_)));

        // No funds stuck in reserve after the double failure
        let wallet = wallets.get_balance(1).await.unwrap();
        assert_eq!(wallet.available, Decimal::from(100));
        assert_eq!(wallet.reserved, Decimal::ZERO);
    }
}
