use std::sync::Arc;

use crate::bank::BankClient;
use crate::db::Database;
use crate::ledger::{TokenService, WalletService};
use crate::user_auth::UserAuthService;

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL handle (health checks, schema)
    pub db: Arc<Database>,
    /// Session issuance and verification
    pub user_auth: Arc<UserAuthService>,
    /// Balance operations
    pub wallet_service: Arc<WalletService>,
    /// Token issue / claim operations
    pub token_service: Arc<TokenService>,
    /// Card issuance upstream
    pub bank: Arc<BankClient>,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        user_auth: Arc<UserAuthService>,
        wallet_service: Arc<WalletService>,
        token_service: Arc<TokenService>,
        bank: Arc<BankClient>,
    ) -> Self {
        Self {
            db,
            user_auth,
            wallet_service,
            token_service,
            bank,
        }
    }
}
