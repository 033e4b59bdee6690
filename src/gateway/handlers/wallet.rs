//! Wallet handlers: balance, top-up, peer transfers

use std::sync::Arc;

use axum::{Extension, Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::ledger::{TransferRecord, Wallet};
use crate::user_auth::Claims;

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResponse, ApiResult, DisplayAmount, StrictDecimal, ok,
};

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct TopUpRequest {
    /// Amount to credit, as a strict decimal string
    #[schema(value_type = String, example = "100.00")]
    pub amount: StrictDecimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransferRequest {
    /// Recipient's internal user id
    #[validate(range(min = 1))]
    #[schema(example = 202)]
    pub to_user_id: i64,
    /// Amount to move, as a strict decimal string
    #[schema(value_type = String, example = "42.00")]
    pub amount: StrictDecimal,
}

/// Both balance parts of the caller's wallet.
#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceData {
    /// Funds free to spend or reserve
    #[schema(value_type = String, example = "60.00")]
    pub available: DisplayAmount,
    /// Funds locked behind outstanding tokens
    #[schema(value_type = String, example = "40.00")]
    pub reserved: DisplayAmount,
}

impl BalanceData {
    pub(crate) fn from_wallet(wallet: &Wallet) -> Self {
        Self {
            available: DisplayAmount::from_decimal(wallet.available),
            reserved: DisplayAmount::from_decimal(wallet.reserved),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferData {
    #[schema(example = 1)]
    pub transfer_id: i64,
    #[schema(example = 101)]
    pub from_user: i64,
    #[schema(example = 202)]
    pub to_user: i64,
    #[schema(value_type = String, example = "42.00")]
    pub amount: DisplayAmount,
    pub created_at: DateTime<Utc>,
}

impl From<&TransferRecord> for TransferData {
    fn from(r: &TransferRecord) -> Self {
        Self {
            transfer_id: r.transfer_id,
            from_user: r.from_user,
            to_user: r.to_user,
            amount: DisplayAmount::from_decimal(r.amount),
            created_at: r.created_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn claims_user_id(claims: &Claims) -> Result<i64, ApiError> {
    claims
        .user_id()
        .map_err(|_| ApiError::unauthorized("Invalid user ID in token"))
}

/// Current balance of the authenticated user's wallet
///
/// GET /wallet/balance
#[utoipa::path(
    get,
    path = "/wallet/balance",
    responses(
        (status = 200, description = "Both balance parts", body = ApiResponse<BalanceData>),
        (status = 401, description = "Authentication failed")
    ),
    security(("bearer_jwt" = [])),
    tag = "Wallet"
)]
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<BalanceData> {
    let user_id = claims_user_id(&claims)?;

    match state.wallet_service.get_balance(user_id).await {
        Ok(wallet) => ok(BalanceData::from_wallet(&wallet)),
        Err(e) => {
            tracing::error!("Balance lookup failed for user {}: {}", user_id, e);
            ApiError::from_ledger(&e).into_err()
        }
    }
}

/// Credit the authenticated user's available balance
///
/// POST /wallet/topup
#[utoipa::path(
    post,
    path = "/wallet/topup",
    request_body = TopUpRequest,
    responses(
        (status = 200, description = "Updated balance", body = ApiResponse<BalanceData>),
        (status = 400, description = "Invalid amount"),
        (status = 401, description = "Authentication failed")
    ),
    security(("bearer_jwt" = [])),
    tag = "Wallet"
)]
pub async fn topup(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TopUpRequest>,
) -> ApiResult<BalanceData> {
    let user_id = claims_user_id(&claims)?;

    match state.wallet_service.top_up(user_id, req.amount.inner()).await {
        Ok(wallet) => ok(BalanceData::from_wallet(&wallet)),
        Err(e) => {
            tracing::warn!("Top-up rejected for user {}: {}", user_id, e);
            ApiError::from_ledger(&e).into_err()
        }
    }
}

/// Move funds to another user's wallet
///
/// POST /wallet/transfer
#[utoipa::path(
    post,
    path = "/wallet/transfer",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Settled transfer", body = ApiResponse<TransferData>),
        (status = 400, description = "Invalid amount or insufficient funds"),
        (status = 401, description = "Authentication failed"),
        (status = 404, description = "Recipient wallet not found")
    ),
    security(("bearer_jwt" = [])),
    tag = "Wallet"
)]
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<TransferData> {
    let user_id = claims_user_id(&claims)?;
    req.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    match state
        .wallet_service
        .transfer(user_id, req.to_user_id, req.amount.inner())
        .await
    {
        Ok(record) => ok(TransferData::from(&record)),
        Err(e) => {
            tracing::warn!(
                "Transfer rejected: {} -> {}: {}",
                user_id,
                req.to_user_id,
                e
            );
            ApiError::from_ledger(&e).into_err()
        }
    }
}

/// Transfer history where the caller is sender or recipient, newest first
///
/// GET /wallet/transfers
#[utoipa::path(
    get,
    path = "/wallet/transfers",
    responses(
        (status = 200, description = "Transfer history", body = ApiResponse<Vec<TransferData>>),
        (status = 401, description = "Authentication failed")
    ),
    security(("bearer_jwt" = [])),
    tag = "Wallet"
)]
pub async fn list_transfers(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<TransferData>> {
    let user_id = claims_user_id(&claims)?;

    match state.wallet_service.list_transfers(user_id).await {
        Ok(records) => ok(records.iter().map(TransferData::from).collect()),
        Err(e) => {
            tracing::error!("Transfer history query failed for user {}: {}", user_id, e);
            ApiError::from_ledger(&e).into_err()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn topup_request_rejects_numeric_amount() {
        let result: Result<TopUpRequest, _> = serde_json::from_str(r#"{"amount": 100}"#);
        assert!(result.is_err());
    }

    #[test]
    fn transfer_request_parses_strict_amount() {
        let req: TransferRequest =
            serde_json::from_str(r#"{"to_user_id": 202, "amount": "42.00"}"#).unwrap();
        assert_eq!(req.to_user_id, 202);
        assert_eq!(req.amount.inner(), Decimal::new(4200, 2));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn transfer_request_rejects_non_positive_recipient() {
        let req: TransferRequest =
            serde_json::from_str(r#"{"to_user_id": 0, "amount": "1.00"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn balance_data_pads_scale() {
        let wallet = Wallet {
            user_id: 7,
            available: Decimal::from(60),
            reserved: Decimal::ZERO,
        };
        let data = BalanceData::from_wallet(&wallet);
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["available"], "60.00");
        assert_eq!(json["reserved"], "0.00");
    }
}
