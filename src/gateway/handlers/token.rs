//! Payment token handlers: issue (reserve), claim (redeem), listing

use std::sync::Arc;

use axum::{Extension, Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::ledger::{IssuedToken, Token};
use crate::user_auth::Claims;

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResponse, ApiResult, DisplayAmount, StrictDecimal, ok,
};

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IssueTokenRequest {
    /// Amount to lock behind the token, as a strict decimal string
    #[schema(value_type = String, example = "40.00")]
    pub amount: StrictDecimal,
    /// Redemption PIN; a 4-digit code is generated when absent
    #[validate(length(min = 4, max = 8))]
    #[schema(example = "1234")]
    pub pin: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ClaimRequest {
    /// Token id as its canonical UUID string
    #[schema(example = "6dd52895-0a2f-4cbe-a37c-4ab2e5002250")]
    pub token_id: String,
    #[validate(length(min = 4, max = 8))]
    #[schema(example = "1234")]
    pub pin: String,
}

/// Public view of a payment token. Never carries the PIN or its hash.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenData {
    #[schema(example = "6dd52895-0a2f-4cbe-a37c-4ab2e5002250")]
    pub token_id: String,
    #[schema(example = 101)]
    pub issuer_user_id: i64,
    #[schema(value_type = String, example = "40.00")]
    pub amount: DisplayAmount,
    /// OUTSTANDING or REDEEMED
    #[schema(example = "OUTSTANDING")]
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl From<&Token> for TokenData {
    fn from(t: &Token) -> Self {
        Self {
            token_id: t.token_id.to_string(),
            issuer_user_id: t.issuer_user_id,
            amount: DisplayAmount::from_decimal(t.amount),
            status: t.state().as_str().to_string(),
            created_at: t.created_at,
            redeemed_at: t.redeemed_at,
        }
    }
}

/// Issue response: the token plus its PIN, the only response that ever
/// carries the PIN in cleartext.
#[derive(Debug, Serialize, ToSchema)]
pub struct IssuedTokenData {
    #[schema(example = "6dd52895-0a2f-4cbe-a37c-4ab2e5002250")]
    pub token_id: String,
    #[schema(example = 101)]
    pub issuer_user_id: i64,
    #[schema(value_type = String, example = "40.00")]
    pub amount: DisplayAmount,
    #[schema(example = "OUTSTANDING")]
    pub status: String,
    pub created_at: DateTime<Utc>,
    /// Share this with the recipient out of band
    #[schema(example = "1234")]
    pub pin: String,
}

impl From<&IssuedToken> for IssuedTokenData {
    fn from(issued: &IssuedToken) -> Self {
        Self {
            token_id: issued.token.token_id.to_string(),
            issuer_user_id: issued.token.issuer_user_id,
            amount: DisplayAmount::from_decimal(issued.token.amount),
            status: issued.token.state().as_str().to_string(),
            created_at: issued.token.created_at,
            pin: issued.pin.clone(),
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

/// Reserve funds behind a new payment token
///
/// POST /wallet/issue-token
#[utoipa::path(
    post,
    path = "/wallet/issue-token",
    request_body = IssueTokenRequest,
    responses(
        (status = 200, description = "Issued token with its PIN", body = ApiResponse<IssuedTokenData>),
        (status = 400, description = "Invalid amount or insufficient funds"),
        (status = 401, description = "Authentication failed")
    ),
    security(("bearer_jwt" = [])),
    tag = "Token"
)]
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<IssueTokenRequest>,
) -> ApiResult<IssuedTokenData> {
    let user_id = claims_user_id(&claims)?;
    req.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    match state
        .token_service
        .reserve(user_id, req.amount.inner(), req.pin)
        .await
    {
        Ok(issued) => ok(IssuedTokenData::from(&issued)),
        Err(e) => {
            tracing::warn!("Token issue rejected for user {}: {}", user_id, e);
            ApiError::from_ledger(&e).into_err()
        }
    }
}

/// Redeem a token and settle its amount into the caller's wallet
///
/// POST /wallet/claim
#[utoipa::path(
    post,
    path = "/wallet/claim",
    request_body = ClaimRequest,
    responses(
        (status = 200, description = "Redeemed token", body = ApiResponse<TokenData>),
        (status = 401, description = "Authentication failed"),
        (status = 403, description = "Wrong PIN; the token stays claimable"),
        (status = 404, description = "No such token"),
        (status = 409, description = "Token already redeemed")
    ),
    security(("bearer_jwt" = [])),
    tag = "Token"
)]
pub async fn claim_token(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ClaimRequest>,
) -> ApiResult<TokenData> {
    let user_id = claims_user_id(&claims)?;
    req.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    // A malformed id cannot name a token; same answer as an unknown one.
    let token_id = match Uuid::parse_str(&req.token_id) {
        Ok(id) => id,
        Err(_) => return ApiError::not_found("Token not found").into_err(),
    };

    match state.token_service.claim(token_id, &req.pin, user_id).await {
        Ok(token) => ok(TokenData::from(&token)),
        Err(e) => {
            tracing::warn!(
                "Claim of token {} by user {} failed: {}",
                token_id,
                user_id,
                e
            );
            ApiError::from_ledger(&e).into_err()
        }
    }
}

/// Every token the caller has issued, newest first
///
/// GET /wallet/list-tokens
#[utoipa::path(
    get,
    path = "/wallet/list-tokens",
    responses(
        (status = 200, description = "Issued tokens, redeemed ones included", body = ApiResponse<Vec<TokenData>>),
        (status = 401, description = "Authentication failed")
    ),
    security(("bearer_jwt" = [])),
    tag = "Token"
)]
pub async fn list_tokens(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<TokenData>> {
    let user_id = claims_user_id(&claims)?;

    match state.token_service.list_tokens(user_id).await {
        Ok(tokens) => ok(tokens.iter().map(TokenData::from).collect()),
        Err(e) => {
            tracing::error!("Token listing failed for user {}: {}", user_id, e);
            ApiError::from_ledger(&e).into_err()
        }
    }
}
