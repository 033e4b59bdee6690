use axum::extract::State;
use std::sync::Arc;

use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, ApiResponse, ApiResult, ok};

use super::IssuanceResponse;

/// POST /bank/issuance - proxy an issuance request to the partner bank
#[utoipa::path(
    post,
    path = "/bank/issuance",
    responses(
        (status = 200, description = "Bank accepted the issuance request", body = ApiResponse<IssuanceResponse>),
        (status = 500, description = "Bank request failed"),
        (status = 503, description = "No bank endpoint configured"),
    ),
    tag = "Bank"
)]
pub async fn bank_issuance(State(state): State<Arc<AppState>>) -> ApiResult<IssuanceResponse> {
    if !state.bank.is_configured() {
        return ApiError::service_unavailable("Bank issuance endpoint not configured").into_err();
    }

    match state.bank.request_issuance().await {
        Ok(resp) => ok(resp),
        Err(e) => {
            tracing::error!("bank issuance proxy failed: {:#}", e);
            ApiError::internal("Bank issuance request failed").into_err()
        }
    }
}
