use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;

use crate::gateway::state::AppState;
use crate::gateway::types::{ApiResponse, error_codes};
use crate::ledger::LedgerError;

use super::service::{AuthResponse, TelegramAuthRequest};

/// POST /auth/telegram - establish a session from the app identity payload
#[utoipa::path(
    post,
    path = "/auth/telegram",
    request_body = TelegramAuthRequest,
    responses(
        (status = 200, description = "Session established, JWT issued", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Identity payload rejected"),
        (status = 500, description = "Authentication failed"),
    ),
    tag = "Auth"
)]
pub async fn telegram_auth(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TelegramAuthRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), (StatusCode, Json<ApiResponse<()>>)> {
    match state.user_auth.authenticate(req.init_data).await {
        Ok(resp) => Ok((StatusCode::OK, Json(ApiResponse::success(resp)))),
        Err(LedgerError::Unauthorized) => {
            tracing::warn!("auth rejected: invalid identity payload");
            Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::<()>::error(
                    error_codes::AUTH_FAILED,
                    "Invalid identity payload",
                )),
            ))
        }
        Err(e) => {
            tracing::error!("auth failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(
                    error_codes::INTERNAL_ERROR,
                    "Authentication failed",
                )),
            ))
        }
    }
}
