//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `ApiError` / `ApiResult`: handler-side error plumbing
//! - `error_codes`: Standard error code constants

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;
use utoipa::ToSchema;

use crate::ledger::LedgerError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

// ============================================================================
// Handler Result Plumbing
// ============================================================================

/// Handler result: success envelope or (status, error envelope).
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

/// Wrap data in a success envelope.
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// An API-facing error before it is rendered into the response tuple.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error_codes::NOT_FOUND, msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
        )
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            msg,
        )
    }

    /// Map a ledger error onto status + code. Server-side failures keep a
    /// generic message; the full error goes to the log, not the client.
    pub fn from_ledger(e: &LedgerError) -> Self {
        let status = StatusCode::from_u16(e.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = match e {
            LedgerError::InvalidAmount(_) => error_codes::INVALID_PARAMETER,
            LedgerError::InsufficientFunds => error_codes::INSUFFICIENT_FUNDS,
            LedgerError::InvalidPin => error_codes::INVALID_PIN,
            LedgerError::Unauthorized => error_codes::AUTH_FAILED,
            LedgerError::NotFound(_) => error_codes::NOT_FOUND,
            LedgerError::AlreadyRedeemed => error_codes::ALREADY_REDEEMED,
            LedgerError::Conflict
            | LedgerError::DatabaseError(_)
            | LedgerError::SystemError(_) => error_codes::INTERNAL_ERROR,
        };
        let msg = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            e.to_string()
        };
        Self { status, code, msg }
    }

    /// Render into the error side of an [`ApiResult`].
    pub fn into_err<T>(self) -> ApiResult<T> {
        Err(self.into())
    }
}

// Lets handlers bail with `?` on fallible lookups.
impl From<ApiError> for (StatusCode, Json<ApiResponse<()>>) {
    fn from(e: ApiError) -> Self {
        (e.status, Json(ApiResponse::<()>::error(e.code, e.msg)))
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_FUNDS: i32 = 1002;
    pub const INVALID_PIN: i32 = 1003;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4001;
    pub const ALREADY_REDEEMED: i32 = 4002;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
}
