//! Ledger Error Types
//!
//! One taxonomy for every balance and token operation. Handlers map these
//! onto HTTP responses; nothing below the gateway speaks HTTP.

use crate::money::MoneyError;
use thiserror::Error;

/// Ledger error types
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    // === Validation Errors ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient available funds")]
    InsufficientFunds,

    #[error("Invalid PIN")]
    InvalidPin,

    #[error("User not authenticated")]
    Unauthorized,

    // === Entity Errors ===
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Token already redeemed")]
    AlreadyRedeemed,

    /// Token id collided with an existing row. Retried internally with a
    /// fresh id; only surfaces when the retry collides as well.
    #[error("Token id collision")]
    Conflict,

    // === System Errors ===
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal system error: {0}")]
    SystemError(String),
}

impl LedgerError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount(_) => "INVALID_AMOUNT",
            LedgerError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            LedgerError::InvalidPin => "INVALID_PIN",
            LedgerError::Unauthorized => "UNAUTHORIZED",
            LedgerError::NotFound(_) => "NOT_FOUND",
            LedgerError::AlreadyRedeemed => "ALREADY_REDEEMED",
            LedgerError::Conflict => "CONFLICT",
            LedgerError::DatabaseError(_) => "DATABASE_ERROR",
            LedgerError::SystemError(_) => "SYSTEM_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::Unauthorized => 401,
            LedgerError::InvalidPin => 403,
            LedgerError::InvalidAmount(_) | LedgerError::InsufficientFunds => 400,
            LedgerError::NotFound(_) => 404,
            LedgerError::AlreadyRedeemed => 409,
            LedgerError::Conflict
            | LedgerError::DatabaseError(_)
            | LedgerError::SystemError(_) => 500,
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

impl From<anyhow::Error> for LedgerError {
    fn from(e: anyhow::Error) -> Self {
        LedgerError::SystemError(e.to_string())
    }
}

impl From<MoneyError> for LedgerError {
    fn from(e: MoneyError) -> Self {
        LedgerError::InvalidAmount(e.to_string())
    }
}
