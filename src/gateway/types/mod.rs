//! Gateway types module
//!
//! This module provides type-safe types for API boundary enforcement:
//!
//! ## Input Types
//! - [`StrictDecimal`]: Format-validated decimal for API input
//!
//! ## Output Types
//! - [`DisplayAmount`]: Type-safe formatted amount for API responses
//! - [`ApiResponse<T>`]: Unified API response wrapper
//!
//! ## Submodules
//! - [`money`]: Money types (StrictDecimal, DisplayAmount)
//! - [`response`]: Response types and error codes

pub mod money;
pub mod response;

// Re-export commonly used types at module root
pub use money::{DisplayAmount, StrictDecimal};
pub use response::{ApiError, ApiResponse, ApiResult, error_codes, ok};
