//! Money Validation Module
//!
//! Unified validation and formatting for monetary amounts. All amounts that
//! enter the ledger MUST go through this module.
//!
//! ## Design Principles
//! 1. Single currency, fixed scale: amounts carry at most [`MAX_SCALE`] decimal places
//! 2. Explicit Error Handling: No silent truncation or rounding
//! 3. Exact representation: `rust_decimal::Decimal` end to end, never floats
//!
//! ## Usage
//! ```text
//! // Client sends "1.50"
//! let amount = parse_amount("1.50")?;
//!
//! // Display balance to client
//! let display = format_amount(amount);
//! assert_eq!(display, "1.50");
//! ```

use rust_decimal::prelude::*;
use thiserror::Error;

/// Maximum number of decimal places an amount may carry (minor-unit precision).
pub const MAX_SCALE: u32 = 2;

/// Per-operation magnitude cap. Keeps amounts well inside the NUMERIC(18,2)
/// column capacity even after repeated credits.
pub const MAX_AMOUNT_UNITS: i64 = 1_000_000_000_000;

// ============================================================================
// Error Types
// ============================================================================

/// Money validation errors
#[derive(Debug, Error)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount too large")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

// ============================================================================
// Validate: boundary Decimal → ledger Decimal
// ============================================================================

/// Validate a client-provided amount for use in a balance movement.
///
/// # Errors
/// * `InvalidAmount` - If amount is zero or negative
/// * `PrecisionOverflow` - If input has more decimal places than [`MAX_SCALE`]
/// * `Overflow` - If amount exceeds [`MAX_AMOUNT_UNITS`]
pub fn validate_amount(amount: Decimal) -> Result<Decimal, MoneyError> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(MoneyError::InvalidAmount);
    }

    // Precision validation: REJECT if too many decimals (no silent rounding!)
    // A literal like "1.230" carries scale 3 and is rejected even though the
    // trailing digit is zero.
    if amount.scale() > MAX_SCALE {
        return Err(MoneyError::PrecisionOverflow {
            provided: amount.scale(),
            max: MAX_SCALE,
        });
    }

    if amount > Decimal::from(MAX_AMOUNT_UNITS) {
        return Err(MoneyError::Overflow);
    }

    Ok(amount)
}

// ============================================================================
// Parse: Client → ledger (String → Decimal)
// ============================================================================

/// Parse a client string amount into a validated `Decimal`.
///
/// # Errors
/// * `InvalidFormat` - If string format is invalid
/// * `InvalidAmount` - If amount is zero or negative
/// * `PrecisionOverflow` - If input has more decimal places than allowed
/// * `Overflow` - If amount exceeds the magnitude cap
pub fn parse_amount(amount_str: &str) -> Result<Decimal, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    // Signs are rejected outright: amounts are positive by definition
    if amount_str.starts_with('-') || amount_str.starts_with('+') {
        return Err(MoneyError::InvalidAmount);
    }

    if amount_str.contains(['e', 'E']) {
        return Err(MoneyError::InvalidFormat(
            "scientific notation not allowed".into(),
        ));
    }

    let parts: Vec<&str> = amount_str.split('.').collect();
    match parts.len() {
        1 => {}
        2 => {
            // Strict check: Require both sides of the dot to be non-empty
            // This prevents ambiguous formats like ".5" or "5."
            if parts[0].is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing leading zero (e.g., use 0.5 instead of .5)".into(),
                ));
            }
            if parts[1].is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing fractional part (e.g., use 5.0 instead of 5.)".into(),
                ));
            }
        }
        _ => return Err(MoneyError::InvalidFormat("multiple decimal points".into())),
    }

    if !amount_str.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(MoneyError::InvalidFormat(format!(
            "invalid character in amount: {}",
            amount_str
        )));
    }

    let amount = Decimal::from_str(amount_str)
        .map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;

    validate_amount(amount)
}

// ============================================================================
// Format: ledger → Client (Decimal → String)
// ============================================================================

/// Format a ledger amount for display, always with [`MAX_SCALE`] decimal places.
///
/// Amounts inside the ledger never exceed the maximum scale, so this only
/// pads, never rounds.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.prec$}", amount, prec = MAX_SCALE as usize)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qa_parse_amount_variations() {
        // Normal cases
        assert_eq!(parse_amount("1.23").unwrap(), Decimal::new(123, 2));
        assert_eq!(parse_amount("100").unwrap(), Decimal::from(100));

        // Leading/Trailing zeros
        assert_eq!(parse_amount("001.23").unwrap(), Decimal::new(123, 2));
        assert_eq!(parse_amount("0.01").unwrap(), Decimal::new(1, 2));

        // Zero representations (All rejected as we expect positive non-zero amounts)
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("0.00").is_err());
    }

    #[test]
    fn qa_parse_amount_invalid_formats() {
        let cases = vec![
            "1,000.00", // Commas not allowed
            "1.2.3",    // Multiple dots
            "1. 23",    // Spaces inside
            "+1.23",    // Explicit plus rejected
            "-1.23",    // Negative rejected
            "1e2",      // Scientific notation rejected
            "0x12",     // Hex rejected
            ".",        // Just a dot rejected
            "1..",      // Multiple dots at end rejected
            ".5",       // Missing leading zero rejected (STRICT)
            "5.",       // Missing fractional part rejected (STRICT)
            "",         // Empty rejected
        ];

        for case in &cases {
            assert!(
                parse_amount(case).is_err(),
                "Should reject invalid format: {}",
                case
            );
        }
    }

    #[test]
    fn qa_parse_amount_precision_limits() {
        // Exact limit
        assert!(parse_amount("1.23").is_ok());

        // Overflow 1 unit
        let res = parse_amount("1.234");
        assert!(matches!(
            res,
            Err(MoneyError::PrecisionOverflow {
                provided: 3,
                max: 2
            })
        ));

        // Trailing zeros beyond the scale still rejected
        assert!(parse_amount("1.230").is_err());
    }

    #[test]
    fn qa_validate_amount_edge_cases() {
        // Decimal with high scale but trailing zeros
        let d = Decimal::from_str("1.23000").unwrap(); // scale is 5
        assert!(validate_amount(d).is_err());

        // Normal values
        assert!(validate_amount(Decimal::new(123, 2)).is_ok());
        assert!(validate_amount(Decimal::from(1)).is_ok());

        // Non-positive rejected
        assert!(matches!(
            validate_amount(Decimal::ZERO),
            Err(MoneyError::InvalidAmount)
        ));
        assert!(matches!(
            validate_amount(Decimal::from(-5)),
            Err(MoneyError::InvalidAmount)
        ));
    }

    #[test]
    fn qa_amount_magnitude_cap() {
        assert!(validate_amount(Decimal::from(MAX_AMOUNT_UNITS)).is_ok());
        assert!(matches!(
            validate_amount(Decimal::from(MAX_AMOUNT_UNITS) + Decimal::ONE),
            Err(MoneyError::Overflow)
        ));
        assert!(matches!(
            parse_amount("99999999999999999999"),
            Err(MoneyError::Overflow)
        ));
    }

    #[test]
    fn qa_format_amount_padding() {
        assert_eq!(format_amount(Decimal::from(100)), "100.00");
        assert_eq!(format_amount(Decimal::new(15, 1)), "1.50");
        assert_eq!(format_amount(Decimal::new(123, 2)), "1.23");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
    }

    #[test]
    fn qa_roundtrip_consistency() {
        let values = vec!["1.00", "1.50", "0.01", "1234.56", "999999.99"];
        for val_str in &values {
            let amount = parse_amount(val_str).unwrap();
            let formatted = format_amount(amount);
            assert_eq!(
                &formatted, val_str,
                "Roundtrip failed for {}",
                val_str
            );
            assert_eq!(parse_amount(&formatted).unwrap(), amount);
        }
    }
}
