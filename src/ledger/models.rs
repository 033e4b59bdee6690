//! Ledger Domain Models
//!
//! A wallet splits a user's custodial balance into two non-negative parts:
//! `available` (spendable) and `reserved` (backing outstanding tokens).
//! A token is a PIN-locked claim on reserved funds; its lifecycle is a
//! one-way move from OUTSTANDING to REDEEMED.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

/// Generate a fresh opaque token id (random 128-bit, collision odds negligible).
pub fn new_token_id() -> Uuid {
    Uuid::new_v4()
}

/// Per-user custodial balance.
///
/// Created lazily on first touch and never deleted. Both parts are
/// non-negative at all times; the store enforces this on every movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    pub user_id: i64,
    pub available: Decimal,
    pub reserved: Decimal,
}

impl Wallet {
    /// Fresh wallet with both parts at zero.
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            available: Decimal::ZERO,
            reserved: Decimal::ZERO,
        }
    }

    /// Total funds held for this user, spendable or not.
    pub fn total(&self) -> Decimal {
        self.available + self.reserved
    }
}

/// Token lifecycle state, derived from `redeemed_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenState {
    /// Issued, backed by reserved funds, claimable.
    Outstanding,
    /// Claimed. Terminal; the token never becomes claimable again.
    Redeemed,
}

impl TokenState {
    /// Check if this is a terminal state (no further transitions allowed)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TokenState::Redeemed)
    }

    /// Get state name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenState::Outstanding => "OUTSTANDING",
            TokenState::Redeemed => "REDEEMED",
        }
    }
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transfer token: a claim on `amount` of the issuer's reserved funds,
/// redeemable by whoever presents the matching PIN.
///
/// `amount` and `pin_hash` are immutable after issuance; only
/// `redeemed_at`/`redeemed_by` ever change, and only once.
#[derive(Debug, Clone)]
pub struct Token {
    pub token_id: Uuid,
    pub issuer_user_id: i64,
    pub amount: Decimal,
    /// Argon2 hash of the shared PIN. The cleartext PIN is returned to the
    /// issuer exactly once, at issuance, and never stored.
    pub pin_hash: String,
    pub created_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub redeemed_by: Option<i64>,
}

impl Token {
    /// Build a new outstanding token with a fresh random id.
    pub fn issue(issuer_user_id: i64, amount: Decimal, pin_hash: String) -> Self {
        Self {
            token_id: new_token_id(),
            issuer_user_id,
            amount,
            pin_hash,
            created_at: Utc::now(),
            redeemed_at: None,
            redeemed_by: None,
        }
    }

    pub fn state(&self) -> TokenState {
        if self.redeemed_at.is_some() {
            TokenState::Redeemed
        } else {
            TokenState::Outstanding
        }
    }
}

/// One settled row of direct-transfer history.
#[derive(Debug, Clone)]
pub struct TransferRecord {
    pub transfer_id: i64,
    pub from_user: i64,
    pub to_user: i64,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}
