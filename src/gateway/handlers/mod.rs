//! Gateway request handlers

pub mod health;
pub mod token;
pub mod wallet;

pub use health::{health_check, ping};
pub use token::{claim_token, issue_token, list_tokens};
pub use wallet::{get_balance, list_transfers, topup, transfer};
