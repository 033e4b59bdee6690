//! Gateway Session Layer
//!
//! Turns the mobile app's trusted identity payload into an internal user
//! plus wallet, and guards the wallet routes with a JWT bearer check.

pub mod handlers;
pub mod middleware;
pub mod service;

pub use middleware::jwt_auth_middleware;
pub use service::{AuthResponse, Claims, IdentityPayload, TelegramAuthRequest, UserAuthService};
