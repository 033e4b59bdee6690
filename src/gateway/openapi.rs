//! OpenAPI / Swagger UI Documentation
//!
//! This module provides auto-generated OpenAPI 3.0 documentation for the SonicPay API.
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

// Import handler types for schema registration
use crate::bank::IssuanceResponse;
use crate::gateway::handlers::health::HealthResponse;
use crate::gateway::handlers::token::{
    ClaimRequest, IssueTokenRequest, IssuedTokenData, TokenData,
};
use crate::gateway::handlers::wallet::{
    BalanceData, TopUpRequest, TransferData, TransferRequest,
};
use crate::user_auth::{AuthResponse, IdentityPayload, TelegramAuthRequest};

/// Bearer JWT security scheme for the wallet routes
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "JWT issued by POST /auth/telegram. Send as: Bearer {token}",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "SonicPay Wallet API",
        version = "1.0.0",
        description = "Custodial wallet gateway for proximity payments: balances, reservation-backed payment tokens, and peer transfers.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        // Public endpoints
        crate::gateway::handlers::health::ping,
        crate::gateway::handlers::health::health_check,
        crate::user_auth::handlers::telegram_auth,
        crate::bank::handlers::bank_issuance,
        // Wallet endpoints (JWT)
        crate::gateway::handlers::wallet::get_balance,
        crate::gateway::handlers::wallet::topup,
        crate::gateway::handlers::wallet::transfer,
        crate::gateway::handlers::wallet::list_transfers,
        crate::gateway::handlers::token::issue_token,
        crate::gateway::handlers::token::claim_token,
        crate::gateway::handlers::token::list_tokens,
    ),
    components(
        schemas(
            HealthResponse,
            TelegramAuthRequest,
            IdentityPayload,
            AuthResponse,
            TopUpRequest,
            TransferRequest,
            BalanceData,
            TransferData,
            IssueTokenRequest,
            ClaimRequest,
            TokenData,
            IssuedTokenData,
            IssuanceResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Session establishment for mini-app users"),
        (name = "Wallet", description = "Balances, top-ups and peer transfers (auth required)"),
        (name = "Token", description = "Reservation-backed payment tokens (auth required)"),
        (name = "Bank", description = "Card issuance proxy"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "SonicPay Wallet API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_openapi_json_serializable() {
        let spec = ApiDoc::openapi();
        let json = spec.to_json();
        assert!(json.is_ok());
        let json_str = json.unwrap();
        assert!(json_str.contains("SonicPay Wallet API"));
    }

    #[test]
    fn test_endpoints_registered() {
        let spec = ApiDoc::openapi();
        let paths = spec.paths;
        // Public surface
        assert!(paths.paths.contains_key("/ping"));
        assert!(paths.paths.contains_key("/health"));
        assert!(paths.paths.contains_key("/auth/telegram"));
        assert!(paths.paths.contains_key("/bank/issuance"));
        // Wallet surface
        assert!(paths.paths.contains_key("/wallet/balance"));
        assert!(paths.paths.contains_key("/wallet/topup"));
        assert!(paths.paths.contains_key("/wallet/issue-token"));
        assert!(paths.paths.contains_key("/wallet/claim"));
        assert!(paths.paths.contains_key("/wallet/list-tokens"));
        assert!(paths.paths.contains_key("/wallet/transfer"));
        assert!(paths.paths.contains_key("/wallet/transfers"));
    }

    #[test]
    fn test_security_scheme_registered() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("should have components");
        assert!(components.security_schemes.contains_key("bearer_jwt"));
    }
}
