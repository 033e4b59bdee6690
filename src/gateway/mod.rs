pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::bank::BankClient;
use crate::config::AppConfig;
use crate::db::Database;
use crate::ledger::{LedgerStore, PgLedgerStore, TokenService, WalletService};
use crate::user_auth::UserAuthService;
use state::AppState;

/// Start the HTTP gateway
pub async fn run_server(config: AppConfig, db: Arc<Database>) -> anyhow::Result<()> {
    // Wire the ledger services onto the shared pool
    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(db.pool().clone()));
    let wallet_service = Arc::new(WalletService::new(store.clone()));
    let token_service = Arc::new(TokenService::new(store.clone()));

    let user_auth = Arc::new(UserAuthService::new(
        db.pool().clone(),
        config.auth.jwt_secret.clone(),
        config.auth.token_ttl_secs,
    ));

    let bank = Arc::new(BankClient::new(config.bank.issuance_url.clone()));
    if !bank.is_configured() {
        println!("⚠️  Bank issuance proxy disabled (no issuance_url configured)");
    }

    let state = Arc::new(AppState::new(
        db,
        user_auth,
        wallet_service,
        token_service,
        bank,
    ));

    // ==========================================================================
    // Auth Routes (public)
    // ==========================================================================
    let auth_routes = Router::new().route(
        "/telegram",
        post(crate::user_auth::handlers::telegram_auth),
    );

    // ==========================================================================
    // Wallet Routes - Protected by JWT
    // ==========================================================================
    let wallet_routes = Router::new()
        .route("/balance", get(handlers::get_balance))
        .route("/topup", post(handlers::topup))
        .route("/issue-token", post(handlers::issue_token))
        .route("/claim", post(handlers::claim_token))
        .route("/list-tokens", get(handlers::list_tokens))
        .route("/transfer", post(handlers::transfer))
        .route("/transfers", get(handlers::list_transfers))
        .layer(from_fn_with_state(
            state.clone(),
            crate::user_auth::middleware::jwt_auth_middleware,
        ));

    // ==========================================================================
    // Bank Routes (public, no account data in the reply)
    // ==========================================================================
    let bank_routes = Router::new().route("/issuance", post(crate::bank::handlers::bank_issuance));

    // Build complete router
    let app = Router::new()
        .route("/ping", get(handlers::ping))
        .route("/health", get(handlers::health_check))
        .nest("/auth", auth_routes)
        .nest("/wallet", wallet_routes)
        .nest("/bank", bank_routes);

    // [SECURITY] Mock API routes - only compiled when 'mock-api' feature is enabled.
    // Production builds MUST be compiled with `--no-default-features` to exclude this.
    #[cfg(feature = "mock-api")]
    let app = app.nest(
        "/internal/mock",
        Router::new().route("/bank-issuance", post(crate::bank::mock_bank_issuance)),
    );

    let app = app
        .with_state(state)
        // OpenAPI / Swagger UI (stateless, added after with_state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()));

    // Bind address
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("❌ FATAL: Failed to bind to {}: {}", addr, e);
            eprintln!(
                "   Hint: Port {} may already be in use. Check with: lsof -i :{}",
                config.gateway.port, config.gateway.port
            );
            return Err(e.into());
        }
    };

    println!("🚀 Gateway listening on http://{}", addr);
    println!("📖 API Docs: http://{}/docs", addr);
    println!("🔒 Wallet API: /wallet/* (JWT required)");

    // Start server
    axum::serve(listener, app).await?;
    Ok(())
}
