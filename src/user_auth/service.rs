use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};
use utoipa::ToSchema;

use crate::ledger::LedgerError;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (internal user_id as string)
    pub exp: usize,  // Expiration time (as UTC timestamp)
    pub iat: usize,  // Issued at
}

impl Claims {
    /// Internal user id carried in `sub`.
    pub fn user_id(&self) -> Result<i64, LedgerError> {
        self.sub.parse().map_err(|_| LedgerError::Unauthorized)
    }
}

/// Identity asserted by the mobile client. The enclosing app platform has
/// already authenticated the person; this payload is trusted as-is.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IdentityPayload {
    #[schema(example = 427096358)]
    pub telegram_id: i64,
    #[serde(default)]
    #[schema(example = "Alice")]
    pub first_name: String,
}

/// Session Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct TelegramAuthRequest {
    pub init_data: IdentityPayload,
}

/// Auth Response (JWT)
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub user_id: i64,
}

/// Issue an HS256 access token whose subject is the internal user id.
pub fn issue_jwt(jwt_secret: &str, user_id: i64, ttl_secs: i64) -> Result<String, LedgerError> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::seconds(ttl_secs))
        .ok_or_else(|| LedgerError::SystemError("token expiry out of range".to_string()))?
        .timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| LedgerError::SystemError(format!("Failed to generate token: {}", e)))
}

/// Decode and validate an access token. Any defect (bad signature, expired,
/// garbled) collapses to `Unauthorized`.
pub fn verify_jwt(jwt_secret: &str, token: &str) -> Result<Claims, LedgerError> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|_| LedgerError::Unauthorized)
}

pub struct UserAuthService {
    db: Pool<Postgres>,
    jwt_secret: String,
    token_ttl_secs: i64,
}

impl UserAuthService {
    pub fn new(db: Pool<Postgres>, jwt_secret: String, token_ttl_secs: i64) -> Self {
        Self {
            db,
            jwt_secret,
            token_ttl_secs,
        }
    }

    /// Establish a session: upsert the user record, make sure the wallet
    /// row exists, and issue an access token.
    ///
    /// The wallet is provisioned here so every authenticated user has one
    /// from their first session onward; repeat logins are no-ops on it.
    pub async fn authenticate(&self, identity: IdentityPayload) -> Result<AuthResponse, LedgerError> {
        if identity.telegram_id <= 0 {
            return Err(LedgerError::Unauthorized);
        }

        let user_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users_tb (telegram_id, first_name)
            VALUES ($1, $2)
            ON CONFLICT (telegram_id) DO UPDATE SET first_name = EXCLUDED.first_name
            RETURNING id
            "#,
        )
        .bind(identity.telegram_id)
        .bind(&identity.first_name)
        .fetch_one(&self.db)
        .await?;

        sqlx::query("INSERT INTO wallets_tb (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        let access_token = issue_jwt(&self.jwt_secret, user_id, self.token_ttl_secs)?;

        tracing::info!(user_id, telegram_id = identity.telegram_id, "session issued");
        Ok(AuthResponse {
            access_token,
            user_id,
        })
    }

    /// Verify JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, LedgerError> {
        verify_jwt(&self.jwt_secret, token)
    }
}
