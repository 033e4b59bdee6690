use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::gateway::{
    state::AppState,
    types::{ApiResponse, error_codes},
};

/// Bearer-token gate for the wallet routes. On success the verified
/// [`Claims`](super::service::Claims) are injected as a request extension.
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<()>>)> {
    // 1. Extract Authorization header
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::MISSING_AUTH,
                "Missing Authorization header",
            )),
        ))?;

    if !auth_header.starts_with("Bearer ") {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Invalid token format",
            )),
        ));
    }

    let token = &auth_header[7..];

    // 2. Verify token and inject claims
    match state.user_auth.verify_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(_) => Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Invalid or expired token",
            )),
        )),
    }
}
