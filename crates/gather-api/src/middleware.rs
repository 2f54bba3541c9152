use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::token;

/// Identity resolved by the access gate, available to handlers behind it
/// via request extensions.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

/// Extract and verify the bearer token from the Authorization header.
/// This is the single choke point for authentication: handlers never parse
/// tokens themselves, and routes without this layer carry no identity.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthenticated)?;

    let user_id =
        token::verify(token, &state.jwt_secret).map_err(|_| ApiError::Unauthenticated)?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}
