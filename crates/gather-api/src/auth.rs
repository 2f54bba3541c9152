use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use gather_db::Database;
use gather_types::api::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::{ApiError, blocking, map_unique_conflict};
use crate::images::ImageStore;
use crate::{password, token};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub images: ImageStore,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ApiError::Validation(
            "username and email are required".into(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }

    // Uniqueness pre-check; the unique indexes in the repository are the
    // backstop for the register/register race.
    let db = state.clone();
    let username = req.username.clone();
    let email = req.email.clone();
    let taken = blocking(move || {
        Ok(db.db.get_user_by_username(&username)?.is_some()
            || db.db.get_user_by_email(&email)?.is_some())
    })
    .await?;
    if taken {
        return Err(ApiError::Conflict);
    }

    let password_hash = password::hash(&req.password)?;
    let user_id = Uuid::new_v4();

    let db = state.clone();
    let uid = user_id.to_string();
    blocking(move || db.db.create_user(&uid, &req.username, &req.email, &password_hash))
        .await
        .map_err(map_unique_conflict)?;

    let token = token::issue(user_id, &state.jwt_secret, state.token_ttl)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let email = req.email.clone();
    let user = blocking(move || db.db.get_user_by_email(&email))
        .await?
        // Unknown email and wrong password answer identically so the
        // endpoint can't be used to enumerate accounts.
        .ok_or(ApiError::InvalidCredentials)?;

    if !password::verify(&req.password, &user.password) {
        return Err(ApiError::InvalidCredentials);
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {e}", user.id)))?;

    let token = token::issue(user_id, &state.jwt_secret, state.token_ttl)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}
