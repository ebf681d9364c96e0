//! Registration and login.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{self, ROLE_USER};
use crate::error::{conflict_on_constraint, ApiError};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub role: String,
    pub email: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    req.validate()?;
    let password_hash = auth::hash_password(&req.password)?;
    let user_id = Uuid::now_v7();

    sqlx::query(
        "INSERT INTO users (id, email, name, password_hash, role, provider, is_active) \
         VALUES ($1, $2, $3, $4, $5, 'EMAIL', TRUE)",
    )
    .bind(user_id)
    .bind(&req.email)
    .bind(&req.name)
    .bind(&password_hash)
    .bind(ROLE_USER)
    .execute(&state.db)
    .await
    .map_err(|e| conflict_on_constraint(e, "email already registered"))?;

    let token = auth::issue_token(
        &state.config.jwt_secret,
        state.config.token_ttl_minutes,
        user_id,
        &req.email,
        ROLE_USER,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse { access_token: token, role: ROLE_USER.to_string(), email: req.email }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    req.validate()?;

    let user = sqlx::query_as::<_, (Uuid, String, Option<String>, String, bool)>(
        "SELECT id, email, password_hash, role, is_active FROM users WHERE email = $1",
    )
    .bind(&req.email)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::Unauthorized)?;

    let (id, email, password_hash, role, is_active) = user;
    if !is_active {
        return Err(ApiError::Unauthorized);
    }
    // accounts created through an external provider carry no password
    let hash = password_hash.ok_or(ApiError::Unauthorized)?;
    auth::verify_password(&req.password, &hash)?;

    let token = auth::issue_token(
        &state.config.jwt_secret,
        state.config.token_ttl_minutes,
        id,
        &email,
        &role,
    )?;
    Ok(Json(TokenResponse { access_token: token, role, email }))
}
