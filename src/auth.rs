//! Authentication: argon2 password hashing, HS256 bearer tokens, and the
//! `CurrentUser`/`AdminUser` extractors that gate handlers.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

pub const ROLE_USER: &str = "USER";
pub const ROLE_ADMIN: &str = "ADMIN";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ApiError::Internal("failed to hash password".to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<(), ApiError> {
    let parsed = PasswordHash::new(hash).map_err(|_| ApiError::Unauthorized)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ApiError::Unauthorized)
}

pub fn issue_token(
    secret: &str,
    ttl_minutes: i64,
    user_id: Uuid,
    email: &str,
    role: &str,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + Duration::minutes(ttl_minutes)).timestamp(),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| ApiError::Internal("failed to sign token".to_string()))
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized)
}

/// Authenticated user resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        let claims = decode_token(&state.config.jwt_secret, token)?;
        let user_id: Uuid = claims.sub.parse().map_err(|_| ApiError::Unauthorized)?;

        let user = sqlx::query_as::<_, (Uuid, String, String, String, bool)>(
            "SELECT id, email, name, role, is_active FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::Unauthorized)?;

        let (id, email, name, role, is_active) = user;
        if !is_active {
            return Err(ApiError::Unauthorized);
        }
        Ok(Self { id, email, name, role })
    }
}

/// `CurrentUser` with the ADMIN role; rejects everyone else with 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden);
        }
        Ok(Self(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).is_ok());
        assert!(verify_password("hunter23", &hash).is_err());
    }

    #[test]
    fn token_round_trip() {
        let id = Uuid::now_v7();
        let token = issue_token("secret", 60, id, "a@b.com", ROLE_USER).unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.role, ROLE_USER);
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = issue_token("secret", 60, Uuid::now_v7(), "a@b.com", ROLE_USER).unwrap();
        assert!(matches!(decode_token("other", &token), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn expired_token_rejected() {
        let token = issue_token("secret", -120, Uuid::now_v7(), "a@b.com", ROLE_USER).unwrap();
        assert!(matches!(decode_token("secret", &token), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn admin_check() {
        let user = CurrentUser {
            id: Uuid::now_v7(),
            email: "x@y.com".to_string(),
            name: "X".to_string(),
            role: ROLE_ADMIN.to_string(),
        };
        assert!(user.is_admin());
    }
}
